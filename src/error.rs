//! Crate-wide error type.
//!
//! Variants carry only fixed-size data so the type stays `Copy` and usable
//! without an allocator.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Messaging
    /// A dictionary was truncated or a tuple length did not match its type.
    #[error("malformed dictionary")]
    Malformed,

    /// The destination buffer is too small.
    #[error("buffer overflow")]
    BufferOverflow,

    /// A tuple used a type tag outside the known set.
    #[error("unsupported tuple type {0}")]
    UnsupportedValueType(u8),

    // Device services
    /// An ADC sample was outside the converter's range.
    #[error("invalid measurement")]
    InvalidMeasurement,

    /// A date/time record did not describe a valid point in time.
    #[error("invalid time")]
    InvalidTime,

    // Compositor
    /// The layer handle is unknown to the compositor.
    #[error("no such layer")]
    NoSuchLayer,

    /// The font handle is unknown to the compositor.
    #[error("no such font")]
    NoSuchFont,

    /// The animation handle is unknown or already finished.
    #[error("no such animation")]
    NoSuchAnimation,

    /// The compositor has no room for another layer, font or animation.
    #[error("out of resources")]
    OutOfResources,
}
