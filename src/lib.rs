//! Pulse watchface
//!
//! Clock, date, weather temperature, bluetooth status and battery status for a
//! PineTime-class watch, plus a half-hourly weather request to the paired phone.
//!
//! The watchface itself ([`ui::PulseWatchface`]) only talks to the traits in
//! [`platform`], so everything in this crate runs on the host for testing. The
//! firmware binary (`src/main.rs`, feature `embedded`) supplies the PineTime
//! implementation of those traits.

#![cfg_attr(not(test), no_std)]

cfg_if::cfg_if! {
    if #[cfg(feature = "defmt")] {
        #[allow(unused_imports)]
        pub(crate) use defmt::{debug, error, info, warn};
    } else if #[cfg(feature = "log")] {
        #[allow(unused_imports)]
        pub(crate) use log::{debug, error, info, warn};
    }
}

// No-op logging when neither backend is enabled. These stay outside `cfg_if!`:
// exported macros produced by another macro cannot be named as `crate::info`.
#[cfg(not(any(feature = "defmt", feature = "log")))]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {{}};
}
#[cfg(not(any(feature = "defmt", feature = "log")))]
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {{}};
}
#[cfg(not(any(feature = "defmt", feature = "log")))]
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {{}};
}
#[cfg(not(any(feature = "defmt", feature = "log")))]
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {{}};
}

pub mod battery;
pub mod config;
pub mod error;
pub mod events;
pub mod message;
pub mod platform;
pub mod text;
pub mod time;
pub mod ui;

pub use battery::BatteryChargeState;
pub use error::Error;
pub use events::{TimeUnits, WatchEvent};
pub use ui::{PulseWatchface, WatchFace};
