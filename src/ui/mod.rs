//! UI definitions module

mod format;
mod label;
mod pulse_watchface;

pub use format::{format_battery, format_date, format_temperature, format_time};
pub use label::Label;
pub use pulse_watchface::PulseWatchface;

use crate::{events::WatchEvent, platform::Platform, Error};

pub trait WatchFace<P: Platform>: Sized {
    /// Build the watchface on the platform's root layer
    fn load(platform: P) -> Result<Self, Error>;

    /// Dispatch one event to its handler
    fn handle(&mut self, event: WatchEvent);

    /// Tear everything down and hand the platform back
    fn unload(self) -> P;
}
