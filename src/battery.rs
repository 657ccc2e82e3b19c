//! Battery charge state
//!
//! Voltage curve based upon https://github.com/dbrgn/pinetime-rtic/blob/master/pinetime-rtic/src/battery.rs
//! and https://wiki.pine64.org/wiki/PineTime.

use crate::Error;

/// Snapshot of the battery as reported by the battery service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatteryChargeState {
    /// Estimated charge (0–100)
    pub charge_percent: u8,
    /// Charger is actively charging
    pub is_charging: bool,
    /// External power is present
    pub is_plugged: bool,
}

/// Convert a 12-bit SAADC sample of the halved battery voltage into millivolts.
pub fn millivolts_from_adc(raw: i16) -> Result<u16, Error> {
    match raw {
        0..=4095 => {
            // Use u32 during calculation to prevent overflow
            // 2 * 1000 mV / (2^12 / 3.3 V reference)
            Ok((raw as u32 * 2000 / 1241) as u16)
        }
        _ => Err(Error::InvalidMeasurement),
    }
}

/// Estimate battery capacity in percent.
///
/// Uses fixed data points and linear interpolation in between.
pub fn percent_from_millivolts(voltage: u16) -> u8 {
    (match voltage {
        0..=3449 => 0,
        3450..=3699 => (voltage - 3450) / 5,
        3700..=4199 => 50 + (voltage - 3700) / 10,
        _ => 100,
    }) as u8
}
