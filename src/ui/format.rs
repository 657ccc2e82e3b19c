//! Text formatting for the watchface fields.

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::{battery::BatteryChargeState, text::TextBuffer};

/// Hour and minute, hour space-padded to two columns: `" 9:05"`, `"21:05"`.
pub fn format_time<const N: usize>(
    buf: &mut TextBuffer<N>,
    time: &NaiveDateTime,
    clock_24h: bool,
) {
    let hour = if clock_24h {
        time.hour()
    } else {
        time.hour12().1
    };
    buf.format(format_args!("{:>2}:{:02}", hour, time.minute()));
}

/// Weekday abbreviation followed by the zero-padded day: `"Fri06"`.
pub fn format_date<const N: usize>(buf: &mut TextBuffer<N>, time: &NaiveDateTime) {
    buf.format(format_args!("{}{:02}", time.weekday(), time.day()));
}

/// `"57%"` on battery, `"/42%/"` while charging, `"FULL!"` once charged.
pub fn format_battery<const N: usize>(buf: &mut TextBuffer<N>, charge: &BatteryChargeState) {
    if !charge.is_plugged {
        buf.format(format_args!("{}%", charge.charge_percent));
    } else if charge.is_charging {
        buf.format(format_args!("/{}%/", charge.charge_percent));
    } else {
        buf.set("FULL!");
    }
}

/// Temperature in degrees Celsius: `"-5C"`.
pub fn format_temperature<const N: usize>(buf: &mut TextBuffer<N>, degrees: i32) {
    buf.format(format_args!("{}C", degrees));
}
