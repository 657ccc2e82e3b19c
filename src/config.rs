//! Watchface constants and compile-time configuration.
//!
//! Layout, timing and protocol values live here so they can be tuned in one
//! place. Frames are in the 144x168 coordinate space the layout was drawn for.

use embedded_graphics::{
    geometry::{Point, Size},
    primitives::Rectangle,
};

const fn frame(x: i32, y: i32, w: u32, h: u32) -> Rectangle {
    Rectangle::new(Point::new(x, y), Size::new(w, h))
}

// Layout

/// Logical screen width.
pub const SCREEN_W: u32 = 144;
/// Logical screen height.
pub const SCREEN_H: u32 = 168;

pub const BACKGROUND_FRAME: Rectangle = frame(0, 0, SCREEN_W, SCREEN_H);
pub const TIME_FRAME: Rectangle = frame(0, 65, 140, 50);
pub const DATE_FRAME: Rectangle = frame(0, 110, 140, 30);
pub const WEATHER_FRAME: Rectangle = frame(0, 12, 144, 30);
pub const BATTERY_FRAME: Rectangle = frame(72, 0, 72, 20);
pub const BLUETOOTH_FRAME: Rectangle = frame(0, 0, 32, 32);

/// Size of the blank pulse bitmap.
pub const PULSE_SIZE: Size = Size::new(10, 100);
/// Pulse rests just off the left edge.
pub const PULSE_START_FRAME: Rectangle = frame(-20, 60, 10, 100);
/// Pulse ends just off the right edge.
pub const PULSE_END_FRAME: Rectangle = frame(SCREEN_W as i32, 60, 10, 100);

/// Placeholder shown until the first weather message arrives.
pub const WEATHER_PLACEHOLDER: &str = "...";

// Animation

/// Pulse slide duration (ms).
pub const PULSE_DURATION_MS: u32 = 700;
/// Delay before the pulse starts moving (ms).
pub const PULSE_DELAY_MS: u32 = 100;

// Text buffer capacities, in characters

pub const TIME_CAPACITY: usize = 5;
pub const DATE_CAPACITY: usize = 6;
pub const BATTERY_CAPACITY: usize = 6;
pub const TEMPERATURE_CAPACITY: usize = 7;
pub const WEATHER_CAPACITY: usize = 31;

// Messaging

/// A weather request goes out whenever the minute is a multiple of this.
pub const WEATHER_REQUEST_INTERVAL_MIN: u32 = 30;

/// Largest inbound dictionary accepted by the transport (bytes).
pub const INBOX_SIZE: usize = 64;
/// Largest outbound dictionary produced by the watchface (bytes).
pub const OUTBOX_SIZE: usize = 32;

// Clock

/// Offset of local time from UTC (seconds).
pub const UTC_OFFSET_SECS: i32 = 3_600;
/// Whether the clock is shown in 24-hour style.
pub const CLOCK_24H: bool = true;

// Bluetooth

/// Advertised device name.
pub const BLE_DEVICE_NAME: &str = "PineTime";
