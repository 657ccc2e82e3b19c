//! Host platform interface
//!
//! The watchface never touches hardware directly. Layers, fonts and
//! animations go through [`Compositor`], clock/bluetooth/battery state through
//! [`DeviceServices`], and outbound messages through [`Outbox`].

mod graphics;

pub use graphics::{
    AnimationCurve, AnimationId, Bitmap, Color, CompositingMode, FontId, FontSize, LayerId,
    PropertyAnimation, ResourceId, TextAlignment, TextStyle,
};

use chrono::NaiveDateTime;
use embedded_graphics::primitives::Rectangle;

use crate::{
    battery::BatteryChargeState, config::OUTBOX_SIZE, events::TimeUnits,
    message::AppMessageResult, Error,
};

/// Retained-mode layer tree with fonts and frame animations.
pub trait Compositor {
    /// Root layer of the watchface window.
    fn root_layer(&self) -> LayerId;

    /// Create an image layer. The layer owns `bitmap` until destroyed.
    fn create_bitmap_layer(
        &mut self,
        frame: Rectangle,
        bitmap: Bitmap,
        mode: CompositingMode,
    ) -> Result<LayerId, Error>;

    /// Create an empty text layer.
    fn create_text_layer(&mut self, frame: Rectangle, style: TextStyle) -> Result<LayerId, Error>;

    fn add_child(&mut self, parent: LayerId, child: LayerId) -> Result<(), Error>;

    fn set_hidden(&mut self, layer: LayerId, hidden: bool) -> Result<(), Error>;

    fn set_text(&mut self, layer: LayerId, text: &str) -> Result<(), Error>;

    /// Detach and destroy a layer, releasing its bitmap.
    fn destroy_layer(&mut self, layer: LayerId) -> Result<(), Error>;

    fn load_font(&mut self, size: FontSize) -> Result<FontId, Error>;

    fn unload_font(&mut self, font: FontId) -> Result<(), Error>;

    /// Start an animation. Completion is reported back as
    /// [`WatchEvent::AnimationStopped`](crate::WatchEvent::AnimationStopped).
    fn schedule_animation(&mut self, animation: PropertyAnimation) -> Result<AnimationId, Error>;

    /// Stop an animation before it finishes.
    fn unschedule_animation(&mut self, id: AnimationId) -> Result<(), Error>;
}

/// Services whose changes the watchface can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Service {
    /// Clock ticks at the given granularity
    TickTimer(TimeUnits),
    BluetoothConnection,
    BatteryState,
}

/// Clock, connectivity and power state of the device.
pub trait DeviceServices {
    /// Current local time.
    fn local_time(&self) -> NaiveDateTime;

    /// Whether the user prefers a 24-hour clock.
    fn clock_is_24h(&self) -> bool;

    /// Whether the phone is currently connected.
    fn bluetooth_connected(&self) -> bool;

    /// Current battery state.
    fn battery_state(&self) -> BatteryChargeState;

    fn subscribe(&mut self, service: Service);

    fn unsubscribe(&mut self, service: Service);
}

/// Outbound half of the message transport.
pub trait Outbox {
    /// Queue an encoded dictionary for the phone. The delivery result arrives
    /// later as an `OutboxSent` or `OutboxFailed` event.
    fn send(&mut self, dictionary: &[u8]) -> Result<(), AppMessageResult>;

    /// Largest dictionary the transport accepts.
    fn outbox_size_maximum(&self) -> usize {
        OUTBOX_SIZE
    }
}

/// Everything the watchface needs from its host.
pub trait Platform: Compositor + DeviceServices + Outbox {}

impl<T> Platform for T where T: Compositor + DeviceServices + Outbox {}
