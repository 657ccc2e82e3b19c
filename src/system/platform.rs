//! PineTime implementation of the watchface platform
//!
//! Tasks share device state and the layer tree through blocking mutexes. All
//! of them run on the thread-mode executor, so a lock is never contended.

use core::{
    cell::RefCell,
    sync::atomic::{AtomicU32, Ordering},
};

use chrono::NaiveDateTime;
use embassy_sync::{
    blocking_mutex::{raw::ThreadModeRawMutex, Mutex},
    channel::Channel,
};
use embassy_time::Instant;
use embedded_graphics::primitives::Rectangle;
use heapless::Vec;

use pulse_watchface::{
    config::{CLOCK_24H, OUTBOX_SIZE},
    message::AppMessageResult,
    platform::{
        AnimationId, Bitmap, CompositingMode, Compositor, DeviceServices, FontId, FontSize,
        LayerId, Outbox, PropertyAnimation, Service, TextStyle,
    },
    time::Clock,
    BatteryChargeState, Error, WatchEvent,
};

use crate::peripherals::layers::LayerStack;

/// Events for the watchface, in arrival order
pub static EVENTS: Channel<ThreadModeRawMutex, WatchEvent, 8> = Channel::new();

/// Encoded dictionaries waiting for the phone
pub static OUTBOX: Channel<ThreadModeRawMutex, Vec<u8, OUTBOX_SIZE>, 1> = Channel::new();

/// Inbound messages lost because the event queue was full
pub static INBOX_DROPPED: AtomicU32 = AtomicU32::new(0);

pub type SharedLayers = Mutex<ThreadModeRawMutex, RefCell<LayerStack>>;
pub type SharedDevice = Mutex<ThreadModeRawMutex, RefCell<DeviceState>>;

/// Clock, connection and battery as last seen by the background tasks.
pub struct DeviceState {
    pub clock: Clock,
    pub connected: bool,
    pub battery: BatteryChargeState,
    subscriptions: Vec<Service, 4>,
}

impl DeviceState {
    pub fn new(clock: Clock, battery: BatteryChargeState) -> Self {
        Self {
            clock,
            connected: false,
            battery,
            subscriptions: Vec::new(),
        }
    }

    pub fn local_time(&self) -> NaiveDateTime {
        self.clock.local_time(Instant::now().as_millis())
    }

    /// Whether the watchface subscribed to the service producing `event`.
    fn wants(&self, event: &WatchEvent) -> bool {
        match event {
            WatchEvent::Tick { .. }
            | WatchEvent::BluetoothConnection(_)
            | WatchEvent::BatteryState(_) => {
                self.subscriptions
                    .iter()
                    .any(|service| match (service, event) {
                        (Service::TickTimer(granularity), WatchEvent::Tick { units, .. }) => {
                            units.contains(*granularity)
                        }
                        (Service::BluetoothConnection, WatchEvent::BluetoothConnection(_)) => true,
                        (Service::BatteryState, WatchEvent::BatteryState(_)) => true,
                        _ => false,
                    })
            }
            _ => true,
        }
    }
}

/// Queue `event` for the watchface if it asked for it.
pub async fn publish(device: &SharedDevice, event: WatchEvent) {
    if device.lock(|state| state.borrow().wants(&event)) {
        EVENTS.send(event).await;
    }
}

pub struct PineTimePlatform {
    layers: &'static SharedLayers,
    device: &'static SharedDevice,
}

impl PineTimePlatform {
    pub fn new(layers: &'static SharedLayers, device: &'static SharedDevice) -> Self {
        Self { layers, device }
    }

    fn with_layers<R>(&self, f: impl FnOnce(&mut LayerStack) -> R) -> R {
        self.layers.lock(|layers| f(&mut layers.borrow_mut()))
    }

    fn with_device<R>(&self, f: impl FnOnce(&mut DeviceState) -> R) -> R {
        self.device.lock(|state| f(&mut state.borrow_mut()))
    }
}

impl Compositor for PineTimePlatform {
    fn root_layer(&self) -> LayerId {
        self.with_layers(|layers| layers.root_layer())
    }

    fn create_bitmap_layer(
        &mut self,
        frame: Rectangle,
        bitmap: Bitmap,
        mode: CompositingMode,
    ) -> Result<LayerId, Error> {
        self.with_layers(|layers| layers.create_bitmap_layer(frame, bitmap, mode))
    }

    fn create_text_layer(&mut self, frame: Rectangle, style: TextStyle) -> Result<LayerId, Error> {
        self.with_layers(|layers| layers.create_text_layer(frame, style))
    }

    fn add_child(&mut self, parent: LayerId, child: LayerId) -> Result<(), Error> {
        self.with_layers(|layers| layers.add_child(parent, child))
    }

    fn set_hidden(&mut self, layer: LayerId, hidden: bool) -> Result<(), Error> {
        self.with_layers(|layers| layers.set_hidden(layer, hidden))
    }

    fn set_text(&mut self, layer: LayerId, text: &str) -> Result<(), Error> {
        self.with_layers(|layers| layers.set_text(layer, text))
    }

    fn destroy_layer(&mut self, layer: LayerId) -> Result<(), Error> {
        self.with_layers(|layers| layers.destroy_layer(layer))
    }

    fn load_font(&mut self, size: FontSize) -> Result<FontId, Error> {
        self.with_layers(|layers| layers.load_font(size))
    }

    fn unload_font(&mut self, font: FontId) -> Result<(), Error> {
        self.with_layers(|layers| layers.unload_font(font))
    }

    fn schedule_animation(&mut self, animation: PropertyAnimation) -> Result<AnimationId, Error> {
        self.with_layers(|layers| layers.schedule_animation(animation))
    }

    fn unschedule_animation(&mut self, id: AnimationId) -> Result<(), Error> {
        self.with_layers(|layers| layers.unschedule_animation(id))
    }
}

impl DeviceServices for PineTimePlatform {
    fn local_time(&self) -> NaiveDateTime {
        self.with_device(|state| state.local_time())
    }

    fn clock_is_24h(&self) -> bool {
        CLOCK_24H
    }

    fn bluetooth_connected(&self) -> bool {
        self.with_device(|state| state.connected)
    }

    fn battery_state(&self) -> BatteryChargeState {
        self.with_device(|state| state.battery)
    }

    fn subscribe(&mut self, service: Service) {
        self.with_device(|state| {
            if !state.subscriptions.contains(&service) && state.subscriptions.push(service).is_err()
            {
                defmt::warn!("Too many subscriptions, ignoring {}", service);
            }
        })
    }

    fn unsubscribe(&mut self, service: Service) {
        self.with_device(|state| state.subscriptions.retain(|s| *s != service))
    }
}

impl Outbox for PineTimePlatform {
    fn send(&mut self, dictionary: &[u8]) -> Result<(), AppMessageResult> {
        if !self.with_device(|state| state.connected) {
            return Err(AppMessageResult::NotConnected);
        }
        let message = Vec::from_slice(dictionary).map_err(|_| AppMessageResult::BufferOverflow)?;
        OUTBOX
            .try_send(message)
            .map_err(|_| AppMessageResult::Busy)
    }
}

/// Take the number of inbound messages dropped since the last call.
pub fn take_dropped() -> u32 {
    INBOX_DROPPED.swap(0, Ordering::Relaxed)
}
