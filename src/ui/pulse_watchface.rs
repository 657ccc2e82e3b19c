//! Pulse watchface
//!
//! Time and date in the lower right, weather along the top, battery in the top
//! right corner and a bluetooth-off icon in the top left that only shows while
//! the phone is away. A blank pulse bar slides across the screen every minute.

use chrono::{NaiveDateTime, Timelike};
use heapless::Vec;

use super::{format, Label, WatchFace};
use crate::{
    battery::BatteryChargeState,
    config::{
        BACKGROUND_FRAME, BATTERY_CAPACITY, BATTERY_FRAME, BLUETOOTH_FRAME, DATE_CAPACITY,
        DATE_FRAME, OUTBOX_SIZE, PULSE_DELAY_MS, PULSE_DURATION_MS, PULSE_END_FRAME, PULSE_SIZE,
        PULSE_START_FRAME, TEMPERATURE_CAPACITY, TIME_CAPACITY, TIME_FRAME,
        WEATHER_CAPACITY, WEATHER_FRAME, WEATHER_PLACEHOLDER, WEATHER_REQUEST_INTERVAL_MIN,
    },
    debug, error,
    events::{TimeUnits, WatchEvent},
    info,
    message::{encode_weather_request, DictionaryIter, MessageKey},
    platform::{
        AnimationCurve, AnimationId, Bitmap, CompositingMode, FontId, FontSize, LayerId,
        Platform, PropertyAnimation, ResourceId, Service, TextStyle,
    },
    text::TextBuffer,
    warn, Error,
};

/// Services the watchface subscribes to while loaded.
const SERVICES: [Service; 3] = [
    Service::TickTimer(TimeUnits::MINUTE),
    Service::BluetoothConnection,
    Service::BatteryState,
];

struct Fonts {
    /// Large font for the time
    time: FontId,
    /// Medium font for date and weather
    main: FontId,
    /// Small font for the battery
    sub: FontId,
}

pub struct PulseWatchface<P: Platform> {
    platform: P,
    fonts: Fonts,
    background: LayerId,
    pulse: LayerId,
    bluetooth: LayerId,
    time: Label<TIME_CAPACITY>,
    date: Label<DATE_CAPACITY>,
    weather: Label<WEATHER_CAPACITY>,
    battery: Label<BATTERY_CAPACITY>,
    /// Last temperature received, shown on the weather line
    temperature: TextBuffer<TEMPERATURE_CAPACITY>,
    /// Pulse animation still in flight, if any
    pulse_animation: Option<AnimationId>,
    bluetooth_icon_hidden: bool,
}

/// Layers and fonts that make up the loaded watchface.
struct Scene {
    fonts: Fonts,
    background: LayerId,
    pulse: LayerId,
    time: LayerId,
    date: LayerId,
    weather: LayerId,
    bluetooth: LayerId,
    battery: LayerId,
}

/// Layers and fonts created so far by a load in progress.
#[derive(Default)]
struct Created {
    layers: Vec<LayerId, 7>,
    fonts: Vec<FontId, 3>,
}

impl Created {
    fn layer(&mut self, layer: Result<LayerId, Error>) -> Result<LayerId, Error> {
        let layer = layer?;
        self.layers.push(layer).map_err(|_| Error::OutOfResources)?;
        Ok(layer)
    }

    fn font(&mut self, font: Result<FontId, Error>) -> Result<FontId, Error> {
        let font = font?;
        self.fonts.push(font).map_err(|_| Error::OutOfResources)?;
        Ok(font)
    }

    /// Destroy the layers, then unload the fonts they used.
    fn release<P: Platform>(mut self, platform: &mut P) {
        while let Some(layer) = self.layers.pop() {
            log_failure("destroy layer", platform.destroy_layer(layer));
        }
        while let Some(font) = self.fonts.pop() {
            log_failure("unload font", platform.unload_font(font));
        }
    }
}

fn create_scene<P: Platform>(platform: &mut P, created: &mut Created) -> Result<Scene, Error> {
    let root = platform.root_layer();

    let background = created.layer(platform.create_bitmap_layer(
        BACKGROUND_FRAME,
        Bitmap::Resource(ResourceId::Background),
        CompositingMode::Assign,
    ))?;
    platform.add_child(root, background)?;

    // Blank until something is composited over it
    let pulse = created.layer(platform.create_bitmap_layer(
        PULSE_START_FRAME,
        Bitmap::Blank(PULSE_SIZE),
        CompositingMode::Set,
    ))?;
    platform.add_child(root, pulse)?;

    let fonts = Fonts {
        time: created.font(platform.load_font(FontSize::Large))?,
        main: created.font(platform.load_font(FontSize::Medium))?,
        sub: created.font(platform.load_font(FontSize::Small))?,
    };

    let time = created.layer(
        platform.create_text_layer(TIME_FRAME, TextStyle::right_aligned(fonts.time)),
    )?;
    platform.add_child(root, time)?;

    let date = created.layer(
        platform.create_text_layer(DATE_FRAME, TextStyle::right_aligned(fonts.main)),
    )?;
    platform.add_child(root, date)?;

    let weather = created.layer(
        platform.create_text_layer(WEATHER_FRAME, TextStyle::right_aligned(fonts.main)),
    )?;
    platform.add_child(root, weather)?;

    let bluetooth = created.layer(platform.create_bitmap_layer(
        BLUETOOTH_FRAME,
        Bitmap::Resource(ResourceId::BluetoothOff),
        CompositingMode::Assign,
    ))?;
    platform.add_child(root, bluetooth)?;

    let battery = created.layer(
        platform.create_text_layer(BATTERY_FRAME, TextStyle::right_aligned(fonts.sub)),
    )?;
    platform.add_child(root, battery)?;

    Ok(Scene {
        fonts,
        background,
        pulse,
        time,
        date,
        weather,
        bluetooth,
        battery,
    })
}

impl<P: Platform> WatchFace<P> for PulseWatchface<P> {
    fn load(mut platform: P) -> Result<Self, Error> {
        let mut created = Created::default();
        let scene = match create_scene(&mut platform, &mut created) {
            Ok(scene) => scene,
            Err(e) => {
                error!("Failed to load watchface: {:?}", e);
                created.release(&mut platform);
                return Err(e);
            }
        };

        let mut watchface = Self {
            platform,
            fonts: scene.fonts,
            background: scene.background,
            pulse: scene.pulse,
            bluetooth: scene.bluetooth,
            time: Label::new(scene.time),
            date: Label::new(scene.date),
            weather: Label::new(scene.weather),
            battery: Label::new(scene.battery),
            temperature: TextBuffer::new(),
            pulse_animation: None,
            bluetooth_icon_hidden: false,
        };

        watchface.weather.buffer().set(WEATHER_PLACEHOLDER);
        log_failure("show weather", watchface.weather.push(&mut watchface.platform));

        // Show current state without waiting for the first events
        watchface.update_time();
        let connected = watchface.platform.bluetooth_connected();
        watchface.update_connection(connected);
        let charge = watchface.platform.battery_state();
        watchface.update_battery(&charge);

        for service in SERVICES {
            watchface.platform.subscribe(service);
        }

        info!("Watchface loaded");
        Ok(watchface)
    }

    fn handle(&mut self, event: WatchEvent) {
        match event {
            WatchEvent::Tick { time, units } => self.tick_handler(&time, units),
            WatchEvent::BluetoothConnection(connected) => self.bluetooth_handler(connected),
            WatchEvent::BatteryState(charge) => self.battery_handler(&charge),
            WatchEvent::InboxReceived(message) => self.inbox_received(&message),
            WatchEvent::InboxDropped(reason) => error!("Message dropped! ({:?})", reason),
            WatchEvent::OutboxFailed(reason) => error!("Outbox send failed! ({:?})", reason),
            WatchEvent::OutboxSent => info!("Outbox send success!"),
            WatchEvent::AnimationStopped { id, finished } => self.animation_stopped(id, finished),
        }
    }

    fn unload(self) -> P {
        let Self {
            mut platform,
            fonts,
            background,
            pulse,
            bluetooth,
            time,
            date,
            weather,
            battery,
            pulse_animation,
            ..
        } = self;

        for service in SERVICES {
            platform.unsubscribe(service);
        }

        if let Some(id) = pulse_animation {
            log_failure("unschedule pulse", platform.unschedule_animation(id));
        }

        log_failure("destroy background", platform.destroy_layer(background));

        for font in [fonts.time, fonts.main, fonts.sub] {
            log_failure("unload font", platform.unload_font(font));
        }

        for layer in [
            time.layer(),
            pulse,
            date.layer(),
            weather.layer(),
            bluetooth,
            battery.layer(),
        ] {
            log_failure("destroy layer", platform.destroy_layer(layer));
        }

        info!("Watchface unloaded");
        platform
    }
}

impl<P: Platform> PulseWatchface<P> {
    /// Refresh time and date from the local clock.
    pub fn update_time(&mut self) {
        let now = self.platform.local_time();
        let clock_24h = self.platform.clock_is_24h();

        format::format_time(self.time.buffer(), &now, clock_24h);
        log_failure("show time", self.time.push(&mut self.platform));

        format::format_date(self.date.buffer(), &now);
        log_failure("show date", self.date.push(&mut self.platform));
    }

    /// Show the bluetooth-off icon only while disconnected.
    pub fn update_connection(&mut self, connected: bool) {
        match self.platform.set_hidden(self.bluetooth, connected) {
            Ok(()) => self.bluetooth_icon_hidden = connected,
            Err(e) => warn!("Failed to update bluetooth icon: {:?}", e),
        }
    }

    pub fn update_battery(&mut self, charge: &BatteryChargeState) {
        format::format_battery(self.battery.buffer(), charge);
        log_failure("show battery", self.battery.push(&mut self.platform));
    }

    /// Slide the pulse bar across the screen.
    ///
    /// Only one pulse is tracked; one still in flight is stopped and replaced.
    pub fn run_animation(&mut self) {
        if let Some(previous) = self.pulse_animation.take() {
            debug!("Replacing unfinished pulse animation");
            // It may have finished without its stop event being handled yet
            let _ = self.platform.unschedule_animation(previous);
        }

        let animation = PropertyAnimation {
            layer: self.pulse,
            from: PULSE_START_FRAME,
            to: PULSE_END_FRAME,
            duration_ms: PULSE_DURATION_MS,
            delay_ms: PULSE_DELAY_MS,
            curve: AnimationCurve::Linear,
        };
        match self.platform.schedule_animation(animation) {
            Ok(id) => self.pulse_animation = Some(id),
            Err(e) => warn!("Failed to schedule pulse animation: {:?}", e),
        }
    }

    /// Minute tick: refresh the clock, ask for weather every half hour, pulse.
    pub fn tick_handler(&mut self, tick_time: &NaiveDateTime, _units: TimeUnits) {
        self.update_time();

        if tick_time.minute() % WEATHER_REQUEST_INTERVAL_MIN == 0 {
            self.request_weather();
        }

        self.run_animation();
    }

    pub fn bluetooth_handler(&mut self, connected: bool) {
        self.update_connection(connected);
    }

    pub fn battery_handler(&mut self, charge: &BatteryChargeState) {
        self.update_battery(charge);
    }

    /// Apply an inbound dictionary. Only the temperature is shown; unknown keys
    /// are logged and skipped.
    pub fn inbox_received(&mut self, message: &[u8]) {
        let tuples = match DictionaryIter::new(message) {
            Ok(tuples) => tuples,
            Err(e) => {
                error!("Message dropped! ({:?})", e);
                return;
            }
        };

        for tuple in tuples {
            let tuple = match tuple {
                Ok(tuple) => tuple,
                Err(e) => {
                    error!("Malformed tuple, ignoring the rest of the message: {:?}", e);
                    break;
                }
            };

            match MessageKey::from_key(tuple.key) {
                Some(MessageKey::Temperature) => match tuple.value.as_i32() {
                    Some(degrees) => format::format_temperature(&mut self.temperature, degrees),
                    None => error!("Temperature is not an integer"),
                },
                _ => error!("Key {} not recognized!", tuple.key),
            }
        }

        let result = self.weather.show(
            &mut self.platform,
            format_args!("{}", self.temperature.as_str()),
        );
        log_failure("show weather", result);
    }

    fn request_weather(&mut self) {
        let mut buf = [0u8; OUTBOX_SIZE];
        let len = self.platform.outbox_size_maximum().min(OUTBOX_SIZE);
        match encode_weather_request(&mut buf[..len]) {
            Ok(dictionary) => {
                if let Err(reason) = self.platform.send(dictionary) {
                    error!("Outbox send failed! ({:?})", reason);
                }
            }
            Err(e) => error!("Failed to build weather request: {:?}", e),
        }
    }

    fn animation_stopped(&mut self, id: AnimationId, finished: bool) {
        if self.pulse_animation == Some(id) {
            debug!("Pulse animation stopped (finished: {})", finished);
            self.pulse_animation = None;
        }
    }

    pub fn time_text(&self) -> &str {
        self.time.text()
    }

    pub fn date_text(&self) -> &str {
        self.date.text()
    }

    pub fn weather_text(&self) -> &str {
        self.weather.text()
    }

    pub fn battery_text(&self) -> &str {
        self.battery.text()
    }

    pub fn bluetooth_icon_visible(&self) -> bool {
        !self.bluetooth_icon_hidden
    }

    /// Pulse animation still in flight, if any.
    pub fn pulse_animation(&self) -> Option<AnimationId> {
        self.pulse_animation
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }
}

fn log_failure(what: &str, result: Result<(), Error>) {
    if let Err(e) = result {
        warn!("Failed to {}: {:?}", what, e);
    }
}
