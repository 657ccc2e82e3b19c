//! Integration tests for the pulse watchface, driven through a recording
//! platform on the host.

use std::{cell::Cell, collections::BTreeMap, rc::Rc};

use chrono::{NaiveDate, NaiveDateTime};
use embedded_graphics::primitives::Rectangle;
use pulse_watchface::{
    config,
    message::{AppMessageResult, DictionaryWriter},
    platform::{
        AnimationId, Bitmap, CompositingMode, Compositor, DeviceServices, FontId, FontSize, LayerId,
        Outbox, PropertyAnimation, ResourceId, Service, TextAlignment, TextStyle,
    },
    BatteryChargeState, Error, PulseWatchface, TimeUnits, WatchEvent, WatchFace,
};

// Recording platform

#[derive(Debug, Clone, PartialEq)]
enum Content {
    Bitmap(Bitmap),
    Text { style: TextStyle, text: String },
}

#[derive(Debug, Clone, PartialEq)]
struct Layer {
    frame: Rectangle,
    content: Content,
    hidden: bool,
    parent: Option<LayerId>,
}

const ROOT: LayerId = LayerId(0);

struct MockPlatform {
    next_id: u16,
    layers: BTreeMap<LayerId, Layer>,
    fonts: BTreeMap<FontId, FontSize>,
    animations: BTreeMap<AnimationId, PropertyAnimation>,
    scheduled: Vec<AnimationId>,
    unscheduled: Vec<AnimationId>,
    subscriptions: Vec<Service>,
    sent: Vec<Vec<u8>>,
    send_result: Result<(), AppMessageResult>,
    outbox_max: usize,
    fail_set_text: bool,
    /// Layers and fonts that can exist at once
    layer_limit: usize,
    font_limit: usize,
    /// Receives the live layer and font counts when the platform is dropped
    leftovers: Option<Rc<Cell<(usize, usize)>>>,
    now: NaiveDateTime,
    clock_24h: bool,
    connected: bool,
    battery: BatteryChargeState,
}

impl MockPlatform {
    fn new() -> Self {
        Self {
            next_id: 1,
            layers: BTreeMap::new(),
            fonts: BTreeMap::new(),
            animations: BTreeMap::new(),
            scheduled: Vec::new(),
            unscheduled: Vec::new(),
            subscriptions: Vec::new(),
            sent: Vec::new(),
            send_result: Ok(()),
            outbox_max: config::OUTBOX_SIZE,
            fail_set_text: false,
            layer_limit: usize::MAX,
            font_limit: usize::MAX,
            leftovers: None,
            now: datetime(21, 5),
            clock_24h: true,
            connected: false,
            battery: BatteryChargeState {
                charge_percent: 57,
                is_charging: false,
                is_plugged: false,
            },
        }
    }

    fn next_id(&mut self) -> u16 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn add_layer(&mut self, frame: Rectangle, content: Content) -> Result<LayerId, Error> {
        if self.layers.len() >= self.layer_limit {
            return Err(Error::OutOfResources);
        }
        let id = LayerId(self.next_id());
        self.layers.insert(
            id,
            Layer {
                frame,
                content,
                hidden: false,
                parent: None,
            },
        );
        Ok(id)
    }

    fn layer_at(&self, frame: Rectangle) -> &Layer {
        self.layers
            .values()
            .find(|layer| layer.frame == frame)
            .expect("no layer with that frame")
    }

    fn text_at(&self, frame: Rectangle) -> &str {
        match &self.layer_at(frame).content {
            Content::Text { text, .. } => text,
            Content::Bitmap(_) => panic!("not a text layer"),
        }
    }
}

impl Compositor for MockPlatform {
    fn root_layer(&self) -> LayerId {
        ROOT
    }

    fn create_bitmap_layer(
        &mut self,
        frame: Rectangle,
        bitmap: Bitmap,
        _mode: CompositingMode,
    ) -> Result<LayerId, Error> {
        self.add_layer(frame, Content::Bitmap(bitmap))
    }

    fn create_text_layer(&mut self, frame: Rectangle, style: TextStyle) -> Result<LayerId, Error> {
        if !self.fonts.contains_key(&style.font) {
            return Err(Error::NoSuchFont);
        }
        self.add_layer(
            frame,
            Content::Text {
                style,
                text: String::new(),
            },
        )
    }

    fn add_child(&mut self, parent: LayerId, child: LayerId) -> Result<(), Error> {
        let layer = self.layers.get_mut(&child).ok_or(Error::NoSuchLayer)?;
        layer.parent = Some(parent);
        Ok(())
    }

    fn set_hidden(&mut self, layer: LayerId, hidden: bool) -> Result<(), Error> {
        self.layers.get_mut(&layer).ok_or(Error::NoSuchLayer)?.hidden = hidden;
        Ok(())
    }

    fn set_text(&mut self, layer: LayerId, text: &str) -> Result<(), Error> {
        if self.fail_set_text {
            return Err(Error::OutOfResources);
        }
        match &mut self.layers.get_mut(&layer).ok_or(Error::NoSuchLayer)?.content {
            Content::Text { text: current, .. } => {
                *current = text.to_string();
                Ok(())
            }
            Content::Bitmap(_) => Err(Error::NoSuchLayer),
        }
    }

    fn destroy_layer(&mut self, layer: LayerId) -> Result<(), Error> {
        self.layers.remove(&layer).map(|_| ()).ok_or(Error::NoSuchLayer)
    }

    fn load_font(&mut self, size: FontSize) -> Result<FontId, Error> {
        if self.fonts.len() >= self.font_limit {
            return Err(Error::OutOfResources);
        }
        let id = FontId(self.next_id());
        self.fonts.insert(id, size);
        Ok(id)
    }

    fn unload_font(&mut self, font: FontId) -> Result<(), Error> {
        self.fonts.remove(&font).map(|_| ()).ok_or(Error::NoSuchFont)
    }

    fn schedule_animation(&mut self, animation: PropertyAnimation) -> Result<AnimationId, Error> {
        let id = AnimationId(self.next_id());
        self.animations.insert(id, animation);
        self.scheduled.push(id);
        Ok(id)
    }

    fn unschedule_animation(&mut self, id: AnimationId) -> Result<(), Error> {
        self.animations.remove(&id).ok_or(Error::NoSuchAnimation)?;
        self.unscheduled.push(id);
        Ok(())
    }
}

impl Drop for MockPlatform {
    fn drop(&mut self) {
        if let Some(leftovers) = &self.leftovers {
            leftovers.set((self.layers.len(), self.fonts.len()));
        }
    }
}

impl DeviceServices for MockPlatform {
    fn local_time(&self) -> NaiveDateTime {
        self.now
    }

    fn clock_is_24h(&self) -> bool {
        self.clock_24h
    }

    fn bluetooth_connected(&self) -> bool {
        self.connected
    }

    fn battery_state(&self) -> BatteryChargeState {
        self.battery
    }

    fn subscribe(&mut self, service: Service) {
        self.subscriptions.push(service);
    }

    fn unsubscribe(&mut self, service: Service) {
        self.subscriptions.retain(|s| *s != service);
    }
}

impl Outbox for MockPlatform {
    fn send(&mut self, dictionary: &[u8]) -> Result<(), AppMessageResult> {
        self.sent.push(dictionary.to_vec());
        self.send_result
    }

    fn outbox_size_maximum(&self) -> usize {
        self.outbox_max
    }
}

// Helpers

fn datetime(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 16)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn load() -> PulseWatchface<MockPlatform> {
    PulseWatchface::load(MockPlatform::new()).expect("load failed")
}

fn tick(watchface: &mut PulseWatchface<MockPlatform>, h: u32, m: u32) {
    watchface.platform_mut().now = datetime(h, m);
    watchface.handle(WatchEvent::Tick {
        time: datetime(h, m),
        units: TimeUnits::MINUTE,
    });
}

fn inbox(build: impl FnOnce(&mut DictionaryWriter)) -> WatchEvent {
    let mut buf = [0u8; config::INBOX_SIZE];
    let mut writer = DictionaryWriter::new(&mut buf).unwrap();
    build(&mut writer);
    let bytes = writer.finish();
    WatchEvent::InboxReceived(heapless::Vec::from_slice(bytes).unwrap())
}

/// Load on a platform expected to refuse, returning the error and the layer
/// and font counts left behind.
fn load_refused(mut platform: MockPlatform) -> (Option<Error>, (usize, usize)) {
    let leftovers = Rc::new(Cell::new((usize::MAX, usize::MAX)));
    platform.leftovers = Some(leftovers.clone());
    let error = PulseWatchface::load(platform).err();
    (error, leftovers.get())
}

const WEATHER_REQUEST: [u8; 9] = [1, 0, 0, 0, 0, 2, 1, 0, 0];

// Load / unload

#[test]
fn load_builds_every_layer_on_root() {
    let watchface = load();
    let platform = watchface.platform();

    assert_eq!(platform.layers.len(), 7);
    assert!(platform.layers.values().all(|l| l.parent == Some(ROOT)));
    assert_eq!(platform.fonts.len(), 3);

    assert_eq!(
        platform.layer_at(config::BACKGROUND_FRAME).content,
        Content::Bitmap(Bitmap::Resource(ResourceId::Background))
    );
    assert_eq!(
        platform.layer_at(config::PULSE_START_FRAME).content,
        Content::Bitmap(Bitmap::Blank(config::PULSE_SIZE))
    );
    assert_eq!(
        platform.layer_at(config::BLUETOOTH_FRAME).content,
        Content::Bitmap(Bitmap::Resource(ResourceId::BluetoothOff))
    );
}

#[test]
fn load_uses_three_font_sizes_right_aligned() {
    let watchface = load();
    let platform = watchface.platform();

    let font_of = |frame| match &platform.layer_at(frame).content {
        Content::Text { style, .. } => {
            assert_eq!(style.alignment, TextAlignment::Right);
            platform.fonts[&style.font]
        }
        Content::Bitmap(_) => panic!("not a text layer"),
    };
    assert_eq!(font_of(config::TIME_FRAME), FontSize::Large);
    assert_eq!(font_of(config::DATE_FRAME), FontSize::Medium);
    assert_eq!(font_of(config::WEATHER_FRAME), FontSize::Medium);
    assert_eq!(font_of(config::BATTERY_FRAME), FontSize::Small);
}

#[test]
fn load_shows_current_state_immediately() {
    let watchface = load();
    let platform = watchface.platform();

    assert_eq!(watchface.time_text(), "21:05");
    assert_eq!(watchface.date_text(), "Fri16");
    assert_eq!(watchface.battery_text(), "57%");
    assert_eq!(watchface.weather_text(), "...");
    assert!(watchface.bluetooth_icon_visible());

    assert_eq!(platform.text_at(config::TIME_FRAME), "21:05");
    assert_eq!(platform.text_at(config::DATE_FRAME), "Fri16");
    assert_eq!(platform.text_at(config::BATTERY_FRAME), "57%");
    assert_eq!(platform.text_at(config::WEATHER_FRAME), "...");
    assert!(!platform.layer_at(config::BLUETOOTH_FRAME).hidden);
}

#[test]
fn load_subscribes_to_services() {
    let watchface = load();
    assert_eq!(
        watchface.platform().subscriptions,
        vec![
            Service::TickTimer(TimeUnits::MINUTE),
            Service::BluetoothConnection,
            Service::BatteryState,
        ]
    );
}

#[test]
fn load_sends_nothing() {
    let watchface = load();
    assert!(watchface.platform().sent.is_empty());
    assert!(watchface.platform().scheduled.is_empty());
}

#[test]
fn unload_releases_everything() {
    let mut watchface = load();
    tick(&mut watchface, 12, 1);
    let pulse = watchface.pulse_animation().unwrap();

    let platform = watchface.unload();
    assert!(platform.layers.is_empty());
    assert!(platform.fonts.is_empty());
    assert!(platform.subscriptions.is_empty());
    assert_eq!(platform.unscheduled, vec![pulse]);
}

// Tick handling

#[test]
fn tick_updates_clock() {
    let mut watchface = load();
    tick(&mut watchface, 9, 7);
    assert_eq!(watchface.time_text(), " 9:07");
    assert_eq!(watchface.platform().text_at(config::TIME_FRAME), " 9:07");
}

#[test]
fn tick_uses_12h_clock_when_configured() {
    let mut platform = MockPlatform::new();
    platform.clock_24h = false;
    let mut watchface = PulseWatchface::load(platform).unwrap();
    assert_eq!(watchface.time_text(), " 9:05");

    tick(&mut watchface, 0, 15);
    assert_eq!(watchface.time_text(), "12:15");
}

#[test]
fn weather_requested_on_the_half_hour_only() {
    let mut watchface = load();
    for m in 0..60 {
        watchface.platform_mut().sent.clear();
        tick(&mut watchface, 10, m);
        let sent = &watchface.platform().sent;
        if m % 30 == 0 {
            assert_eq!(sent, &vec![WEATHER_REQUEST.to_vec()], "minute {m}");
        } else {
            assert!(sent.is_empty(), "minute {m}");
        }
    }
}

#[test]
fn every_tick_requests_one_pulse() {
    let mut watchface = load();
    for (i, m) in (1..=5).enumerate() {
        tick(&mut watchface, 10, m);
        assert_eq!(watchface.platform().scheduled.len(), i + 1);
    }

    let platform = watchface.platform();
    let animation = platform.animations[&watchface.pulse_animation().unwrap()];
    assert_eq!(animation.from, config::PULSE_START_FRAME);
    assert_eq!(animation.to, config::PULSE_END_FRAME);
    assert_eq!(animation.duration_ms, 700);
    assert_eq!(animation.delay_ms, 100);
}

#[test]
fn unfinished_pulse_is_replaced() {
    let mut watchface = load();
    tick(&mut watchface, 10, 1);
    let first = watchface.pulse_animation().unwrap();
    tick(&mut watchface, 10, 2);
    let second = watchface.pulse_animation().unwrap();

    assert_ne!(first, second);
    assert_eq!(watchface.platform().unscheduled, vec![first]);
    assert_eq!(watchface.platform().animations.len(), 1);
}

#[test]
fn finished_pulse_is_released() {
    let mut watchface = load();
    tick(&mut watchface, 10, 1);
    let first = watchface.pulse_animation().unwrap();
    watchface.platform_mut().animations.remove(&first);
    watchface.handle(WatchEvent::AnimationStopped {
        id: first,
        finished: true,
    });
    assert_eq!(watchface.pulse_animation(), None);

    tick(&mut watchface, 10, 2);
    assert!(watchface.platform().unscheduled.is_empty());
    assert_eq!(watchface.platform().scheduled.len(), 2);
}

#[test]
fn stale_stop_event_is_ignored() {
    let mut watchface = load();
    tick(&mut watchface, 10, 1);
    let first = watchface.pulse_animation().unwrap();
    tick(&mut watchface, 10, 2);
    let second = watchface.pulse_animation().unwrap();

    watchface.handle(WatchEvent::AnimationStopped {
        id: first,
        finished: false,
    });
    assert_eq!(watchface.pulse_animation(), Some(second));
}

#[test]
fn failed_send_does_not_skip_clock_or_pulse() {
    let mut watchface = load();
    watchface.platform_mut().send_result = Err(AppMessageResult::NotConnected);
    tick(&mut watchface, 11, 30);

    assert_eq!(watchface.platform().sent.len(), 1);
    assert_eq!(watchface.time_text(), "11:30");
    assert_eq!(watchface.platform().scheduled.len(), 1);
}

#[test]
fn request_too_large_for_outbox_is_not_sent() {
    let mut platform = MockPlatform::new();
    platform.outbox_max = 4;
    let mut watchface = PulseWatchface::load(platform).unwrap();
    tick(&mut watchface, 11, 0);

    assert!(watchface.platform().sent.is_empty());
    assert_eq!(watchface.time_text(), "11:00");
    assert_eq!(watchface.platform().scheduled.len(), 1);
}

// Bluetooth and battery

#[test]
fn bluetooth_icon_is_negation_of_connection() {
    let mut watchface = load();
    for connected in [true, false, true, true, false] {
        watchface.handle(WatchEvent::BluetoothConnection(connected));
        assert_eq!(watchface.bluetooth_icon_visible(), !connected);
        assert_eq!(
            watchface.platform().layer_at(config::BLUETOOTH_FRAME).hidden,
            connected
        );
    }
}

#[test]
fn battery_events_are_formatted() {
    let mut watchface = load();
    let cases = [
        ((57, false, false), "57%"),
        ((42, true, true), "/42%/"),
        ((42, false, true), "FULL!"),
        ((100, true, true), "/100%/"),
    ];
    for ((charge_percent, is_charging, is_plugged), expected) in cases {
        watchface.handle(WatchEvent::BatteryState(BatteryChargeState {
            charge_percent,
            is_charging,
            is_plugged,
        }));
        assert_eq!(watchface.battery_text(), expected);
        assert_eq!(
            watchface.platform().text_at(config::BATTERY_FRAME),
            expected
        );
    }
}

// Inbox

#[test]
fn temperature_is_shown() {
    let mut watchface = load();
    watchface.handle(inbox(|w| w.write_i32(0, -5).unwrap()));
    assert_eq!(watchface.weather_text(), "-5C");
    assert_eq!(watchface.platform().text_at(config::WEATHER_FRAME), "-5C");
}

#[test]
fn unknown_key_does_not_abort_processing() {
    let mut watchface = load();
    watchface.handle(inbox(|w| {
        w.write_i32(99, 1234).unwrap();
        w.write_i32(0, 18).unwrap();
    }));
    assert_eq!(watchface.weather_text(), "18C");
}

#[test]
fn conditions_are_not_shown() {
    let mut watchface = load();
    watchface.handle(inbox(|w| {
        w.write_i32(0, 7).unwrap();
        w.write_cstring(1, "Cloudy").unwrap();
    }));
    assert_eq!(watchface.weather_text(), "7C");
}

#[test]
fn message_without_temperature_keeps_last_value() {
    let mut watchface = load();
    watchface.handle(inbox(|w| w.write_i32(0, 21).unwrap()));
    watchface.handle(inbox(|w| w.write_u8(99, 1).unwrap()));
    assert_eq!(watchface.weather_text(), "21C");
}

#[test]
fn narrow_temperature_encodings_are_accepted() {
    let mut watchface = load();
    watchface.handle(inbox(|w| w.write_u8(0, 12).unwrap()));
    assert_eq!(watchface.weather_text(), "12C");
}

#[test]
fn truncated_message_keeps_decoded_tuples() {
    let mut watchface = load();
    let mut bytes = heapless::Vec::<u8, { config::INBOX_SIZE }>::new();
    // Two tuples announced; only the first is complete.
    bytes
        .extend_from_slice(&[2, 0, 0, 0, 0, 3, 4, 0, 3, 0, 0, 0, 1, 0, 0])
        .unwrap();
    watchface.handle(WatchEvent::InboxReceived(bytes));
    assert_eq!(watchface.weather_text(), "3C");
}

#[test]
fn empty_message_is_dropped() {
    let mut watchface = load();
    watchface.handle(WatchEvent::InboxReceived(heapless::Vec::new()));
    assert_eq!(watchface.weather_text(), "...");
}

#[test]
fn messaging_status_events_change_nothing() {
    let mut watchface = load();
    watchface.handle(WatchEvent::InboxDropped(AppMessageResult::BufferOverflow));
    watchface.handle(WatchEvent::OutboxFailed(AppMessageResult::SendTimeout));
    watchface.handle(WatchEvent::OutboxSent);

    assert_eq!(watchface.weather_text(), "...");
    assert_eq!(watchface.time_text(), "21:05");
    assert!(watchface.platform().sent.is_empty());
}

// Failures

#[test]
fn compositor_failures_are_not_fatal() {
    let mut watchface = load();
    watchface.platform_mut().fail_set_text = true;

    tick(&mut watchface, 10, 30);
    watchface.handle(inbox(|w| w.write_i32(0, 4).unwrap()));
    watchface.handle(WatchEvent::BatteryState(BatteryChargeState::default()));

    // Buffers still follow the events even though the layers could not.
    assert_eq!(watchface.time_text(), "10:30");
    assert_eq!(watchface.weather_text(), "4C");
    assert_eq!(watchface.battery_text(), "0%");
    assert_eq!(watchface.platform().text_at(config::TIME_FRAME), "21:05");
    assert_eq!(watchface.platform().sent.len(), 1);
}

#[test]
fn load_survives_placeholder_failure() {
    let mut platform = MockPlatform::new();
    platform.fail_set_text = true;
    let watchface = PulseWatchface::load(platform).expect("load failed");

    assert_eq!(watchface.weather_text(), config::WEATHER_PLACEHOLDER);
    assert_eq!(watchface.platform().text_at(config::WEATHER_FRAME), "");
    assert_eq!(watchface.platform().layers.len(), 7);
    assert_eq!(watchface.platform().subscriptions.len(), 3);
}

#[test]
fn failed_font_load_releases_what_was_created() {
    let mut platform = MockPlatform::new();
    platform.font_limit = 2;
    assert_eq!(load_refused(platform), (Some(Error::OutOfResources), (0, 0)));
}

#[test]
fn failed_last_layer_releases_what_was_created() {
    let mut platform = MockPlatform::new();
    platform.layer_limit = 6;
    assert_eq!(load_refused(platform), (Some(Error::OutOfResources), (0, 0)));
}
