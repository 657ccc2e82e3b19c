#![no_std]
#![no_main]

mod peripherals;
mod system;

// Panic handler and debugging
use defmt::unwrap;

use defmt_rtt as _;
use panic_probe as _;

// Device
use core::cell::RefCell;
use embassy_executor::Spawner;
use embassy_nrf::{
    bind_interrupts,
    gpio::{Input, Level, Output, OutputDrive, Pull},
    peripherals::SPI2,
    saadc::{self, ChannelConfig, Resolution, Saadc},
    spim,
};
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::{Duration, Instant, Ticker, Timer};
use nrf_softdevice::Softdevice;
use static_cell::StaticCell;

bind_interrupts!(struct Irqs {
    SAADC => saadc::InterruptHandler;
    SPIM2_SPIS2_SPI2 => spim::InterruptHandler<SPI2>;
});

// Crate
use peripherals::{
    battery::Battery,
    display::{BacklightPins, Brightness, Display},
    layers::LayerStack,
};
use system::{
    bluetooth::{self, Server},
    config::SystemConfig,
    platform::{self, DeviceState, PineTimePlatform, SharedDevice, SharedLayers, EVENTS},
};

use pulse_watchface::{
    config::UTC_OFFSET_SECS,
    message::AppMessageResult,
    time::{Clock, MinuteTicker, TimeReference},
    BatteryChargeState, PulseWatchface, WatchEvent, WatchFace,
};

// Include current UTC epoch at compile time
include!(concat!(env!("OUT_DIR"), "/utc.rs"));

/// Redraw interval
const FRAME_INTERVAL: Duration = Duration::from_millis(50);

static LAYERS: StaticCell<SharedLayers> = StaticCell::new();
static DEVICE: StaticCell<SharedDevice> = StaticCell::new();
static SERVER: StaticCell<Server> = StaticCell::new();

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

#[embassy_executor::task(pool_size = 1)]
async fn ble_task(
    sd: &'static Softdevice,
    server: &'static Server,
    device: &'static SharedDevice,
) -> ! {
    bluetooth::serve(sd, server, device).await
}

/// Derive minute ticks from the clock, sampled every second.
#[embassy_executor::task(pool_size = 1)]
async fn update_time(device: &'static SharedDevice) {
    let mut ticker = MinuteTicker::new();
    let mut tick = Ticker::every(Duration::from_secs(1));
    loop {
        let now = device.lock(|state| state.borrow().local_time());
        if let Some(units) = ticker.poll(now) {
            defmt::debug!("Minute tick");
            platform::publish(device, WatchEvent::Tick { time: now, units }).await;
        }

        // Re-schedule the timer interrupt
        tick.next().await;
    }
}

/// Fetch the battery status from the hardware.
#[embassy_executor::task(pool_size = 1)]
async fn update_battery_status(
    mut battery: Battery,
    server: &'static Server,
    device: &'static SharedDevice,
) {
    loop {
        match battery.state().await {
            Ok(charge) => {
                let changed = device.lock(|state| {
                    let mut state = state.borrow_mut();
                    let changed = state.battery != charge;
                    state.battery = charge;
                    changed
                });
                if changed {
                    defmt::info!("Battery status updated: {}", charge);
                    if let Err(e) = server.bas.battery_level_set(&charge.charge_percent) {
                        defmt::warn!("Failed to update battery service: {:?}", e);
                    }
                    platform::publish(device, WatchEvent::BatteryState(charge)).await;
                }
            }
            Err(e) => defmt::warn!("Battery measurement failed: {}", e),
        }

        // Re-schedule the timer interrupt in 1s
        Timer::after(Duration::from_secs(1)).await;
    }
}

/// Step animations and push changed layers to the LCD.
#[embassy_executor::task(pool_size = 1)]
async fn render(mut display: Display<SPI2>, layers: &'static SharedLayers) {
    let mut tick = Ticker::every(FRAME_INTERVAL);
    loop {
        let stopped = layers.lock(|layers| {
            let mut layers = layers.borrow_mut();
            layers.step(Instant::now());
            if display.render(&mut layers).is_err() {
                defmt::warn!("Display update failed");
            }
            layers.take_stopped()
        });

        for (id, finished) in stopped {
            EVENTS
                .send(WatchEvent::AnimationStopped { id, finished })
                .await;
        }

        tick.next().await;
    }
}

/// Deliver events to the watchface one at a time.
#[embassy_executor::task(pool_size = 1)]
async fn event_loop(mut watchface: PulseWatchface<PineTimePlatform>) {
    loop {
        let event = EVENTS.receive().await;
        watchface.handle(event);

        for _ in 0..platform::take_dropped() {
            watchface.handle(WatchEvent::InboxDropped(AppMessageResult::Busy));
        }
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let mut p = embassy_nrf::init(SystemConfig::embassy());
    SystemConfig::interrupt_priorities();
    defmt::info!("Initializing");

    // Initialize SAADC
    let mut saadc_config = saadc::Config::default();
    // Set resolution to 12bit, necessary for correct battery status calculation
    saadc_config.resolution = Resolution::_12BIT;
    // Pin P0.31: Voltage level
    let channel_config = ChannelConfig::single_ended(&mut p.P0_31);
    let saadc = Saadc::new(p.SAADC, Irqs, saadc_config, [channel_config]);
    saadc.calibrate().await;

    // Initalize Battery
    let mut battery = Battery::init(
        saadc,
        Input::new(p.P0_12, Pull::None),
        Input::new(p.P0_19, Pull::None),
    );
    let charge = match battery.state().await {
        Ok(charge) => charge,
        Err(e) => {
            defmt::warn!("Initial battery measurement failed: {}", e);
            BatteryChargeState::default()
        }
    };

    // Initialize SPI
    let mut spim_config = spim::Config::default();
    // Use SPI at 8MHz (the fastest clock available on the nRF52832),
    // otherwise refreshing will be super slow.
    spim_config.frequency = spim::Frequency::M8;
    // SPI must be used in mode 3. Mode 0 (the default) won't work.
    spim_config.mode = spim::MODE_3;

    let spim = spim::Spim::new(p.SPI2, Irqs, p.P0_02, p.P0_04, p.P0_03, spim_config);

    // Initialize LCD
    let backlight = BacklightPins::init(
        Output::new(p.P0_14, Level::High, OutputDrive::Standard),
        Output::new(p.P0_22, Level::High, OutputDrive::Standard),
        Output::new(p.P0_23, Level::High, OutputDrive::Standard),
    );
    let Some(mut display) = Display::init(
        spim,
        Output::new(p.P0_25, Level::Low, OutputDrive::Standard),
        Output::new(p.P0_18, Level::Low, OutputDrive::Standard),
        Output::new(p.P0_26, Level::Low, OutputDrive::Standard),
        backlight,
    ) else {
        defmt::panic!("Display initialization failed");
    };
    display.set_brightness(Brightness::LEVEL2);

    // Start the clock at build time until the phone sets it
    let reference = unwrap!(TimeReference::from_timestamp(
        UTC_EPOCH,
        Instant::now().as_millis()
    ));
    let clock = Clock::new(reference, UTC_OFFSET_SECS);

    let device: &'static SharedDevice =
        DEVICE.init(Mutex::new(RefCell::new(DeviceState::new(clock, charge))));
    let layers: &'static SharedLayers = LAYERS.init(Mutex::new(RefCell::new(LayerStack::new())));

    // Initialize Bluetooth
    let sd = Softdevice::enable(&SystemConfig::softdevice());
    let server: &'static Server = SERVER.init(unwrap!(Server::new(sd)));
    if let Err(e) = server.bas.battery_level_set(&charge.charge_percent) {
        defmt::warn!("Failed to update battery service: {:?}", e);
    }
    let sd: &'static Softdevice = sd;

    let watchface = match PulseWatchface::load(PineTimePlatform::new(layers, device)) {
        Ok(watchface) => watchface,
        Err(e) => defmt::panic!("Failed to load watchface: {}", e),
    };

    defmt::info!("Initialization finished");

    // Schedule tasks
    unwrap!(spawner.spawn(softdevice_task(sd)));
    unwrap!(spawner.spawn(ble_task(sd, server, device)));
    unwrap!(spawner.spawn(update_time(device)));
    unwrap!(spawner.spawn(update_battery_status(battery, server, device)));
    unwrap!(spawner.spawn(render(display, layers)));
    unwrap!(spawner.spawn(event_loop(watchface)));
}
