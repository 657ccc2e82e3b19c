//! Bluetooth module
//!
//! The phone talks to the watchface through the companion service: encoded
//! dictionaries are written to `inbox` and the watch answers through `outbox`
//! notifications. Writing a Current Time record sets the clock.

use core::sync::atomic::Ordering;

use embassy_futures::select::select;
use embassy_time::{Duration, Instant, Timer};
use heapless::Vec;
use nrf_softdevice::{
    ble::{
        advertisement_builder::{
            Flag, LegacyAdvertisementBuilder, LegacyAdvertisementPayload, ServiceList,
            ServiceUuid16,
        },
        gatt_server, peripheral, Connection,
    },
    Softdevice,
};

use pulse_watchface::{
    config::{BLE_DEVICE_NAME, INBOX_SIZE, OUTBOX_SIZE},
    message::AppMessageResult,
    time::TimeReference,
    WatchEvent,
};

use super::platform::{publish, SharedDevice, EVENTS, INBOX_DROPPED, OUTBOX};

pub static ADV_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
    .services_16(ServiceList::Complete, &[ServiceUuid16::BATTERY])
    .full_name(BLE_DEVICE_NAME)
    .build();

pub static SCAN_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .services_16(ServiceList::Complete, &[ServiceUuid16::BATTERY])
    .build();

#[nrf_softdevice::gatt_server]
pub struct Server {
    pub bas: BatteryService,
    pub companion: CompanionService,
}

#[nrf_softdevice::gatt_service(uuid = "180f")]
pub struct BatteryService {
    #[characteristic(uuid = "2a19", read, notify)]
    pub battery_level: u8,
}

#[nrf_softdevice::gatt_service(uuid = "8f3a0001-5d4c-4b1e-9a57-2c6e1f0b7d90")]
pub struct CompanionService {
    /// Dictionaries from the phone
    #[characteristic(uuid = "8f3a0002-5d4c-4b1e-9a57-2c6e1f0b7d90", write)]
    pub inbox: Vec<u8, INBOX_SIZE>,
    /// Dictionaries for the phone
    #[characteristic(uuid = "8f3a0003-5d4c-4b1e-9a57-2c6e1f0b7d90", read, notify)]
    pub outbox: Vec<u8, OUTBOX_SIZE>,
    /// Current Time Service record
    #[characteristic(uuid = "2a2b", write)]
    pub current_time: [u8; 10],
}

/// Advertise, serve one phone at a time and forward its traffic.
pub async fn serve(sd: &'static Softdevice, server: &Server, device: &SharedDevice) -> ! {
    loop {
        let config = peripheral::Config::default();
        let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: &ADV_DATA,
            scan_data: &SCAN_DATA,
        };
        let conn = match peripheral::advertise_connectable(sd, adv, &config).await {
            Ok(conn) => conn,
            Err(e) => {
                defmt::warn!("Advertising failed: {:?}", e);
                Timer::after(Duration::from_secs(1)).await;
                continue;
            }
        };

        defmt::info!("Phone connected");
        set_connected(device, true).await;

        let gatt = gatt_server::run(&conn, server, |event| match event {
            ServerEvent::Companion(CompanionServiceEvent::InboxWrite(message)) => {
                deliver(message)
            }
            ServerEvent::Companion(CompanionServiceEvent::CurrentTimeWrite(record)) => {
                set_time(device, &record)
            }
            ServerEvent::Companion(CompanionServiceEvent::OutboxCccdWrite { notifications }) => {
                defmt::debug!("Outbox notifications: {}", notifications)
            }
            ServerEvent::Bas(BatteryServiceEvent::BatteryLevelCccdWrite { notifications }) => {
                defmt::debug!("Battery notifications: {}", notifications)
            }
        });
        select(gatt, forward_outbox(server, &conn)).await;

        defmt::info!("Phone disconnected");
        set_connected(device, false).await;
        fail_pending().await;
    }
}

async fn set_connected(device: &SharedDevice, connected: bool) {
    device.lock(|state| state.borrow_mut().connected = connected);
    publish(device, WatchEvent::BluetoothConnection(connected)).await;
}

/// Hand an inbound dictionary to the watchface, counting it as dropped when
/// the queue is full.
fn deliver(message: Vec<u8, INBOX_SIZE>) {
    if EVENTS.try_send(WatchEvent::InboxReceived(message)).is_err() {
        INBOX_DROPPED.fetch_add(1, Ordering::Relaxed);
    }
}

fn set_time(device: &SharedDevice, record: &[u8]) {
    match TimeReference::from_cts_bytes(record, Instant::now().as_millis()) {
        Ok(reference) => {
            device.lock(|state| state.borrow_mut().clock.set_reference(reference));
            defmt::info!("Clock set from phone");
        }
        Err(e) => defmt::warn!("Ignoring current time record: {:?}", e),
    }
}

/// Notify queued dictionaries until the link drops.
async fn forward_outbox(server: &Server, conn: &Connection) -> ! {
    loop {
        let message = OUTBOX.receive().await;
        let event = match server.companion.outbox_notify(conn, &message) {
            Ok(()) => WatchEvent::OutboxSent,
            Err(e) => {
                defmt::warn!("Outbox notify failed: {:?}", e);
                WatchEvent::OutboxFailed(AppMessageResult::SendRejected)
            }
        };
        EVENTS.send(event).await;
    }
}

/// Report dictionaries queued while the link dropped as undeliverable.
async fn fail_pending() {
    while OUTBOX.try_receive().is_ok() {
        EVENTS
            .send(WatchEvent::OutboxFailed(AppMessageResult::NotConnected))
            .await;
    }
}
