//! Battery status check
//!
//! Implementation based upon https://github.com/dbrgn/pinetime-rtic/blob/master/pinetime-rtic/src/battery.rs
//! and https://wiki.pine64.org/wiki/PineTime.

use embassy_nrf::{
    gpio::Input,
    peripherals::{P0_12, P0_19},
    saadc::Saadc,
};

use pulse_watchface::{
    battery::{millivolts_from_adc, percent_from_millivolts},
    BatteryChargeState, Error,
};

/// Battery configuration
struct BatteryConfig<'a> {
    /// ADC instance for battery voltage measurement
    adc: Saadc<'a, 1>,
    /// Charge indication pin:
    /// high = battery, low = charging
    pin_charge_indication: Input<'a, P0_12>,
    /// Power presence pin:
    /// high = battery, low = external power
    pin_power_presence: Input<'a, P0_19>,
}

/// Battery API
pub struct Battery {
    /// Battery configuration
    config: BatteryConfig<'static>,
}

impl Battery {
    /// Configure battery settings on boot
    pub fn init(
        adc: Saadc<'static, 1>,
        charge_pin: Input<'static, P0_12>,
        power_pin: Input<'static, P0_19>,
    ) -> Self {
        Self {
            config: BatteryConfig {
                adc,
                pin_charge_indication: charge_pin,
                pin_power_presence: power_pin,
            },
        }
    }

    /// Carging state of the battery
    pub fn is_charging(&self) -> bool {
        self.config.pin_charge_indication.is_low()
    }

    /// Whether external power is connected
    pub fn is_plugged(&self) -> bool {
        self.config.pin_power_presence.is_low()
    }

    /// Battery voltage in millivolts
    pub async fn get_voltage(&mut self) -> Result<u16, Error> {
        let mut buf = [0; 1];
        self.config.adc.sample(&mut buf).await;
        millivolts_from_adc(buf[0])
    }

    /// Sample the hardware
    pub async fn state(&mut self) -> Result<BatteryChargeState, Error> {
        let voltage = self.get_voltage().await?;
        Ok(BatteryChargeState {
            charge_percent: percent_from_millivolts(voltage),
            is_charging: self.is_charging(),
            is_plugged: self.is_plugged(),
        })
    }
}
