//! Display control module for PineTime

use embassy_nrf::{
    gpio::Output,
    peripherals::{P0_14, P0_18, P0_22, P0_23, P0_25, P0_26},
    spim::{self, Spim},
};

use display_interface_spi::SPIInterface;
use embassy_time::Delay;
use embedded_graphics::{pixelcolor::Rgb565, prelude::*};
use mipidsi::{models::ST7789, Builder, Orientation};

use pulse_watchface::config::{SCREEN_H, SCREEN_W};

use super::layers::LayerStack;

const LCD_W: u16 = 240;
const LCD_H: u16 = 240;

/// Top left corner of the watchface area, centered on the panel
const ORIGIN: Point = Point::new(
    (LCD_W as i32 - SCREEN_W as i32) / 2,
    (LCD_H as i32 - SCREEN_H as i32) / 2,
);

type Lcd<'a, SPI> = mipidsi::Display<
    SPIInterface<Spim<'a, SPI>, Output<'a, P0_18>, Output<'a, P0_25>>,
    ST7789,
    Output<'a, P0_26>,
>;

#[allow(unused)]
#[derive(Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum Brightness {
    LEVEL0 = 0,
    LEVEL1 = 1,
    LEVEL2 = 2,
    LEVEL3 = 3,
    LEVEL4 = 4,
    LEVEL5 = 5,
    LEVEL6 = 6,
    LEVEL7 = 7,
}

/// Three active-low backlight pins, each switching power through a resistor.
///
/// - Low: 2.2 kΩ
/// - Mid: 100 Ω
/// - High: 30 Ω
///
/// Combinations of these give 7 brightness levels (+ off).
pub struct BacklightPins<'a> {
    low: Output<'a, P0_14>,
    mid: Output<'a, P0_22>,
    high: Output<'a, P0_23>,
}

impl BacklightPins<'_> {
    /// Configure backlight pins on boot
    pub fn init(
        low: Output<'static, P0_14>,
        mid: Output<'static, P0_22>,
        high: Output<'static, P0_23>,
    ) -> BacklightPins<'static> {
        BacklightPins { low, mid, high }
    }
}

pub struct Display<SPI>
where
    SPI: spim::Instance,
{
    lcd: Lcd<'static, SPI>,
    pins_backlight: BacklightPins<'static>,
    /// Backlight brightness
    brightness: Brightness,
}

impl<SPI> Display<SPI>
where
    SPI: spim::Instance,
{
    /// Configure display settings on boot
    pub fn init(
        spim: Spim<'static, SPI>,
        cs_pin: Output<'static, P0_25>,
        dc_pin: Output<'static, P0_18>,
        rst_pin: Output<'static, P0_26>,
        backlight: BacklightPins<'static>,
    ) -> Option<Self> {
        let lcd = Builder::st7789(SPIInterface::new(spim, dc_pin, cs_pin))
            .with_display_size(LCD_W, LCD_H)
            .with_orientation(Orientation::Portrait(false))
            .init(&mut Delay, Some(rst_pin))
            .ok()?;

        let mut display = Self {
            lcd,
            pins_backlight: backlight,
            brightness: Brightness::LEVEL0,
        };
        if display.clear(Rgb565::WHITE).is_err() {
            defmt::warn!("Failed to clear display");
        }
        Some(display)
    }

    /// Clear the display
    pub fn clear(&mut self, color: Rgb565) -> Result<(), mipidsi::Error> {
        self.lcd.clear(color)
    }

    /// Brightness of the display backlight
    #[allow(unused)]
    pub fn get_brightness(&self) -> Brightness {
        self.brightness
    }

    /// Set the backlight brightness
    pub fn set_brightness(&mut self, level: Brightness) {
        defmt::debug!("Setting backlight brightness to {}", level);
        let bits = level as u8;
        let pins = &mut self.pins_backlight;

        if bits & 0x01 > 0 {
            pins.low.set_low();
        } else {
            pins.low.set_high();
        }
        if bits & 0x02 > 0 {
            pins.mid.set_low();
        } else {
            pins.mid.set_high();
        }
        if bits & 0x04 > 0 {
            pins.high.set_low();
        } else {
            pins.high.set_high();
        }
        self.brightness = level;
    }

    /// Paint the layer tree into the watchface area.
    pub fn render(&mut self, layers: &mut LayerStack) -> Result<(), mipidsi::Error> {
        layers.draw(&mut self.lcd.translated(ORIGIN))
    }
}
