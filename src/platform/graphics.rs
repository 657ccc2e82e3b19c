//! Value types shared between the watchface and the compositor.

use embedded_graphics::{geometry::Size, primitives::Rectangle};

/// Handle to a layer owned by the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LayerId(pub u16);

/// Handle to a loaded font.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FontId(pub u16);

/// Handle to a scheduled animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AnimationId(pub u16);

/// Images bundled with the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResourceId {
    /// Watchface background, white variant
    Background,
    /// Bluetooth-off icon, white variant
    BluetoothOff,
}

/// Bitmap content of an image layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bitmap {
    Resource(ResourceId),
    /// Fully transparent bitmap of the given size
    Blank(Size),
}

/// Custom font sizes bundled with the firmware, in points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FontSize {
    Small = 16,
    Medium = 26,
    Large = 36,
}

/// How a bitmap is combined with what is already drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CompositingMode {
    /// Copy every pixel
    #[default]
    Assign,
    /// Copy only opaque pixels
    Set,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Color {
    Clear,
    Black,
    White,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TextAlignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Appearance of a text layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStyle {
    pub background: Color,
    pub foreground: Color,
    pub alignment: TextAlignment,
    pub font: FontId,
}

impl TextStyle {
    /// Black text on a transparent background, right aligned.
    pub const fn right_aligned(font: FontId) -> Self {
        Self {
            background: Color::Clear,
            foreground: Color::Black,
            alignment: TextAlignment::Right,
            font,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AnimationCurve {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
}

impl AnimationCurve {
    /// Map linear progress (0..=1000) onto the curve (0..=1000).
    pub fn apply(self, progress: u32) -> u32 {
        let t = progress.min(1000);
        match self {
            AnimationCurve::Linear => t,
            AnimationCurve::EaseIn => t * t / 1000,
            AnimationCurve::EaseOut => 1000 - (1000 - t) * (1000 - t) / 1000,
            AnimationCurve::EaseInOut => {
                if t < 500 {
                    2 * t * t / 1000
                } else {
                    1000 - 2 * (1000 - t) * (1000 - t) / 1000
                }
            }
        }
    }
}

/// One-shot animation of a layer's frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyAnimation {
    pub layer: LayerId,
    pub from: Rectangle,
    pub to: Rectangle,
    pub duration_ms: u32,
    pub delay_ms: u32,
    pub curve: AnimationCurve,
}

impl PropertyAnimation {
    /// Frame of the animated layer `elapsed_ms` after scheduling.
    pub fn frame_at(&self, elapsed_ms: u32) -> Rectangle {
        let running = elapsed_ms.saturating_sub(self.delay_ms);
        let progress = if self.duration_ms == 0 {
            1000
        } else {
            (running.min(self.duration_ms) as u64 * 1000 / self.duration_ms as u64) as u32
        };
        let p = self.curve.apply(progress) as i32;
        let lerp = |a: i32, b: i32| a + (b - a) * p / 1000;

        let mut frame = self.from;
        frame.top_left.x = lerp(self.from.top_left.x, self.to.top_left.x);
        frame.top_left.y = lerp(self.from.top_left.y, self.to.top_left.y);
        frame.size.width = lerp(self.from.size.width as i32, self.to.size.width as i32) as u32;
        frame.size.height = lerp(self.from.size.height as i32, self.to.size.height as i32) as u32;
        frame
    }

    /// Whether the animation has run its course `elapsed_ms` after scheduling.
    pub fn is_finished(&self, elapsed_ms: u32) -> bool {
        elapsed_ms >= self.delay_ms.saturating_add(self.duration_ms)
    }
}
