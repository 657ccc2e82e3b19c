//! Retained layer tree drawn onto the LCD
//!
//! Holds the layers, fonts and running animations the watchface creates
//! through [`Compositor`] and paints them in insertion order.

use embassy_time::Instant;
use embedded_graphics::{
    mono_font::{MonoFont, MonoTextStyleBuilder},
    pixelcolor::Rgb565,
    prelude::*,
    primitives::{Line, Polyline, PrimitiveStyle, Rectangle},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};
use heapless::{String, Vec};
use profont::{PROFONT_12_POINT, PROFONT_18_POINT, PROFONT_24_POINT};

use pulse_watchface::{
    config::BACKGROUND_FRAME,
    platform::{
        AnimationId, Bitmap, Color, CompositingMode, Compositor, FontId, FontSize, LayerId,
        PropertyAnimation, ResourceId, TextAlignment, TextStyle,
    },
    Error,
};

const MAX_LAYERS: usize = 10;
const MAX_FONTS: usize = 4;
const MAX_ANIMATIONS: usize = 2;
const TEXT_LEN: usize = 32;

const ROOT: LayerId = LayerId(0);

/// Heartbeat trace along the bottom of the background
const HEARTBEAT: [Point; 8] = [
    Point::new(0, 152),
    Point::new(44, 152),
    Point::new(52, 140),
    Point::new(60, 164),
    Point::new(68, 146),
    Point::new(74, 152),
    Point::new(100, 152),
    Point::new(144, 152),
];

/// Bluetooth rune, relative to the icon frame
const BLUETOOTH_RUNE: [Point; 6] = [
    Point::new(10, 10),
    Point::new(22, 22),
    Point::new(16, 28),
    Point::new(16, 4),
    Point::new(22, 10),
    Point::new(10, 22),
];

enum Content {
    Bitmap {
        bitmap: Bitmap,
        mode: CompositingMode,
    },
    Text {
        style: TextStyle,
        text: String<TEXT_LEN>,
    },
}

struct Layer {
    id: LayerId,
    frame: Rectangle,
    hidden: bool,
    content: Content,
}

struct RunningAnimation {
    id: AnimationId,
    animation: PropertyAnimation,
    started: Instant,
}

pub struct LayerStack {
    layers: Vec<Layer, MAX_LAYERS>,
    /// Children of the root layer, bottom first
    order: Vec<LayerId, MAX_LAYERS>,
    fonts: Vec<(FontId, FontSize), MAX_FONTS>,
    animations: Vec<RunningAnimation, MAX_ANIMATIONS>,
    /// Animations that stopped since the last call to `take_stopped`
    stopped: Vec<(AnimationId, bool), { MAX_ANIMATIONS * 2 }>,
    next_id: u16,
    dirty: bool,
}

impl LayerStack {
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            order: Vec::new(),
            fonts: Vec::new(),
            animations: Vec::new(),
            stopped: Vec::new(),
            next_id: ROOT.0 + 1,
            dirty: true,
        }
    }

    fn allocate_id(&mut self) -> u16 {
        let id = self.next_id;
        // Skip the root id on wrap-around
        self.next_id = self.next_id.wrapping_add(1).max(ROOT.0 + 1);
        id
    }

    fn insert(&mut self, frame: Rectangle, content: Content) -> Result<LayerId, Error> {
        let id = LayerId(self.allocate_id());
        self.layers
            .push(Layer {
                id,
                frame,
                hidden: false,
                content,
            })
            .map_err(|_| Error::OutOfResources)?;
        Ok(id)
    }

    fn layer_mut(&mut self, id: LayerId) -> Result<&mut Layer, Error> {
        self.layers
            .iter_mut()
            .find(|layer| layer.id == id)
            .ok_or(Error::NoSuchLayer)
    }

    fn font_size(&self, font: FontId) -> Option<FontSize> {
        self.fonts
            .iter()
            .find(|(id, _)| *id == font)
            .map(|(_, size)| *size)
    }

    fn stop(&mut self, index: usize, finished: bool) {
        let running = self.animations.swap_remove(index);
        if self.stopped.push((running.id, finished)).is_err() {
            defmt::warn!("Dropping stop report for animation {}", running.id);
        }
    }

    /// Advance running animations to `now`.
    pub fn step(&mut self, now: Instant) {
        let mut index = 0;
        while index < self.animations.len() {
            let running = &self.animations[index];
            let elapsed = now
                .checked_duration_since(running.started)
                .map(|elapsed| elapsed.as_millis().min(u32::MAX as u64) as u32)
                .unwrap_or(0);
            let frame = running.animation.frame_at(elapsed);
            let finished = running.animation.is_finished(elapsed);
            let layer = running.animation.layer;

            if let Ok(layer) = self.layer_mut(layer) {
                layer.frame = frame;
            }
            self.dirty = true;

            if finished {
                self.stop(index, true);
            } else {
                index += 1;
            }
        }
    }

    /// Animations stopped since the last call, with whether each ran to completion.
    pub fn take_stopped(&mut self) -> Vec<(AnimationId, bool), { MAX_ANIMATIONS * 2 }> {
        core::mem::take(&mut self.stopped)
    }

    /// Paint every visible layer if anything changed since the last draw.
    pub fn draw<D>(&mut self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        if !self.dirty {
            return Ok(());
        }

        BACKGROUND_FRAME
            .into_styled(PrimitiveStyle::with_fill(Rgb565::WHITE))
            .draw(target)?;

        for id in &self.order {
            let Some(layer) = self.layers.iter().find(|layer| layer.id == *id) else {
                continue;
            };
            if layer.hidden {
                continue;
            }

            match &layer.content {
                Content::Bitmap { bitmap, mode } => {
                    draw_bitmap(target, layer.frame, *bitmap, *mode)?
                }
                Content::Text { style, text } => {
                    if let Some(size) = self.font_size(style.font) {
                        draw_text(target, layer.frame, style, font(size), text)?;
                    }
                }
            }
        }

        self.dirty = false;
        Ok(())
    }
}

impl Compositor for LayerStack {
    fn root_layer(&self) -> LayerId {
        ROOT
    }

    fn create_bitmap_layer(
        &mut self,
        frame: Rectangle,
        bitmap: Bitmap,
        mode: CompositingMode,
    ) -> Result<LayerId, Error> {
        self.insert(frame, Content::Bitmap { bitmap, mode })
    }

    fn create_text_layer(&mut self, frame: Rectangle, style: TextStyle) -> Result<LayerId, Error> {
        if self.font_size(style.font).is_none() {
            return Err(Error::NoSuchFont);
        }
        self.insert(
            frame,
            Content::Text {
                style,
                text: String::new(),
            },
        )
    }

    fn add_child(&mut self, parent: LayerId, child: LayerId) -> Result<(), Error> {
        // Layers only nest one level deep
        if parent != ROOT || self.order.contains(&child) {
            return Err(Error::NoSuchLayer);
        }
        self.layer_mut(child)?;
        self.order.push(child).map_err(|_| Error::OutOfResources)?;
        self.dirty = true;
        Ok(())
    }

    fn set_hidden(&mut self, layer: LayerId, hidden: bool) -> Result<(), Error> {
        let layer = self.layer_mut(layer)?;
        if layer.hidden != hidden {
            layer.hidden = hidden;
            self.dirty = true;
        }
        Ok(())
    }

    fn set_text(&mut self, layer: LayerId, text: &str) -> Result<(), Error> {
        let layer = self.layer_mut(layer)?;
        let Content::Text { text: shown, .. } = &mut layer.content else {
            return Err(Error::NoSuchLayer);
        };
        shown.clear();
        for c in text.chars() {
            if shown.push(c).is_err() {
                break;
            }
        }
        self.dirty = true;
        Ok(())
    }

    fn destroy_layer(&mut self, layer: LayerId) -> Result<(), Error> {
        let index = self
            .layers
            .iter()
            .position(|l| l.id == layer)
            .ok_or(Error::NoSuchLayer)?;
        self.layers.swap_remove(index);
        self.order.retain(|id| *id != layer);

        while let Some(index) = self
            .animations
            .iter()
            .position(|running| running.animation.layer == layer)
        {
            self.stop(index, false);
        }

        self.dirty = true;
        Ok(())
    }

    fn load_font(&mut self, size: FontSize) -> Result<FontId, Error> {
        let id = FontId(self.allocate_id());
        self.fonts
            .push((id, size))
            .map_err(|_| Error::OutOfResources)?;
        Ok(id)
    }

    fn unload_font(&mut self, font: FontId) -> Result<(), Error> {
        let index = self
            .fonts
            .iter()
            .position(|(id, _)| *id == font)
            .ok_or(Error::NoSuchFont)?;
        self.fonts.swap_remove(index);
        Ok(())
    }

    fn schedule_animation(&mut self, animation: PropertyAnimation) -> Result<AnimationId, Error> {
        let from = animation.from;
        self.layer_mut(animation.layer)?.frame = from;

        let id = AnimationId(self.allocate_id());
        self.animations
            .push(RunningAnimation {
                id,
                animation,
                started: Instant::now(),
            })
            .map_err(|_| Error::OutOfResources)?;
        self.dirty = true;
        Ok(id)
    }

    fn unschedule_animation(&mut self, id: AnimationId) -> Result<(), Error> {
        let index = self
            .animations
            .iter()
            .position(|running| running.id == id)
            .ok_or(Error::NoSuchAnimation)?;
        self.stop(index, false);
        Ok(())
    }
}

fn font(size: FontSize) -> &'static MonoFont<'static> {
    match size {
        FontSize::Small => &PROFONT_12_POINT,
        FontSize::Medium => &PROFONT_18_POINT,
        FontSize::Large => &PROFONT_24_POINT,
    }
}

fn rgb(color: Color) -> Option<Rgb565> {
    match color {
        Color::Clear => None,
        Color::Black => Some(Rgb565::BLACK),
        Color::White => Some(Rgb565::WHITE),
    }
}

fn draw_bitmap<D>(
    target: &mut D,
    frame: Rectangle,
    bitmap: Bitmap,
    mode: CompositingMode,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let stroke = PrimitiveStyle::with_stroke(Rgb565::BLACK, 2);
    let mut target = target.clipped(&frame);

    match bitmap {
        Bitmap::Resource(ResourceId::Background) => {
            if mode == CompositingMode::Assign {
                frame
                    .into_styled(PrimitiveStyle::with_fill(Rgb565::WHITE))
                    .draw(&mut target)?;
            }
            Polyline::new(&HEARTBEAT)
                .translate(frame.top_left)
                .into_styled(stroke)
                .draw(&mut target)?;
        }
        Bitmap::Resource(ResourceId::BluetoothOff) => {
            if mode == CompositingMode::Assign {
                frame
                    .into_styled(PrimitiveStyle::with_fill(Rgb565::WHITE))
                    .draw(&mut target)?;
            }
            Polyline::new(&BLUETOOTH_RUNE)
                .translate(frame.top_left)
                .into_styled(stroke)
                .draw(&mut target)?;
            Line::new(Point::new(4, 4), Point::new(28, 28))
                .translate(frame.top_left)
                .into_styled(stroke)
                .draw(&mut target)?;
        }
        // Blank pixels are transparent unless copied verbatim
        Bitmap::Blank(size) => {
            if mode == CompositingMode::Assign {
                Rectangle::new(frame.top_left, size)
                    .into_styled(PrimitiveStyle::with_fill(Rgb565::BLACK))
                    .draw(&mut target)?;
            }
        }
    }
    Ok(())
}

fn draw_text<D>(
    target: &mut D,
    frame: Rectangle,
    style: &TextStyle,
    font: &'static MonoFont<'static>,
    text: &str,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let mut character_style = MonoTextStyleBuilder::new().font(font);
    if let Some(color) = rgb(style.foreground) {
        character_style = character_style.text_color(color);
    }
    if let Some(color) = rgb(style.background) {
        character_style = character_style.background_color(color);
    }

    let (alignment, x) = match style.alignment {
        TextAlignment::Left => (Alignment::Left, frame.top_left.x),
        TextAlignment::Center => (Alignment::Center, frame.center().x),
        TextAlignment::Right => (
            Alignment::Right,
            frame.top_left.x + frame.size.width as i32 - 1,
        ),
    };
    let text_style = TextStyleBuilder::new()
        .alignment(alignment)
        .baseline(Baseline::Top)
        .build();

    Text::with_text_style(
        text,
        Point::new(x, frame.top_left.y),
        character_style.build(),
        text_style,
    )
    .draw(&mut target.clipped(&frame))?;
    Ok(())
}
