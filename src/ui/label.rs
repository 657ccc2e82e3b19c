//! Text layer paired with the buffer it displays.

use core::fmt;

use crate::{
    platform::{Compositor, LayerId},
    text::TextBuffer,
    Error,
};

/// A text layer and its backing buffer of at most `N` bytes.
pub struct Label<const N: usize> {
    layer: LayerId,
    text: TextBuffer<N>,
}

impl<const N: usize> Label<N> {
    /// Create new label
    pub fn new(layer: LayerId) -> Self {
        Self {
            layer,
            text: TextBuffer::new(),
        }
    }

    pub fn layer(&self) -> LayerId {
        self.layer
    }

    pub fn text(&self) -> &str {
        self.text.as_str()
    }

    /// Mutable access to the buffer, to be followed by [`Label::push`].
    pub fn buffer(&mut self) -> &mut TextBuffer<N> {
        &mut self.text
    }

    /// Format into the buffer and show it.
    pub fn show<C: Compositor>(
        &mut self,
        compositor: &mut C,
        args: fmt::Arguments<'_>,
    ) -> Result<(), Error> {
        self.text.format(args);
        self.push(compositor)
    }

    /// Show the current buffer contents on the layer.
    pub fn push<C: Compositor>(&self, compositor: &mut C) -> Result<(), Error> {
        compositor.set_text(self.layer, self.text.as_str())
    }
}
