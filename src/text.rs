//! Fixed-capacity text buffers for display fields.

use core::fmt::{self, Write};

use heapless::String;

/// A display string that never grows past `N` bytes.
///
/// Formatting into a full buffer drops the remaining characters instead of
/// failing, so a field can at worst be cut short.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TextBuffer<const N: usize> {
    buf: String<N>,
}

impl<const N: usize> TextBuffer<N> {
    pub const fn new() -> Self {
        Self { buf: String::new() }
    }

    /// Replace the contents with `text`, truncated to fit.
    pub fn set(&mut self, text: &str) {
        self.buf.clear();
        self.push_truncated(text);
    }

    /// Replace the contents with formatted output, truncated to fit.
    pub fn format(&mut self, args: fmt::Arguments<'_>) {
        self.buf.clear();
        // `write_str` below never reports an error
        let _ = self.write_fmt(args);
    }

    pub fn as_str(&self) -> &str {
        self.buf.as_str()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    fn push_truncated(&mut self, text: &str) {
        for c in text.chars() {
            if self.buf.push(c).is_err() {
                break;
            }
        }
    }
}

impl<const N: usize> Write for TextBuffer<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_truncated(s);
        Ok(())
    }
}

impl<const N: usize> fmt::Debug for TextBuffer<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl<const N: usize> fmt::Display for TextBuffer<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "defmt")]
impl<const N: usize> defmt::Format for TextBuffer<N> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str}", self.as_str())
    }
}
