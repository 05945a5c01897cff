//! Pixel sink abstraction for addressable NeoPixel strips
//!
//! This crate provides a unified interface for writing colors to a strip,
//! regardless of what actually renders them:
//!
//! - SPI (WS2812/SK6812 bit-banged through a Linux `spidev` node)
//! - Memory (recording sink for tests and dry runs)
//!
//! Callers outside this crate can add their own backends (the terminal
//! preview in `booth_lights` is one) by implementing [`PixelSink`].

pub mod color;
pub mod error;
pub mod memory;
pub mod order;
pub mod spi;

pub use color::PixelColor;
pub use error::SinkError;
pub use memory::{MemorySink, SinkEvent};
pub use order::PixelOrder;
pub use spi::{SpiConfig, SpiSink};

use parking_lot::Mutex;
use std::sync::Arc;

/// The core sink trait - all backends implement this
///
/// A sink is an addressable array of RGBW cells plus an explicit flush that
/// pushes the buffered colors to the hardware. Writes are cheap buffer
/// updates unless [`auto_flush`](PixelSink::auto_flush) is set, in which case
/// every write renders immediately.
pub trait PixelSink: Send {
    /// Number of addressable pixels
    fn len(&self) -> usize;

    /// True if the strip has no pixels
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read back the buffered color at `index`
    fn pixel(&self, index: usize) -> Option<PixelColor>;

    /// Buffer a color for a single pixel
    fn set_pixel(&mut self, index: usize, color: PixelColor) -> Result<(), SinkError>;

    /// Buffer the same color for every pixel
    fn fill(&mut self, color: PixelColor) -> Result<(), SinkError>;

    /// Render the buffered colors
    fn flush(&mut self) -> Result<(), SinkError>;

    /// True if every write is rendered without an explicit flush
    fn auto_flush(&self) -> bool;
}

/// Convenience helpers available on every sink
pub trait PixelSinkExt: PixelSink {
    /// Flush unless the sink already renders on every write
    fn show(&mut self) -> Result<(), SinkError> {
        if self.auto_flush() {
            Ok(())
        } else {
            self.flush()
        }
    }

    /// Write a whole frame and show it
    ///
    /// Extra colors beyond the strip length are ignored; missing ones leave
    /// the tail of the strip untouched.
    fn write_frame(&mut self, frame: &[PixelColor]) -> Result<(), SinkError> {
        for (index, color) in frame.iter().take(self.len()).enumerate() {
            self.set_pixel(index, *color)?;
        }
        self.show()
    }

    /// Fill with a solid color and show it
    fn fill_and_show(&mut self, color: PixelColor) -> Result<(), SinkError> {
        self.fill(color)?;
        self.show()
    }

    /// Turn every pixel off
    fn clear(&mut self) -> Result<(), SinkError> {
        self.fill_and_show(PixelColor::BLACK)
    }
}

impl<T: PixelSink + ?Sized> PixelSinkExt for T {}

/// Type alias for a sink shared between the foreground and worker threads
pub type SharedSink = Arc<Mutex<dyn PixelSink>>;

/// Wrap a concrete sink for sharing
pub fn shared<S: PixelSink + 'static>(sink: S) -> SharedSink {
    Arc::new(Mutex::new(sink))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_skips_flush_when_auto_flushing() {
        let mut sink = MemorySink::new(3).with_auto_flush(true);
        sink.set_pixel(0, PixelColor::RED).unwrap();
        sink.show().unwrap();
        assert_eq!(sink.flush_count(), 0);

        let mut sink = MemorySink::new(3);
        sink.show().unwrap();
        assert_eq!(sink.flush_count(), 1);
    }

    #[test]
    fn test_write_frame_truncates_to_strip() {
        let mut sink = MemorySink::new(2);
        let frame = [PixelColor::RED, PixelColor::GREEN, PixelColor::BLUE];
        sink.write_frame(&frame).unwrap();
        assert_eq!(sink.pixels(), vec![PixelColor::RED, PixelColor::GREEN]);
        assert_eq!(sink.flush_count(), 1);
    }

    #[test]
    fn test_clear_turns_everything_off() {
        let mut sink = MemorySink::new(4);
        sink.fill(PixelColor::WHITE).unwrap();
        sink.clear().unwrap();
        assert!(sink.pixels().iter().all(|c| *c == PixelColor::BLACK));
    }

    #[test]
    fn test_shared_sink_coerces() {
        let concrete = Arc::new(Mutex::new(MemorySink::new(5)));
        let sink: SharedSink = concrete.clone();
        sink.lock().fill_and_show(PixelColor::BLUE).unwrap();
        assert_eq!(concrete.lock().pixel(4), Some(PixelColor::BLUE));
    }
}
