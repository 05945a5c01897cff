//! In-memory recording sink.
//!
//! Keeps the pixel buffer in memory and logs every write with a timestamp,
//! so tests can assert on what a pattern or countdown actually did and when.
//! Also handy as a dry-run backend on machines without a strip attached.

use std::time::{Duration, Instant};

use crate::{PixelColor, PixelSink, SinkError};

/// One recorded sink operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Set {
        index: usize,
        color: PixelColor,
        at: Instant,
    },
    Fill {
        color: PixelColor,
        at: Instant,
    },
    Flush {
        at: Instant,
    },
}

impl SinkEvent {
    pub fn at(&self) -> Instant {
        match self {
            SinkEvent::Set { at, .. } | SinkEvent::Fill { at, .. } | SinkEvent::Flush { at } => {
                *at
            }
        }
    }
}

/// Recording sink backed by a `Vec`
#[derive(Debug)]
pub struct MemorySink {
    pixels: Vec<PixelColor>,
    events: Vec<SinkEvent>,
    flushes: usize,
    auto_flush: bool,
    flush_latency: Option<Duration>,
    failing_flushes: usize,
}

impl MemorySink {
    pub fn new(len: usize) -> Self {
        Self {
            pixels: vec![PixelColor::BLACK; len],
            events: Vec::new(),
            flushes: 0,
            auto_flush: false,
            flush_latency: None,
            failing_flushes: 0,
        }
    }

    /// Render on every write instead of on explicit flush
    #[must_use]
    pub fn with_auto_flush(mut self, auto_flush: bool) -> Self {
        self.auto_flush = auto_flush;
        self
    }

    /// Block for `latency` on every flush, like a slow bus would
    #[must_use]
    pub fn with_flush_latency(mut self, latency: Duration) -> Self {
        self.flush_latency = Some(latency);
        self
    }

    /// Make the next `count` flushes fail
    pub fn fail_next_flushes(&mut self, count: usize) {
        self.failing_flushes = count;
    }

    pub fn events(&self) -> &[SinkEvent] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    pub fn pixels(&self) -> Vec<PixelColor> {
        self.pixels.clone()
    }

    /// Number of successful flushes so far
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    /// Only the `Set` events, as `(index, color)` pairs
    pub fn set_writes(&self) -> Vec<(usize, PixelColor)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Set { index, color, .. } => Some((*index, *color)),
                _ => None,
            })
            .collect()
    }

    fn render(&mut self) -> Result<(), SinkError> {
        if self.failing_flushes > 0 {
            self.failing_flushes -= 1;
            return Err(SinkError::Injected("flush failed".to_string()));
        }
        if let Some(latency) = self.flush_latency {
            std::thread::sleep(latency);
        }
        self.flushes += 1;
        self.events.push(SinkEvent::Flush { at: Instant::now() });
        Ok(())
    }
}

impl PixelSink for MemorySink {
    fn len(&self) -> usize {
        self.pixels.len()
    }

    fn pixel(&self, index: usize) -> Option<PixelColor> {
        self.pixels.get(index).copied()
    }

    fn set_pixel(&mut self, index: usize, color: PixelColor) -> Result<(), SinkError> {
        let len = self.pixels.len();
        let slot = self
            .pixels
            .get_mut(index)
            .ok_or(SinkError::IndexOutOfRange { index, len })?;
        *slot = color;
        self.events.push(SinkEvent::Set {
            index,
            color,
            at: Instant::now(),
        });
        if self.auto_flush {
            self.render()?;
        }
        Ok(())
    }

    fn fill(&mut self, color: PixelColor) -> Result<(), SinkError> {
        self.pixels.fill(color);
        self.events.push(SinkEvent::Fill {
            color,
            at: Instant::now(),
        });
        if self.auto_flush {
            self.render()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.render()
    }

    fn auto_flush(&self) -> bool {
        self.auto_flush
    }
}
