//! Terminal preview sink using crossterm.
//!
//! Draws the strip as one row of true-color blocks, redrawn in place on every
//! flush. Handy for trying sequences and countdown timing without hardware.

use std::io::{self, Write};

use booth_strip::{PixelColor, PixelSink, SinkError};
use crossterm::{
    cursor,
    style::{self, Color, Stylize},
    terminal, QueueableCommand,
};

/// Characters per pixel
const CELL: &str = "██";

/// Screen color for a pixel. The white channel is blended into RGB.
fn screen_color(c: PixelColor) -> Color {
    Color::Rgb {
        r: c.r.saturating_add(c.w),
        g: c.g.saturating_add(c.w),
        b: c.b.saturating_add(c.w),
    }
}

fn io_error(source: io::Error) -> SinkError {
    SinkError::Io {
        device: "terminal".to_string(),
        source,
    }
}

/// Sink that renders to a terminal
pub struct TerminalSink {
    pixels: Vec<PixelColor>,
    out: Box<dyn Write + Send>,
    auto_flush: bool,
    frames: u64,
}

impl TerminalSink {
    /// Preview `len` pixels on stdout
    pub fn stdout(len: usize) -> Self {
        Self::with_writer(len, Box::new(io::stdout()))
    }

    pub fn with_writer(len: usize, out: Box<dyn Write + Send>) -> Self {
        Self {
            pixels: vec![PixelColor::BLACK; len],
            out,
            auto_flush: false,
            frames: 0,
        }
    }

    #[must_use]
    pub fn with_auto_flush(mut self, auto_flush: bool) -> Self {
        self.auto_flush = auto_flush;
        self
    }

    fn draw(&mut self) -> io::Result<()> {
        self.frames += 1;
        self.out
            .queue(cursor::MoveToColumn(0))?
            .queue(terminal::Clear(terminal::ClearType::CurrentLine))?;
        for &pixel in &self.pixels {
            self.out
                .queue(style::PrintStyledContent(CELL.with(screen_color(pixel))))?;
        }
        self.out
            .queue(style::ResetColor)?
            .queue(style::Print(format!(" {:>6}", self.frames)))?;
        self.out.flush()
    }
}

impl PixelSink for TerminalSink {
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
        if self.auto_flush {
            self.draw().map_err(io_error)?;
        }
        Ok(())
    }

    fn fill(&mut self, color: PixelColor) -> Result<(), SinkError> {
        self.pixels.fill(color);
        if self.auto_flush {
            self.draw().map_err(io_error)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.draw().map_err(io_error)
    }

    fn auto_flush(&self) -> bool {
        self.auto_flush
    }
}

impl Drop for TerminalSink {
    fn drop(&mut self) {
        // Leave the cursor on a fresh line
        let _ = self
            .out
            .queue(style::ResetColor)
            .and_then(|out| out.queue(style::Print("\n")))
            .map(|_| ());
        let _ = self.out.flush();
    }
}
