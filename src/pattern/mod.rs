//! Pattern library.
//!
//! A pattern is a finite list of frames. [`play_pass`] drives one pass of a
//! pattern onto a sink at a fixed step delay, re-checking the cancel token
//! before every frame and sleeping on it between frames, so a stop request
//! is honoured within one step.
//!
//! Frames render into a buffer seeded from the strip's current contents.
//! Patterns that only touch some pixels (`color_wipe`, `theater_chase`)
//! therefore draw over whatever was showing before, like they would on the
//! bare hardware.

mod chase;
mod comet;
mod fire;
mod gradient;
mod pulse;
mod rainbow;
mod sparkle;
mod wipe;

pub use chase::{ChaseMulti, TheaterChase};
pub use comet::Comet;
pub use fire::Fire;
pub use gradient::{Gradient, Ocean};
pub use pulse::Pulse;
pub use rainbow::Rainbow;
pub use sparkle::Sparkle;
pub use wipe::ColorWipe;

use std::fmt;
use std::time::Duration;

use booth_strip::{PixelColor, PixelSinkExt, SharedSink, SinkError};

use crate::cancel::CancelToken;

/// A finite, frame-addressed animation.
pub trait Pattern: Send {
    /// Number of frames in one pass over a strip of `len` pixels
    fn frames(&self, len: usize) -> usize;

    /// Draw frame `frame` into `leds`
    fn render(&mut self, frame: usize, leds: &mut [PixelColor]);
}

// ── Registry ─────────────────────────────────────────────────────────

/// Every pattern the attract player knows by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternId {
    Rainbow,
    ColorWipe,
    TheaterChase,
    Pulse,
    Comet,
    Sparkle,
    Gradient,
    ChaseMulti,
    Fire,
    Ocean,
}

impl PatternId {
    pub const ALL: &'static [PatternId] = &[
        PatternId::Rainbow,
        PatternId::ColorWipe,
        PatternId::TheaterChase,
        PatternId::Pulse,
        PatternId::Comet,
        PatternId::Sparkle,
        PatternId::Gradient,
        PatternId::ChaseMulti,
        PatternId::Fire,
        PatternId::Ocean,
    ];

    /// Pattern used for empty sequences and unknown names
    pub const FALLBACK: PatternId = PatternId::Rainbow;

    pub const fn as_str(self) -> &'static str {
        match self {
            PatternId::Rainbow => "rainbow",
            PatternId::ColorWipe => "color_wipe",
            PatternId::TheaterChase => "theater_chase",
            PatternId::Pulse => "pulse",
            PatternId::Comet => "comet",
            PatternId::Sparkle => "sparkle",
            PatternId::Gradient => "gradient",
            PatternId::ChaseMulti => "chase_multi",
            PatternId::Fire => "fire",
            PatternId::Ocean => "ocean",
        }
    }

    /// Look up a pattern by its exact registry name.
    pub fn parse_from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.as_str() == s)
    }

    /// Short human description, shown by `booth-lights patterns`.
    pub const fn describe(self) -> &'static str {
        match self {
            PatternId::Rainbow => "color wheel scrolling along the strip",
            PatternId::ColorWipe => "fill pixels one by one (default red)",
            PatternId::TheaterChase => "every third pixel marching (default grey)",
            PatternId::Pulse => "whole strip breathing (default blue)",
            PatternId::Comet => "bright head with a fading tail (default white)",
            PatternId::Sparkle => "random twinkles (default white)",
            PatternId::Gradient => "slowly rotating hue gradient",
            PatternId::ChaseMulti => "color bands chasing (color, green, blue)",
            PatternId::Fire => "flickering embers",
            PatternId::Ocean => "gently waving blues",
        }
    }

    /// Build the pattern, using its default color when `color` is `None`.
    pub fn build(self, color: Option<PixelColor>, step_delay: Duration) -> Box<dyn Pattern> {
        match self {
            PatternId::Rainbow => Box::new(Rainbow),
            PatternId::ColorWipe => Box::new(ColorWipe::new(color.unwrap_or(PixelColor::RED))),
            PatternId::TheaterChase => Box::new(TheaterChase::new(
                color.unwrap_or(PixelColor::rgb(127, 127, 127)),
                8,
            )),
            PatternId::Pulse => Box::new(Pulse::new(color.unwrap_or(PixelColor::BLUE), 30)),
            PatternId::Comet => Box::new(Comet::new(color.unwrap_or(PixelColor::WHITE), 8)),
            PatternId::Sparkle => Box::new(Sparkle::new(
                color.unwrap_or(PixelColor::WHITE),
                0.06,
                Duration::from_millis(1500),
                step_delay,
            )),
            PatternId::Gradient => Box::new(Gradient::new(
                color.unwrap_or(PixelColor::rgb(0, 128, 255)),
                step_delay,
            )),
            PatternId::ChaseMulti => Box::new(ChaseMulti::new(
                vec![
                    color.unwrap_or(PixelColor::RED),
                    PixelColor::GREEN,
                    PixelColor::BLUE,
                ],
                2,
                4,
            )),
            PatternId::Fire => Box::new(Fire::new(0.96, 0.04)),
            PatternId::Ocean => Box::new(Ocean),
        }
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Playback ─────────────────────────────────────────────────────────

/// How a single pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Completed,
    Cancelled,
}

/// Play one pass of `pattern` onto `sink`.
///
/// The sink lock is held only while a frame is written. Cancellation is
/// checked again under the lock, so once `cancel` is set and the caller has
/// cleared the strip, no stale frame can land on top of it.
pub fn play_pass(
    pattern: &mut dyn Pattern,
    sink: &SharedSink,
    cancel: &CancelToken,
    step_delay: Duration,
) -> Result<PassOutcome, SinkError> {
    let mut leds: Vec<PixelColor> = {
        let sink = sink.lock();
        (0..sink.len())
            .map(|i| sink.pixel(i).unwrap_or_default())
            .collect()
    };

    for frame in 0..pattern.frames(leds.len()) {
        if cancel.is_cancelled() {
            return Ok(PassOutcome::Cancelled);
        }
        pattern.render(frame, &mut leds);
        {
            let mut sink = sink.lock();
            if cancel.is_cancelled() {
                return Ok(PassOutcome::Cancelled);
            }
            sink.write_frame(&leds)?;
        }
        if cancel.sleep(step_delay) {
            return Ok(PassOutcome::Cancelled);
        }
    }
    Ok(PassOutcome::Completed)
}

/// HSV with hue as a 0-1 fraction, the way the color math below is written.
pub(crate) fn hsv_unit(h: f64, s: f64, v: f64) -> PixelColor {
    PixelColor::from_hsv((h.rem_euclid(1.0) * 360.0) as f32, s as f32, v as f32)
}
