//! NeoPixel strip feedback for photo-booth state machines.
//!
//! The host application reports its state transitions to [`BoothLights`];
//! the lights answer with an idle attract animation, solid state colors, and a
//! pixel countdown whose length is calibrated against the real cost of
//! writing to the strip.
//!
//! The strip itself is anything implementing [`booth_strip::PixelSink`]:
//! SPI hardware, the in-memory recorder used by tests, or the terminal
//! preview in [`preview`].

pub mod attract;
pub mod calibration;
pub mod cancel;
pub mod config;
pub mod countdown;
pub mod hooks;
pub mod pattern;
pub mod preview;
pub mod sequence;

pub use attract::AttractSequencer;
pub use calibration::{CalibrationError, MultiplierBounds, ResolvedMultiplier};
pub use cancel::CancelToken;
pub use config::LightsConfig;
pub use hooks::{BoothEvent, BoothLights, LightsSettings};
pub use pattern::{Pattern, PatternId};
pub use sequence::{AttractSequence, SequenceEntry};
