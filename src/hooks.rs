//! Photo-booth lifecycle hooks.
//!
//! [`BoothLights`] is what the host state machine talks to: one method per
//! state transition, or a [`BoothEvent`] through [`BoothLights::dispatch`].
//! Hooks never fail; sink errors are logged and the booth carries on.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use booth_strip::{PixelColor, PixelSinkExt, SharedSink};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::attract::{AttractSequencer, DEFAULT_STOP_TIMEOUT};
use crate::calibration::{self, MultiplierSource, ResolvedMultiplier};
use crate::cancel::CancelToken;
use crate::config::NeopixelConfig;
use crate::countdown;
use crate::sequence::AttractSequence;

/// How long the flash color shows before the capture light
pub const FLASH_HOLD: Duration = Duration::from_millis(120);

/// Choosing: solid red
pub const CHOOSE_COLOR: PixelColor = PixelColor::RED;

/// Preview: solid green under the countdown
pub const PREVIEW_COLOR: PixelColor = PixelColor::GREEN;

/// Capture: every channel at full
pub const CAPTURE_COLOR: PixelColor = PixelColor::FULL;

// ── Settings ─────────────────────────────────────────────────────────

/// Everything the hooks need, resolved once at startup
#[derive(Debug, Clone)]
pub struct LightsSettings {
    pub sequence: Arc<AttractSequence>,
    pub attract_speed: Duration,
    pub attract_default_duration: Duration,
    pub preview_delay: Duration,
    pub preview_countdown: bool,
    pub flash_color: PixelColor,
    pub multiplier: ResolvedMultiplier,
    pub stop_timeout: Duration,
}

impl LightsSettings {
    pub fn new(config: &NeopixelConfig, multiplier: ResolvedMultiplier) -> Self {
        Self {
            sequence: Arc::new(config.sequence()),
            attract_speed: config.attract_speed(),
            attract_default_duration: config.attract_default_duration(),
            preview_delay: config.preview_delay(),
            preview_countdown: config.preview_countdown,
            flash_color: config.flash_color(),
            multiplier,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }
}

impl Default for LightsSettings {
    fn default() -> Self {
        let config = NeopixelConfig::default();
        let multiplier = ResolvedMultiplier {
            value: config.neopixel_multiplier,
            source: MultiplierSource::Configured,
        };
        Self::new(&config, multiplier)
    }
}

// ── Events ───────────────────────────────────────────────────────────

/// Booth state transitions the lights react to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoothEvent {
    Startup,
    WaitEnter,
    WaitExit,
    ChooseEnter,
    PreviewEnter,
    PreviewExit,
    CaptureExit,
    Cleanup,
}

impl BoothEvent {
    pub const ALL: &'static [BoothEvent] = &[
        BoothEvent::Startup,
        BoothEvent::WaitEnter,
        BoothEvent::WaitExit,
        BoothEvent::ChooseEnter,
        BoothEvent::PreviewEnter,
        BoothEvent::PreviewExit,
        BoothEvent::CaptureExit,
        BoothEvent::Cleanup,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            BoothEvent::Startup => "startup",
            BoothEvent::WaitEnter => "wait-enter",
            BoothEvent::WaitExit => "wait-exit",
            BoothEvent::ChooseEnter => "choose-enter",
            BoothEvent::PreviewEnter => "preview-enter",
            BoothEvent::PreviewExit => "preview-exit",
            BoothEvent::CaptureExit => "capture-exit",
            BoothEvent::Cleanup => "cleanup",
        }
    }
}

/// Error for an event name that isn't recognised
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown booth event: \"{0}\"")]
pub struct UnknownEvent(pub String);

impl FromStr for BoothEvent {
    type Err = UnknownEvent;

    /// Accepts `wait-enter`, `wait_enter` and the hook-style `state_wait_enter`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        let name = normalized
            .strip_prefix("state-")
            .or_else(|| normalized.strip_prefix("pibooth-"))
            .unwrap_or(&normalized);
        BoothEvent::ALL
            .iter()
            .copied()
            .find(|e| e.as_str() == name)
            .ok_or_else(|| UnknownEvent(s.trim().to_string()))
    }
}

impl fmt::Display for BoothEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Hooks ────────────────────────────────────────────────────────────

struct OneShot {
    cancel: CancelToken,
    handle: JoinHandle<()>,
}

/// Lights context: the strip, the attract player and at most one countdown.
pub struct BoothLights {
    sink: SharedSink,
    attract: AttractSequencer,
    settings: LightsSettings,
    one_shot: Mutex<Option<OneShot>>,
}

impl BoothLights {
    pub fn new(sink: SharedSink, settings: LightsSettings) -> Self {
        Self {
            sink,
            attract: AttractSequencer::new(),
            settings,
            one_shot: Mutex::new(None),
        }
    }

    /// Build from config, resolving the countdown multiplier.
    ///
    /// A persisted calibration wins; otherwise the strip is measured if
    /// auto-calibration is on; otherwise the configured value is used.
    pub fn from_config(config: &NeopixelConfig, sink: SharedSink) -> Self {
        let bounds = config.bounds();
        let persisted = calibration::load(&config.calibration_path(), bounds);
        let target = config.preview_delay();
        let steps = config.neopixel_calibrate_steps.max(1);

        let multiplier = calibration::resolve_multiplier(
            persisted,
            config.neopixel_auto_calibrate,
            || {
                let mut strip = sink.lock();
                calibration::compute_multiplier(&mut *strip, target, steps, bounds)
            },
            bounds.clamp(config.neopixel_multiplier),
        );
        info!(
            "Countdown multiplier {:.3} ({:?})",
            multiplier.value, multiplier.source
        );

        Self::new(sink, LightsSettings::new(config, multiplier))
    }

    pub fn settings(&self) -> &LightsSettings {
        &self.settings
    }

    pub fn sink(&self) -> &SharedSink {
        &self.sink
    }

    pub fn attract(&self) -> &AttractSequencer {
        &self.attract
    }

    /// Run the hook for `event`
    pub fn dispatch(&self, event: BoothEvent) {
        debug!("Booth event: {}", event);
        match event {
            BoothEvent::Startup => self.startup(),
            BoothEvent::WaitEnter => self.wait_enter(),
            BoothEvent::WaitExit => self.wait_exit(),
            BoothEvent::ChooseEnter => self.choose_enter(),
            BoothEvent::PreviewEnter => self.preview_enter(),
            BoothEvent::PreviewExit => self.preview_exit(),
            BoothEvent::CaptureExit => self.capture_exit(),
            BoothEvent::Cleanup => self.cleanup(),
        }
    }

    pub fn startup(&self) {
        info!(
            "Booth lights up ({} attract entries, multiplier {:.3})",
            self.settings.sequence.len(),
            self.settings.multiplier.value
        );
        self.start_attract();
    }

    pub fn wait_enter(&self) {
        self.start_attract();
    }

    pub fn wait_exit(&self) {
        self.stop_attract();
    }

    pub fn choose_enter(&self) {
        self.stop_attract();
        self.cancel_one_shot();
        self.solid(CHOOSE_COLOR);
    }

    pub fn preview_enter(&self) {
        self.stop_attract();
        self.cancel_one_shot();
        self.solid(PREVIEW_COLOR);
        if self.settings.preview_countdown {
            self.spawn_countdown();
        }
    }

    pub fn preview_exit(&self) {
        self.stop_attract();
        self.cancel_one_shot();
        self.solid(self.settings.flash_color);
        thread::sleep(FLASH_HOLD);
        self.solid(CAPTURE_COLOR);
    }

    pub fn capture_exit(&self) {
        self.stop_attract();
        self.cancel_one_shot();
        self.solid(PixelColor::BLACK);
    }

    pub fn cleanup(&self) {
        self.stop_attract();
        self.cancel_one_shot();
        self.solid(PixelColor::BLACK);
    }

    /// True while a countdown worker is alive
    pub fn one_shot_running(&self) -> bool {
        self.one_shot
            .lock()
            .as_ref()
            .is_some_and(|o| !o.handle.is_finished())
    }

    /// Block until the current countdown (if any) has finished on its own.
    pub fn wait_one_shot(&self) {
        let one_shot = self.one_shot.lock().take();
        if let Some(one_shot) = one_shot {
            if one_shot.handle.join().is_err() {
                error!("Countdown worker panicked");
            }
        }
    }

    fn start_attract(&self) {
        self.attract.start(
            self.sink.clone(),
            self.settings.sequence.clone(),
            self.settings.attract_speed,
            self.settings.attract_default_duration,
        );
    }

    fn stop_attract(&self) {
        if let Err(e) = self.attract.stop(self.settings.stop_timeout) {
            error!("Failed to clear strip after attract: {}", e);
        }
    }

    fn solid(&self, color: PixelColor) {
        if let Err(e) = self.sink.lock().fill_and_show(color) {
            error!("Failed to show {}: {}", color, e);
        }
    }

    /// Cancel the running countdown and wait for its worker to exit.
    fn cancel_one_shot(&self) {
        let one_shot = self.one_shot.lock().take();
        if let Some(one_shot) = one_shot {
            one_shot.cancel.cancel();
            if one_shot.handle.join().is_err() {
                error!("Countdown worker panicked");
            }
        }
    }

    fn spawn_countdown(&self) {
        let mut slot = self.one_shot.lock();
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let sink = self.sink.clone();
        let total = self.settings.preview_delay;
        let multiplier = self.settings.multiplier.value;

        let spawned = thread::Builder::new()
            .name("countdown".to_string())
            .spawn(move || {
                match countdown::countdown(&sink, total, multiplier, &worker_cancel) {
                    Ok(report) => debug!(
                        "Countdown {} after {:?}",
                        if report.completed { "finished" } else { "cancelled" },
                        report.elapsed()
                    ),
                    Err(e) => error!("Countdown failed: {}", e),
                }
            });
        match spawned {
            Ok(handle) => *slot = Some(OneShot { cancel, handle }),
            Err(e) => error!("Failed to spawn countdown worker: {}", e),
        }
    }
}

impl Drop for BoothLights {
    fn drop(&mut self) {
        if let Some(one_shot) = self.one_shot.get_mut().as_ref() {
            one_shot.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use booth_strip::MemorySink;

    fn lights(len: usize) -> (Arc<Mutex<MemorySink>>, BoothLights) {
        let concrete = Arc::new(Mutex::new(MemorySink::new(len)));
        let sink: SharedSink = concrete.clone();
        let settings = LightsSettings {
            attract_speed: Duration::from_millis(1),
            preview_delay: Duration::from_millis(40),
            stop_timeout: Duration::from_millis(500),
            ..LightsSettings::default()
        };
        (concrete, BoothLights::new(sink, settings))
    }

    #[test]
    fn test_event_names() {
        for event in BoothEvent::ALL {
            assert_eq!(event.as_str().parse::<BoothEvent>().unwrap(), *event);
        }
        assert_eq!(
            "state_preview_exit".parse::<BoothEvent>().unwrap(),
            BoothEvent::PreviewExit
        );
        assert_eq!(
            " Wait_Enter ".parse::<BoothEvent>().unwrap(),
            BoothEvent::WaitEnter
        );
        assert_eq!(
            "dance".parse::<BoothEvent>().unwrap_err(),
            UnknownEvent("dance".to_string())
        );
    }

    #[test]
    fn test_choose_enter_is_solid_red() {
        let (strip, lights) = lights(6);
        lights.dispatch(BoothEvent::ChooseEnter);
        assert!(strip.lock().pixels().iter().all(|c| *c == CHOOSE_COLOR));
    }

    #[test]
    fn test_preview_exit_ends_full_white() {
        let (strip, lights) = lights(6);
        lights.preview_enter();
        lights.preview_exit();

        assert!(!lights.one_shot_running());
        assert!(strip.lock().pixels().iter().all(|c| *c == PixelColor::FULL));
    }

    #[test]
    fn test_preview_countdown_runs_to_completion() {
        let (strip, lights) = lights(4);
        lights.preview_enter();
        lights.wait_one_shot();

        let pixels = strip.lock().pixels();
        assert!(pixels.iter().all(|c| *c == countdown::CONSUMED_COLOR));
    }

    #[test]
    fn test_cleanup_leaves_strip_dark() {
        let (strip, lights) = lights(6);
        lights.startup();
        assert!(lights.attract().is_running());
        thread::sleep(Duration::from_millis(20));

        lights.cleanup();
        assert!(!lights.attract().is_running());
        assert!(strip.lock().pixels().iter().all(|c| c.is_off()));
    }
}
