//! Pixel countdown: the strip drains (or fills) one pixel per step so the
//! whole run lasts about as long as the on-screen countdown.

use std::time::{Duration, Instant};

use booth_strip::{PixelColor, PixelSinkExt, SharedSink, SinkError};
use tracing::debug;

use crate::calibration::FALLBACK_MULTIPLIER;
use crate::cancel::CancelToken;

/// Color of a pixel that still has time left
pub const FULL_COLOR: PixelColor = PixelColor::RED;

/// Color of a pixel whose time is used up
pub const CONSUMED_COLOR: PixelColor = PixelColor::WARM_WHITE;

/// What happened during a countdown
#[derive(Debug, Clone)]
pub struct CountdownReport {
    pub per_pixel_delay: Duration,
    /// When each pixel was shown, in step order
    pub step_times: Vec<Instant>,
    pub completed: bool,
    pub started: Instant,
    pub finished: Instant,
}

impl CountdownReport {
    /// Wall-clock time from start to finish
    pub fn elapsed(&self) -> Duration {
        self.finished.duration_since(self.started)
    }
}

/// Sleep between steps for a run of `total` over `pixels`.
pub fn per_pixel_delay(total: Duration, pixels: usize, multiplier: f64) -> Duration {
    let multiplier = if multiplier.is_finite() {
        multiplier.max(0.0001)
    } else {
        FALLBACK_MULTIPLIER
    };
    let raw = total.as_secs_f64() / pixels.max(1) as f64;
    Duration::try_from_secs_f64(raw * multiplier).unwrap_or(Duration::ZERO)
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    /// Last pixel first
    Down,
    /// First pixel first
    Up,
}

fn run(
    sink: &SharedSink,
    total: Duration,
    multiplier: f64,
    cancel: &CancelToken,
    direction: Direction,
) -> Result<CountdownReport, SinkError> {
    let started = Instant::now();
    let pixels = sink.lock().len();
    let delay = per_pixel_delay(total, pixels, multiplier);
    let mut step_times = Vec::with_capacity(pixels);

    let finish = |step_times, completed| CountdownReport {
        per_pixel_delay: delay,
        step_times,
        completed,
        started,
        finished: Instant::now(),
    };

    if cancel.is_cancelled() {
        return Ok(finish(step_times, false));
    }
    debug!(
        "Countdown {:?} over {} pixels ({:?} per pixel)",
        direction, pixels, delay
    );
    sink.lock().fill_and_show(FULL_COLOR)?;

    for step in 0..pixels {
        let index = match direction {
            Direction::Down => pixels - 1 - step,
            Direction::Up => step,
        };
        {
            let mut sink = sink.lock();
            if cancel.is_cancelled() {
                drop(sink);
                return Ok(finish(step_times, false));
            }
            sink.set_pixel(index, CONSUMED_COLOR)?;
            sink.show()?;
        }
        step_times.push(Instant::now());
        if cancel.sleep(delay) {
            return Ok(finish(step_times, false));
        }
    }
    Ok(finish(step_times, true))
}

/// Fill the strip, then consume pixels from the far end back to index 0.
pub fn countdown(
    sink: &SharedSink,
    total: Duration,
    multiplier: f64,
    cancel: &CancelToken,
) -> Result<CountdownReport, SinkError> {
    run(sink, total, multiplier, cancel, Direction::Down)
}

/// Same timing as [`countdown`], consuming from index 0 upward.
pub fn countup(
    sink: &SharedSink,
    total: Duration,
    multiplier: f64,
    cancel: &CancelToken,
) -> Result<CountdownReport, SinkError> {
    run(sink, total, multiplier, cancel, Direction::Up)
}
