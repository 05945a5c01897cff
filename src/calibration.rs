//! Countdown timing calibration.
//!
//! A countdown sleeps `(target / pixels) * multiplier` between steps. On real
//! hardware each step also pays for a full SPI frame write, so the multiplier
//! is either measured at startup, loaded from a previous run, or taken from
//! the config.
//!
//! The calibration file is a single JSON object:
//!
//! ```json
//! {"multiplier": 1.42, "timestamp": 1718000000.0}
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use booth_strip::{PixelColor, PixelSink, PixelSinkExt, SinkError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::countdown::CountdownReport;

/// Multiplier used whenever nothing better is known
pub const FALLBACK_MULTIPLIER: f64 = 1.75;

/// Pixels toggled while measuring write latency
const PROBE_PIXELS: usize = 4;

/// Dim grey the probe alternates with black
const PROBE_COLOR: PixelColor = PixelColor::rgb(8, 8, 8);

/// Errors from the calibration file and trace analysis
#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed calibration data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not enough timestamps to analyze ({count}, need at least 2)")]
    NotEnoughSamples { count: usize },

    #[error("Countdown target must be positive and cover at least one pixel")]
    InvalidTarget,
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> CalibrationError + '_ {
    move |source| CalibrationError::Io {
        path: path.to_path_buf(),
        source,
    }
}

// ── Bounds ───────────────────────────────────────────────────────────

/// Allowed multiplier range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MultiplierBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for MultiplierBounds {
    fn default() -> Self {
        Self { min: 0.5, max: 4.0 }
    }
}

impl MultiplierBounds {
    /// Build bounds, swapping the ends if given backwards.
    pub fn new(min: f64, max: f64) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && self.min <= value && value <= self.max
    }
}

// ── Measurement ──────────────────────────────────────────────────────

fn probe_writes(sink: &mut dyn PixelSink, count: usize, steps: usize) -> Result<(), SinkError> {
    for step in 0..steps {
        let color = if step % 2 == 0 {
            PixelColor::BLACK
        } else {
            PROBE_COLOR
        };
        for index in 0..count {
            sink.set_pixel(index, color)?;
        }
        sink.show()?;
    }
    Ok(())
}

/// Average wall-clock cost of one write + show on `sink`.
///
/// Toggles the first few pixels `steps` times (at least once), then puts
/// their previous colors back. Restore failures are logged and ignored.
pub fn measure_write_latency(
    sink: &mut dyn PixelSink,
    steps: usize,
) -> Result<Duration, SinkError> {
    let steps = steps.max(1);
    let count = PROBE_PIXELS.min(sink.len());
    let saved: Vec<PixelColor> = (0..count)
        .map(|i| sink.pixel(i).unwrap_or_default())
        .collect();

    let start = Instant::now();
    let result = probe_writes(sink, count, steps);
    let elapsed = start.elapsed();

    for (index, color) in saved.into_iter().enumerate() {
        if let Err(e) = sink.set_pixel(index, color) {
            debug!("Failed to restore pixel {} after probe: {}", index, e);
        }
    }
    if let Err(e) = sink.show() {
        debug!("Failed to show restored pixels after probe: {}", e);
    }

    result?;
    Ok(elapsed.div_f64(steps as f64))
}

/// Multiplier that spreads `pixel_count` writes of `per_write` over `target`.
///
/// Degenerate inputs (empty strip, zero target) give the fallback. The
/// result never decreases as `per_write` grows.
pub fn multiplier_from_latency(
    per_write: Duration,
    pixel_count: usize,
    target: Duration,
    bounds: MultiplierBounds,
) -> f64 {
    if target.is_zero() || pixel_count == 0 {
        return bounds.clamp(FALLBACK_MULTIPLIER);
    }
    let raw = per_write.as_secs_f64() * pixel_count as f64 / target.as_secs_f64();
    bounds.clamp(raw)
}

/// Measure `sink` and turn the result into a multiplier for `target`.
pub fn compute_multiplier(
    sink: &mut dyn PixelSink,
    target: Duration,
    steps: usize,
    bounds: MultiplierBounds,
) -> f64 {
    let pixel_count = sink.len();
    if target.is_zero() || pixel_count == 0 {
        debug!("Nothing to calibrate (target={:?}, pixels={})", target, pixel_count);
        return bounds.clamp(FALLBACK_MULTIPLIER);
    }

    match measure_write_latency(sink, steps) {
        Ok(per_write) => {
            let multiplier = multiplier_from_latency(per_write, pixel_count, target, bounds);
            debug!(
                "Measured {:?} per write over {} steps -> multiplier {:.3}",
                per_write, steps, multiplier
            );
            multiplier
        }
        Err(e) => {
            warn!("Write latency measurement failed: {}", e);
            bounds.clamp(FALLBACK_MULTIPLIER)
        }
    }
}

// ── Persistence ──────────────────────────────────────────────────────

/// Contents of the calibration file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSample {
    pub multiplier: f64,
    /// Seconds since the Unix epoch
    #[serde(default)]
    pub timestamp: f64,
}

/// Default calibration file location
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("neopixel_multiplier.json")
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Write `multiplier` to `path`, creating parent directories.
pub fn persist(multiplier: f64, path: &Path) -> Result<(), CalibrationError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    let sample = CalibrationSample {
        multiplier,
        timestamp: unix_now(),
    };
    let content = serde_json::to_string(&sample)?;
    std::fs::write(path, content).map_err(io_err(path))?;
    info!("Saved multiplier {:.4} to {}", multiplier, path.display());
    Ok(())
}

/// Read a previously persisted multiplier.
///
/// Anything unusable (missing file, bad JSON, value outside `bounds`) is
/// treated as absent.
pub fn load(path: &Path, bounds: MultiplierBounds) -> Option<f64> {
    if !path.exists() {
        debug!("No calibration file at {}", path.display());
        return None;
    }
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            return None;
        }
    };
    let sample: CalibrationSample = match serde_json::from_str(&content) {
        Ok(s) => s,
        Err(e) => {
            warn!("Ignoring malformed calibration file {}: {}", path.display(), e);
            return None;
        }
    };
    if !bounds.contains(sample.multiplier) {
        warn!(
            "Persisted multiplier {:.3} out of bounds ({:.3}..{:.3}); ignoring",
            sample.multiplier, bounds.min, bounds.max
        );
        return None;
    }
    info!(
        "Loaded persisted multiplier {:.4} from {}",
        sample.multiplier,
        path.display()
    );
    Some(sample.multiplier)
}

// ── Resolution ───────────────────────────────────────────────────────

/// Where the active multiplier came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiplierSource {
    Persisted,
    Measured,
    Configured,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedMultiplier {
    pub value: f64,
    pub source: MultiplierSource,
}

/// Pick the multiplier: persisted, then measured (if enabled), then configured.
///
/// `measure` only runs when there is no persisted value and auto-calibration
/// is on.
pub fn resolve_multiplier(
    persisted: Option<f64>,
    auto_calibrate: bool,
    measure: impl FnOnce() -> f64,
    configured: f64,
) -> ResolvedMultiplier {
    if let Some(value) = persisted {
        return ResolvedMultiplier {
            value,
            source: MultiplierSource::Persisted,
        };
    }
    if auto_calibrate {
        return ResolvedMultiplier {
            value: measure(),
            source: MultiplierSource::Measured,
        };
    }
    ResolvedMultiplier {
        value: configured,
        source: MultiplierSource::Configured,
    }
}

// ── Countdown traces ─────────────────────────────────────────────────

/// Step timestamps captured while a countdown ran, in seconds since its start.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountdownTrace {
    pub num_pixels: usize,
    pub step_times: Vec<f64>,
    pub end_time: f64,
}

impl CountdownTrace {
    pub fn from_report(report: &CountdownReport, num_pixels: usize) -> Self {
        let since_start = |t: &Instant| t.duration_since(report.started).as_secs_f64();
        Self {
            num_pixels,
            step_times: report.step_times.iter().map(since_start).collect(),
            end_time: since_start(&report.finished),
        }
    }

    /// Write as JSON lines: a start marker, one line per step, an end marker.
    pub fn write_jsonl(&self, path: &Path) -> Result<(), CalibrationError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err(parent))?;
            }
        }
        let file = File::create(path).map_err(io_err(path))?;
        let mut out = BufWriter::new(file);
        let mut line = |value: serde_json::Value| writeln!(out, "{value}").map_err(io_err(path));

        line(json!({
            "event": "start",
            "time": 0.0,
            "num_pixels": self.num_pixels,
            "steps": self.step_times.len(),
        }))?;
        for (step, time) in self.step_times.iter().enumerate() {
            line(json!({
                "step": step,
                "pixel_index": self.num_pixels.saturating_sub(step + 1),
                "time": time,
            }))?;
        }
        line(json!({ "event": "end", "time": self.end_time }))?;
        drop(line);
        out.flush().map_err(io_err(path))
    }

    /// Read a trace written by [`write_jsonl`](Self::write_jsonl).
    pub fn read_jsonl(path: &Path) -> Result<Self, CalibrationError> {
        let file = File::open(path).map_err(io_err(path))?;
        let mut trace = CountdownTrace::default();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(io_err(path))?;
            if line.trim().is_empty() {
                continue;
            }
            let value: serde_json::Value = serde_json::from_str(&line)?;
            let time = value.get("time").and_then(|t| t.as_f64()).unwrap_or(0.0);
            match value.get("event").and_then(|e| e.as_str()) {
                Some("start") => {
                    trace.num_pixels = value
                        .get("num_pixels")
                        .and_then(|n| n.as_u64())
                        .unwrap_or(0) as usize;
                }
                Some("end") => trace.end_time = time,
                _ if value.get("step").is_some() => trace.step_times.push(time),
                _ => {}
            }
        }
        Ok(trace)
    }
}

/// Result of [`analyze_trace`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceAnalysis {
    pub observed_avg_delta: f64,
    pub observed_median_delta: f64,
    /// `target / pixels`: what one step should take
    pub expected_per_pixel: f64,
    /// Time per step not spent sleeping (`avg - multiplier_used * expected`)
    pub overhead_per_step: f64,
    /// `avg / expected`: how far off the run was
    pub observed_ratio: f64,
    /// Multiplier that would make the average step match `expected_per_pixel`
    pub suggested_multiplier: f64,
    pub steps_measured: usize,
}

/// Work out a multiplier from a recorded countdown.
///
/// The run slept `multiplier_used * expected` per step and spent the rest of
/// each step writing. Keeping that write overhead fixed, the sleep that hits
/// `expected` exactly is `expected - overhead`, i.e. a multiplier of
/// `1 - overhead / expected`.
pub fn analyze_trace(
    step_times: &[f64],
    target: Duration,
    pixel_count: usize,
    multiplier_used: f64,
    bounds: MultiplierBounds,
) -> Result<TraceAnalysis, CalibrationError> {
    if step_times.len() < 2 {
        return Err(CalibrationError::NotEnoughSamples {
            count: step_times.len(),
        });
    }
    if target.is_zero() || pixel_count == 0 {
        return Err(CalibrationError::InvalidTarget);
    }

    let mut deltas: Vec<f64> = step_times.windows(2).map(|w| w[1] - w[0]).collect();
    let avg = deltas.iter().sum::<f64>() / deltas.len() as f64;
    deltas.sort_by(f64::total_cmp);
    let median = deltas[deltas.len() / 2];

    let expected = target.as_secs_f64() / pixel_count as f64;
    let overhead = avg - multiplier_used * expected;
    let suggested = bounds.clamp(1.0 - overhead / expected);

    Ok(TraceAnalysis {
        observed_avg_delta: avg,
        observed_median_delta: median,
        expected_per_pixel: expected,
        overhead_per_step: overhead,
        observed_ratio: avg / expected,
        suggested_multiplier: suggested,
        steps_measured: step_times.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use booth_strip::MemorySink;

    #[test]
    fn test_bounds() {
        let bounds = MultiplierBounds::new(4.0, 0.5);
        assert_eq!(bounds, MultiplierBounds::default());
        assert_eq!(bounds.clamp(10.0), 4.0);
        assert_eq!(bounds.clamp(0.1), 0.5);
        assert!(bounds.contains(0.5));
        assert!(!bounds.contains(f64::NAN));
    }

    #[test]
    fn test_multiplier_formula() {
        let bounds = MultiplierBounds::default();
        // 50ms * 24 / 1s = 1.2
        let m = multiplier_from_latency(
            Duration::from_millis(50),
            24,
            Duration::from_secs(1),
            bounds,
        );
        assert!((m - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_multiplier_degenerate_inputs() {
        let bounds = MultiplierBounds::default();
        let per_write = Duration::from_millis(5);
        assert_eq!(
            multiplier_from_latency(per_write, 0, Duration::from_secs(5), bounds),
            FALLBACK_MULTIPLIER
        );
        assert_eq!(
            multiplier_from_latency(per_write, 24, Duration::ZERO, bounds),
            FALLBACK_MULTIPLIER
        );
    }

    #[test]
    fn test_measure_restores_pixels() {
        let mut sink = MemorySink::new(6).with_flush_latency(Duration::from_millis(2));
        sink.fill(PixelColor::GREEN).unwrap();

        let per_write = measure_write_latency(&mut sink, 4).unwrap();

        assert!(per_write >= Duration::from_millis(2));
        assert!(sink.pixels().iter().all(|c| *c == PixelColor::GREEN));
        // 4 probe flushes + 1 restore
        assert_eq!(sink.flush_count(), 5);
    }

    #[test]
    fn test_measure_zero_steps_still_writes_once() {
        let mut sink = MemorySink::new(2);
        measure_write_latency(&mut sink, 0).unwrap();
        assert_eq!(sink.flush_count(), 2);
    }

    #[test]
    fn test_compute_multiplier_falls_back_on_sink_error() {
        let mut sink = MemorySink::new(8);
        sink.fail_next_flushes(1);
        let m = compute_multiplier(
            &mut sink,
            Duration::from_secs(5),
            4,
            MultiplierBounds::default(),
        );
        assert_eq!(m, FALLBACK_MULTIPLIER);
    }

    #[test]
    fn test_resolve_precedence() {
        let r = resolve_multiplier(Some(2.0), true, || panic!("must not measure"), 1.0);
        assert_eq!(r.source, MultiplierSource::Persisted);
        assert_eq!(r.value, 2.0);

        let r = resolve_multiplier(None, true, || 3.0, 1.0);
        assert_eq!(r.source, MultiplierSource::Measured);
        assert_eq!(r.value, 3.0);

        let r = resolve_multiplier(None, false, || panic!("must not measure"), 1.0);
        assert_eq!(r.source, MultiplierSource::Configured);
        assert_eq!(r.value, 1.0);
    }

    #[test]
    fn test_analyze_trace() {
        // 24 pixels over 2.4s: expected 0.1s per step. Run with multiplier 1.0
        // took 0.12s per step, so 0.02s of overhead; 0.8 would hit 0.1s.
        let times: Vec<f64> = (0..5).map(|i| i as f64 * 0.12).collect();
        let analysis = analyze_trace(
            &times,
            Duration::from_millis(2400),
            24,
            1.0,
            MultiplierBounds::default(),
        )
        .unwrap();

        assert!((analysis.observed_avg_delta - 0.12).abs() < 1e-9);
        assert!((analysis.observed_median_delta - 0.12).abs() < 1e-9);
        assert!((analysis.expected_per_pixel - 0.1).abs() < 1e-9);
        assert!((analysis.overhead_per_step - 0.02).abs() < 1e-9);
        assert!((analysis.observed_ratio - 1.2).abs() < 1e-9);
        assert!((analysis.suggested_multiplier - 0.8).abs() < 1e-9);
        assert_eq!(analysis.steps_measured, 5);
    }

    #[test]
    fn test_analyze_trace_needs_two_samples() {
        let err = analyze_trace(
            &[1.0],
            Duration::from_secs(5),
            24,
            1.0,
            MultiplierBounds::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CalibrationError::NotEnoughSamples { count: 1 }));
    }

    #[test]
    fn test_trace_jsonl_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("trace.jsonl");
        let trace = CountdownTrace {
            num_pixels: 3,
            step_times: vec![0.01, 0.5, 1.0],
            end_time: 1.5,
        };
        trace.write_jsonl(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].contains("\"event\":\"start\""));
        assert!(lines[1].contains("\"pixel_index\":2"));
        assert!(lines[3].contains("\"pixel_index\":0"));

        assert_eq!(CountdownTrace::read_jsonl(&path).unwrap(), trace);
    }
}
