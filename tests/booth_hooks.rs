//! Integration tests for the booth lifecycle hooks.
//!
//! Covers multiplier resolution at startup and a full session driven by
//! event names, the way the `run` command feeds them from stdin.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use booth_lights::calibration::{self, MultiplierSource};
use booth_lights::config::NeopixelConfig;
use booth_lights::countdown::CONSUMED_COLOR;
use booth_lights::hooks::{BoothEvent, BoothLights, CHOOSE_COLOR};
use booth_strip::{MemorySink, PixelColor, SharedSink};
use parking_lot::Mutex;
use tempfile::TempDir;

fn config_in(dir: &TempDir) -> NeopixelConfig {
    NeopixelConfig {
        pixels: 6,
        attract_speed: 0.001,
        attract_sequence: "color_wipe|0,0,255|0.02;rainbow||0.02".to_string(),
        preview_delay: 0.06,
        neopixel_auto_calibrate: false,
        calibration_path: Some(dir.path().join("neopixel_multiplier.json")),
        ..NeopixelConfig::default()
    }
}

fn recording_sink(len: usize) -> (Arc<Mutex<MemorySink>>, SharedSink) {
    let concrete = Arc::new(Mutex::new(MemorySink::new(len)));
    let sink: SharedSink = concrete.clone();
    (concrete, sink)
}

// ── Multiplier resolution ──

#[test]
fn persisted_multiplier_wins() {
    let dir = tempfile::tempdir().unwrap();
    let config = NeopixelConfig {
        neopixel_auto_calibrate: true,
        ..config_in(&dir)
    };
    calibration::persist(2.5, &config.calibration_path()).unwrap();

    let (strip, sink) = recording_sink(6);
    let lights = BoothLights::from_config(&config, sink);
    let resolved = lights.settings().multiplier;
    assert_eq!(resolved.source, MultiplierSource::Persisted);
    assert_eq!(resolved.value, 2.5);
    // No measurement happened
    assert!(strip.lock().events().is_empty());
}

#[test]
fn configured_multiplier_is_clamped() {
    let dir = tempfile::tempdir().unwrap();
    let config = NeopixelConfig {
        neopixel_multiplier: 10.0,
        ..config_in(&dir)
    };

    let (_strip, sink) = recording_sink(6);
    let lights = BoothLights::from_config(&config, sink);
    let resolved = lights.settings().multiplier;
    assert_eq!(resolved.source, MultiplierSource::Configured);
    assert_eq!(resolved.value, config.neopixel_multiplier_max);
}

#[test]
fn out_of_bounds_file_falls_through_to_measurement() {
    let dir = tempfile::tempdir().unwrap();
    let config = NeopixelConfig {
        pixels: 24,
        preview_delay: 0.24,
        neopixel_auto_calibrate: true,
        neopixel_calibrate_steps: 2,
        ..config_in(&dir)
    };
    calibration::persist(9.0, &config.calibration_path()).unwrap();

    let concrete = Arc::new(Mutex::new(
        MemorySink::new(24).with_flush_latency(Duration::from_millis(10)),
    ));
    let sink: SharedSink = concrete.clone();
    let lights = BoothLights::from_config(&config, sink);
    let resolved = lights.settings().multiplier;

    assert_eq!(resolved.source, MultiplierSource::Measured);
    // 10ms per write over 24 pixels in 240ms is at least 1x
    assert!(resolved.value >= 1.0 - 1e-9);
    assert!(resolved.value <= config.neopixel_multiplier_max);
    // Probe pixels were put back
    assert!(concrete.lock().pixels().iter().all(|c| c.is_off()));
}

// ── Session flow ──

#[test]
fn session_driven_by_event_names() {
    let dir = tempfile::tempdir().unwrap();
    let config = NeopixelConfig {
        neopixel_multiplier: 1.0,
        ..config_in(&dir)
    };
    let (strip, sink) = recording_sink(6);
    let lights = BoothLights::from_config(&config, sink);

    let event = |name: &str| lights.dispatch(name.parse::<BoothEvent>().unwrap());

    event("startup");
    thread::sleep(Duration::from_millis(20));
    assert!(lights.attract().is_running());

    event("state_wait_exit");
    assert!(!lights.attract().is_running());

    event("choose-enter");
    assert!(strip.lock().pixels().iter().all(|c| *c == CHOOSE_COLOR));

    event("preview_enter");
    assert!(lights.one_shot_running());
    lights.wait_one_shot();
    assert!(strip.lock().pixels().iter().all(|c| *c == CONSUMED_COLOR));

    event("preview_exit");
    assert!(strip.lock().pixels().iter().all(|c| *c == PixelColor::FULL));

    event("capture_exit");
    assert!(strip.lock().pixels().iter().all(|c| c.is_off()));

    event("wait_enter");
    assert!(lights.attract().is_running());

    event("cleanup");
    assert!(!lights.attract().is_running());
    thread::sleep(Duration::from_millis(20));
    assert!(strip.lock().pixels().iter().all(|c| c.is_off()));
}

#[test]
fn choosing_interrupts_a_running_countdown() {
    let dir = tempfile::tempdir().unwrap();
    let config = NeopixelConfig {
        preview_delay: 30.0,
        ..config_in(&dir)
    };
    let (strip, sink) = recording_sink(6);
    let lights = BoothLights::from_config(&config, sink);

    lights.preview_enter();
    thread::sleep(Duration::from_millis(20));
    assert!(lights.one_shot_running());

    lights.choose_enter();
    assert!(!lights.one_shot_running());
    thread::sleep(Duration::from_millis(20));
    assert!(strip.lock().pixels().iter().all(|c| *c == CHOOSE_COLOR));
}

#[test]
fn oversized_dwell_in_config_still_starts() {
    let dir = tempfile::tempdir().unwrap();
    let config = NeopixelConfig {
        attract_sequence: "rainbow||1e30;pulse||1e20".to_string(),
        ..config_in(&dir)
    };
    let (strip, sink) = recording_sink(6);
    let lights = BoothLights::from_config(&config, sink);

    let sequence = lights.settings().sequence.clone();
    assert_eq!(sequence.len(), 2);
    assert!(sequence.entries().iter().all(|e| e.duration.is_none()));

    lights.startup();
    thread::sleep(Duration::from_millis(20));
    assert!(lights.attract().is_running());
    lights.cleanup();
    assert!(strip.lock().pixels().iter().all(|c| c.is_off()));
}
