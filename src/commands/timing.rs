//! Countdown timing commands: run countdowns and calibrate their multiplier.

use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use booth_lights::calibration::{self, CountdownTrace, TraceAnalysis};
use booth_lights::config::seconds;
use booth_lights::countdown::{self, CountdownReport};
use tracing::info;

use super::{setup_interrupt_handler, CommandResult, Context};

/// Persisted multiplier if there is one, otherwise the configured value.
fn stored_multiplier(ctx: &Context) -> f64 {
    let bounds = ctx.config.bounds();
    calibration::load(&ctx.config.calibration_path(), bounds)
        .unwrap_or_else(|| bounds.clamp(ctx.config.neopixel_multiplier))
}

fn print_report(report: &CountdownReport, target: Duration) {
    let verb = if report.completed {
        "finished"
    } else {
        "interrupted"
    };
    println!(
        "Countdown {} after {:.3}s (target {:.3}s, {} steps, {:.4}s per pixel)",
        verb,
        report.elapsed().as_secs_f64(),
        target.as_secs_f64(),
        report.step_times.len(),
        report.per_pixel_delay.as_secs_f64()
    );
}

/// Run a countdown (`up == false`) or countup.
pub fn countdown(
    ctx: &Context,
    secs: Option<f64>,
    multiplier: Option<f64>,
    up: bool,
) -> CommandResult {
    let total = secs.map(seconds).unwrap_or_else(|| ctx.config.preview_delay());
    let multiplier = multiplier.unwrap_or_else(|| stored_multiplier(ctx));
    let sink = ctx.open_sink()?;
    let interrupted = setup_interrupt_handler();

    info!(
        "Running {} over {:.2}s with multiplier {:.3}",
        if up { "countup" } else { "countdown" },
        total.as_secs_f64(),
        multiplier
    );
    let report = if up {
        countdown::countup(&sink, total, multiplier, &interrupted)?
    } else {
        countdown::countdown(&sink, total, multiplier, &interrupted)?
    };
    print_report(&report, total);
    Ok(())
}

fn print_analysis(analysis: &TraceAnalysis) {
    println!("\nAnalysis:");
    println!("  observed_avg_delta:    {:.6}", analysis.observed_avg_delta);
    println!("  observed_median_delta: {:.6}", analysis.observed_median_delta);
    println!("  expected_per_pixel:    {:.6}", analysis.expected_per_pixel);
    println!("  overhead_per_step:     {:.6}", analysis.overhead_per_step);
    println!("  observed_ratio:        {:.4}", analysis.observed_ratio);
    println!("  steps_measured:        {}", analysis.steps_measured);
}

/// Measure a countdown (or re-read a saved trace) and suggest a multiplier.
pub fn calibrate(
    ctx: &Context,
    preview_delay: Option<f64>,
    multiplier: f64,
    log: &Path,
    from_log: Option<&Path>,
    persist: bool,
) -> CommandResult {
    let target = preview_delay
        .map(seconds)
        .unwrap_or_else(|| ctx.config.preview_delay());

    let trace = match from_log {
        Some(path) => {
            let trace = CountdownTrace::read_jsonl(path)
                .with_context(|| format!("read trace {}", path.display()))?;
            println!(
                "Loaded {} steps from {}",
                trace.step_times.len(),
                path.display()
            );
            trace
        }
        None => {
            let sink = ctx.open_sink()?;
            let interrupted = setup_interrupt_handler();
            let pixels = sink.lock().len();
            println!(
                "Running measured countdown: preview_delay={}s pixels={} multiplier_used={}",
                target.as_secs_f64(),
                pixels,
                multiplier
            );
            let report = countdown::countdown(&sink, target, multiplier, &interrupted)?;
            let trace = CountdownTrace::from_report(&report, pixels);
            trace.write_jsonl(log)?;
            println!(
                "Timestamps logged to {} ({} steps)",
                log.display(),
                trace.step_times.len()
            );
            trace
        }
    };

    let pixels = if trace.num_pixels > 0 {
        trace.num_pixels
    } else {
        ctx.config.pixels
    };
    let analysis = calibration::analyze_trace(
        &trace.step_times,
        target,
        pixels,
        multiplier,
        ctx.config.bounds(),
    )?;
    print_analysis(&analysis);
    println!(
        "\nSuggested multiplier to match preview_delay: {:.4}",
        analysis.suggested_multiplier
    );

    if persist {
        let path = ctx.config.calibration_path();
        calibration::persist(analysis.suggested_multiplier, &path)?;
        println!("Persisted multiplier to {}", path.display());
    }
    Ok(())
}

/// Measure write latency and show the multiplier startup calibration would pick.
pub fn measure(ctx: &Context, steps: Option<usize>) -> CommandResult {
    let steps = steps.unwrap_or(ctx.config.neopixel_calibrate_steps).max(1);
    let target = ctx.config.preview_delay();
    let bounds = ctx.config.bounds();
    let sink = ctx.open_sink()?;

    let mut strip = sink.lock();
    let pixels = strip.len();
    let per_write = calibration::measure_write_latency(&mut *strip, steps)?;
    let multiplier = calibration::multiplier_from_latency(per_write, pixels, target, bounds);

    println!(
        "Per-write latency: {:.3}ms over {} steps",
        per_write.as_secs_f64() * 1000.0,
        steps
    );
    println!(
        "Multiplier for {} pixels over {:.2}s: {:.4} (bounds {:.2}..{:.2})",
        pixels,
        target.as_secs_f64(),
        multiplier,
        bounds.min,
        bounds.max
    );
    Ok(())
}
