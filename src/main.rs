//! booth-lights: NeoPixel feedback for a photo booth
//!
//! Main entry point.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use tracing::info;

use booth_lights::config::LightsConfig;
use commands::Context;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout belongs to the preview and command output
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load config
    let config_path = cli.config.unwrap_or_else(LightsConfig::default_path);
    info!("Loading config from {:?}", config_path);
    let mut config = LightsConfig::load_or_default(&config_path).neopixel;
    if let Some(pixels) = cli.pixels {
        config.pixels = pixels;
    }

    let ctx = Context {
        config,
        preview: cli.preview,
    };

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => commands::session::run(&ctx)?,
        Commands::Attract { sequence, speed } => {
            commands::session::attract(&ctx, sequence.as_deref(), speed)?
        }
        Commands::Countdown {
            seconds,
            multiplier,
        } => commands::timing::countdown(&ctx, seconds, multiplier, false)?,
        Commands::Countup {
            seconds,
            multiplier,
        } => commands::timing::countdown(&ctx, seconds, multiplier, true)?,
        Commands::Calibrate {
            preview_delay,
            multiplier,
            log,
            from_log,
            persist,
        } => commands::timing::calibrate(
            &ctx,
            preview_delay,
            multiplier,
            &log,
            from_log.as_deref(),
            persist,
        )?,
        Commands::Measure { steps } => commands::timing::measure(&ctx, steps)?,
        Commands::TestColors { hold, once } => commands::utility::test_colors(&ctx, hold, once)?,
        Commands::Patterns => commands::utility::patterns()?,
    }

    Ok(())
}
