// CLI definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "booth-lights")]
#[command(author, version, about = "NeoPixel strip feedback for photo-booth state machines")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file path (default: ~/.config/booth-lights/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// Draw the strip in this terminal instead of driving the SPI device
    #[arg(long, global = true)]
    pub preview: bool,

    /// Override the configured pixel count
    #[arg(long, global = true)]
    pub pixels: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read booth events from stdin, one per line (default)
    ///
    /// Events: startup, wait-enter, wait-exit, choose-enter, preview-enter,
    /// preview-exit, capture-exit, cleanup. EOF or Ctrl-C runs cleanup.
    Run,

    /// Play the attract sequence until Ctrl-C
    Attract {
        /// Sequence to play instead of the configured one
        /// (pattern|R,G,B[,W]|seconds;...)
        #[arg(short, long)]
        sequence: Option<String>,

        /// Step delay in seconds
        #[arg(long)]
        speed: Option<f64>,
    },

    /// Drain the strip from the far end, one pixel per step
    #[command(visible_alias = "down")]
    Countdown {
        /// Total duration (default: preview_delay)
        #[arg(short, long)]
        seconds: Option<f64>,

        /// Delay multiplier (default: persisted, else configured)
        #[arg(short, long)]
        multiplier: Option<f64>,
    },

    /// Like countdown, consuming pixels from the start of the strip
    #[command(visible_alias = "up")]
    Countup {
        /// Total duration (default: preview_delay)
        #[arg(short, long)]
        seconds: Option<f64>,

        /// Delay multiplier (default: persisted, else configured)
        #[arg(short, long)]
        multiplier: Option<f64>,
    },

    /// Run a traced countdown and suggest a multiplier
    Calibrate {
        /// Target countdown duration (default: preview_delay)
        #[arg(long)]
        preview_delay: Option<f64>,

        /// Multiplier used for the measured run
        #[arg(short, long, default_value_t = 1.0)]
        multiplier: f64,

        /// Where to write the step timestamps (JSON lines)
        #[arg(long, default_value = "/tmp/neopixel_countdown_log.jsonl")]
        log: PathBuf,

        /// Analyze an existing log instead of running a countdown
        #[arg(long, value_name = "FILE")]
        from_log: Option<PathBuf>,

        /// Save the suggested multiplier to the calibration file
        #[arg(long)]
        persist: bool,
    },

    /// Measure per-write latency and show the multiplier it implies
    Measure {
        /// Number of probe writes (default: neopixel_calibrate_steps)
        #[arg(long)]
        steps: Option<usize>,
    },

    /// Cycle red, green, blue and the white channel
    #[command(name = "test-colors", visible_alias = "colors")]
    TestColors {
        /// Seconds per color
        #[arg(long, default_value_t = 2.0)]
        hold: f64,

        /// Stop after one cycle
        #[arg(long)]
        once: bool,
    },

    /// List the available attract patterns
    Patterns,
}
