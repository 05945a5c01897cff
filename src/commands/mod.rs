//! Command handlers for the CLI application.
//!
//! - `session`: long-running commands (run, attract)
//! - `timing`: countdown timing commands (countdown, countup, calibrate, measure)
//! - `utility`: hardware checks and listings (test-colors, patterns)

pub mod session;
pub mod timing;
pub mod utility;

use anyhow::Context as _;
use booth_lights::cancel::CancelToken;
use booth_lights::config::NeopixelConfig;
use booth_lights::preview::TerminalSink;
use booth_strip::{shared, SharedSink, SpiSink};
use tracing::info;

/// Result type for command handlers
pub type CommandResult = anyhow::Result<()>;

/// Settings shared by every command
pub struct Context {
    pub config: NeopixelConfig,
    pub preview: bool,
}

impl Context {
    /// Open the terminal preview or the SPI strip
    pub fn open_sink(&self) -> anyhow::Result<SharedSink> {
        if self.preview {
            info!("Previewing {} pixels in the terminal", self.config.pixels);
            let sink = TerminalSink::stdout(self.config.pixels)
                .with_auto_flush(self.config.auto_write);
            return Ok(shared(sink));
        }

        let spi = self.config.spi_config();
        let device = spi.device.display().to_string();
        let sink = SpiSink::open(spi).with_context(|| format!("open NeoPixel strip on {device}"))?;
        info!(
            "Opened {} ({} pixels, brightness {:.2})",
            device, self.config.pixels, self.config.brightness
        );
        Ok(shared(sink))
    }
}

/// Setup Ctrl+C handler, returns a token cancelled on interrupt
pub fn setup_interrupt_handler() -> CancelToken {
    let interrupted = CancelToken::new();
    let handler_token = interrupted.clone();

    ctrlc::set_handler(move || {
        handler_token.cancel();
    })
    .ok();

    interrupted
}
