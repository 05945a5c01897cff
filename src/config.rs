//! Configuration for the booth lights
//!
//! Stored as TOML with a single `[neopixel]` table:
//!
//! ```toml
//! [neopixel]
//! pixels = 24
//! pixel_order = "GRBW"
//! attract_sequence = "rainbow||6;color_wipe|255,0,0|3"
//! preview_delay = 5.0
//! ```
//!
//! Every key is optional. Values that don't make sense (an unknown pixel
//! order, an unparsable flash color) are logged and replaced by defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use booth_strip::{PixelColor, PixelOrder, SpiConfig};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::calibration::{self, MultiplierBounds};
use crate::sequence::AttractSequence;

/// Top-level config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LightsConfig {
    #[serde(default)]
    pub neopixel: NeopixelConfig,
}

/// The `[neopixel]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeopixelConfig {
    /// Number of pixels on the strip
    pub pixels: usize,
    /// Global brightness 0.0-1.0
    pub brightness: f32,
    /// Bytes per pixel (3 = RGB, 4 = RGBW)
    pub bpp: usize,
    /// SPI byte encoding a zero bit
    pub bit0: u8,
    /// Channel order name (RGB, GRB, RGBW, ...)
    pub pixel_order: String,
    /// Render on every write instead of on show
    pub auto_write: bool,
    pub spi_device: PathBuf,

    /// `pattern|R,G,B[,W]|seconds;...`
    pub attract_sequence: String,
    /// Step delay of attract patterns (seconds)
    pub attract_speed: f64,
    /// Dwell for entries that omit a duration (seconds)
    pub attract_default_duration: f64,

    /// How long the preview state lasts (seconds)
    pub preview_delay: f64,
    /// Show a countdown during preview
    pub preview_countdown: bool,
    /// CSV `R,G,B[,W]`
    pub flash_color: String,

    pub neopixel_multiplier: f64,
    pub neopixel_auto_calibrate: bool,
    pub neopixel_calibrate_steps: usize,
    pub neopixel_multiplier_min: f64,
    pub neopixel_multiplier_max: f64,
    /// Overrides the default calibration file location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calibration_path: Option<PathBuf>,
}

impl Default for NeopixelConfig {
    fn default() -> Self {
        Self {
            pixels: 24,
            brightness: 0.2,
            bpp: 4,
            bit0: 0b1000_0000,
            pixel_order: "RGBW".to_string(),
            auto_write: false,
            spi_device: PathBuf::from("/dev/spidev0.0"),
            attract_sequence: "rainbow||6".to_string(),
            attract_speed: 0.02,
            attract_default_duration: 6.0,
            preview_delay: 5.0,
            preview_countdown: true,
            flash_color: "255,255,255,0".to_string(),
            neopixel_multiplier: calibration::FALLBACK_MULTIPLIER,
            neopixel_auto_calibrate: true,
            neopixel_calibrate_steps: 8,
            neopixel_multiplier_min: 0.5,
            neopixel_multiplier_max: 4.0,
            calibration_path: None,
        }
    }
}

/// Seconds from config as a `Duration`; negative or non-finite becomes zero.
pub fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

impl NeopixelConfig {
    /// Pixel order, falling back to RGBW for unknown names
    pub fn order(&self) -> PixelOrder {
        self.pixel_order.parse().unwrap_or_else(|e| {
            warn!("{}; using RGBW", e);
            PixelOrder::Rgbw
        })
    }

    /// Hardware settings for [`booth_strip::SpiSink`]
    pub fn spi_config(&self) -> SpiConfig {
        SpiConfig {
            device: self.spi_device.clone(),
            pixels: self.pixels,
            brightness: self.brightness.clamp(0.0, 1.0),
            bytes_per_pixel: self.bpp,
            bit0: self.bit0,
            order: self.order(),
            auto_write: self.auto_write,
        }
    }

    pub fn sequence(&self) -> AttractSequence {
        AttractSequence::parse(&self.attract_sequence)
    }

    pub fn attract_speed(&self) -> Duration {
        seconds(self.attract_speed)
    }

    pub fn attract_default_duration(&self) -> Duration {
        seconds(self.attract_default_duration)
    }

    pub fn preview_delay(&self) -> Duration {
        seconds(self.preview_delay)
    }

    /// Flash color, falling back to white for unparsable values
    pub fn flash_color(&self) -> PixelColor {
        PixelColor::parse_csv(&self.flash_color).unwrap_or_else(|| {
            warn!("Invalid flash_color \"{}\"; using white", self.flash_color);
            PixelColor::WHITE
        })
    }

    pub fn bounds(&self) -> MultiplierBounds {
        MultiplierBounds::new(self.neopixel_multiplier_min, self.neopixel_multiplier_max)
    }

    pub fn calibration_path(&self) -> PathBuf {
        self.calibration_path
            .clone()
            .unwrap_or_else(calibration::default_path)
    }
}

impl LightsConfig {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("booth-lights")
            .join("config.toml")
    }

    /// Load config from a file, or return default if not found
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: LightsConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Like [`load`](Self::load), but a broken file yields the defaults
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!(
                "Failed to load config from {}: {:#}; using defaults",
                path.display(),
                e
            );
            Self::default()
        })
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
