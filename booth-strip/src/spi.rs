//! NeoPixel strips driven from a Linux `spidev` node.
//!
//! WS2812/SK6812 pixels want a ~800kHz self-clocked signal. Running the SPI
//! bus at 8x that rate lets every data bit be expressed as one SPI byte: a
//! short high pulse (`bit0`) for a zero and a long one (`BIT1`) for a one.

use std::fs::File;
use std::io::Write;
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::{PixelColor, PixelOrder, PixelSink, SinkError};

/// SPI clock: 8 SPI bits per NeoPixel bit at 800kHz
pub const SPI_FREQ_HZ: u32 = 6_400_000;

/// Latch/reset low time before each frame, in microseconds
pub const RESET_MICROS: u32 = 80;

/// SPI byte representing a one bit
pub const BIT1: u8 = 0b1111_0000;

/// Default SPI byte representing a zero bit
pub const DEFAULT_BIT0: u8 = 0b1000_0000;

/// Default spidev transfer buffer size; larger writes are rejected by the kernel
const SPIDEV_BUFSIZ: usize = 4096;

// SPIDEV ioctl definitions
// From linux/spi/spidev.h:
// #define SPI_IOC_WR_MODE          _IOW(SPI_IOC_MAGIC, 1, __u8)
// #define SPI_IOC_WR_BITS_PER_WORD _IOW(SPI_IOC_MAGIC, 3, __u8)
// #define SPI_IOC_WR_MAX_SPEED_HZ  _IOW(SPI_IOC_MAGIC, 4, __u32)

const SPI_IOC_MAGIC: u8 = b'k';

fn spi_iow(nr: u32, size: usize) -> libc::c_ulong {
    // Direction: 2 bits at 30-31 (_IOC_WRITE = 1), Size: 14 bits at 16-29,
    // Type: 8 bits at 8-15, Nr: 8 bits at 0-7
    let dir: u32 = 1;
    let size = (size as u32) & 0x3FFF;
    let typ = SPI_IOC_MAGIC as u32;
    ((dir << 30) | (size << 16) | (typ << 8) | nr) as libc::c_ulong
}

/// Hardware settings for an SPI strip
#[derive(Debug, Clone)]
pub struct SpiConfig {
    /// spidev node, e.g. `/dev/spidev0.0`
    pub device: PathBuf,
    pub pixels: usize,
    /// Global brightness 0.0-1.0 applied at encode time
    pub brightness: f32,
    /// 3 for RGB strips, 4 for RGBW
    pub bytes_per_pixel: usize,
    /// SPI byte used for a zero bit
    pub bit0: u8,
    pub order: PixelOrder,
    /// Flush after every write
    pub auto_write: bool,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/spidev0.0"),
            pixels: 24,
            brightness: 0.2,
            bytes_per_pixel: 4,
            bit0: DEFAULT_BIT0,
            order: PixelOrder::Rgbw,
            auto_write: false,
        }
    }
}

/// Encode a full frame (reset preamble + bit-expanded pixel data)
pub fn encode_frame(pixels: &[PixelColor], config: &SpiConfig) -> Vec<u8> {
    let reset_len = (SPI_FREQ_HZ as u64 * RESET_MICROS as u64 / 1_000_000 / 8) as usize;
    let bpp = config.bytes_per_pixel;

    let mut raw = Vec::with_capacity(pixels.len() * bpp);
    for color in pixels {
        config
            .order
            .encode(*color, config.brightness, bpp, &mut raw);
    }

    let mut frame = Vec::with_capacity(reset_len + raw.len() * 8);
    frame.resize(reset_len, 0);
    for byte in raw {
        for bit in (0..8).rev() {
            frame.push(if byte & (1 << bit) != 0 {
                BIT1
            } else {
                config.bit0
            });
        }
    }
    frame
}

/// NeoPixel strip on a spidev node
pub struct SpiSink {
    file: File,
    config: SpiConfig,
    buffer: Vec<PixelColor>,
}

impl SpiSink {
    /// Open the spidev node and configure mode 0, 8 bits per word, 6.4MHz.
    pub fn open(config: SpiConfig) -> Result<Self, SinkError> {
        if config.bytes_per_pixel != 3 && config.bytes_per_pixel != 4 {
            return Err(SinkError::InvalidConfig(format!(
                "bytes per pixel must be 3 or 4, got {}",
                config.bytes_per_pixel
            )));
        }
        if config.bytes_per_pixel != config.order.bytes_per_pixel() {
            warn!(
                "pixel order {} has {} channels but bpp is {}; padding/truncating",
                config.order,
                config.order.bytes_per_pixel(),
                config.bytes_per_pixel
            );
        }

        let device = config.device.display().to_string();
        let file = File::options()
            .write(true)
            .open(&config.device)
            .map_err(|e| SinkError::io(&device, e))?;
        let fd = file.as_raw_fd();

        let mode: u8 = 0;
        let bits: u8 = 8;
        let speed: u32 = SPI_FREQ_HZ;
        // SAFETY: fd is a valid open spidev descriptor and each pointer
        // refers to a live value of the size encoded in the request.
        let rets = unsafe {
            [
                libc::ioctl(fd, spi_iow(1, 1), &mode as *const u8),
                libc::ioctl(fd, spi_iow(3, 1), &bits as *const u8),
                libc::ioctl(fd, spi_iow(4, 4), &speed as *const u32),
            ]
        };
        if rets.iter().any(|&r| r < 0) {
            return Err(SinkError::io(&device, std::io::Error::last_os_error()));
        }

        let frame_len = encode_frame(&vec![PixelColor::BLACK; config.pixels], &config).len();
        if frame_len > SPIDEV_BUFSIZ {
            warn!(
                "frame is {} bytes, above the default spidev bufsiz of {}; raise spidev.bufsiz",
                frame_len, SPIDEV_BUFSIZ
            );
        }

        debug!(
            "opened {} ({} pixels, {} bpp, order {})",
            device, config.pixels, config.bytes_per_pixel, config.order
        );

        Ok(Self {
            file,
            buffer: vec![PixelColor::BLACK; config.pixels],
            config,
        })
    }

    pub fn config(&self) -> &SpiConfig {
        &self.config
    }

    fn transmit(&mut self) -> Result<(), SinkError> {
        let frame = encode_frame(&self.buffer, &self.config);
        self.file
            .write_all(&frame)
            .map_err(|e| SinkError::io(&self.config.device.display().to_string(), e))
    }
}

impl PixelSink for SpiSink {
    fn len(&self) -> usize {
        self.buffer.len()
    }

    fn pixel(&self, index: usize) -> Option<PixelColor> {
        self.buffer.get(index).copied()
    }

    fn set_pixel(&mut self, index: usize, color: PixelColor) -> Result<(), SinkError> {
        let len = self.buffer.len();
        let slot = self
            .buffer
            .get_mut(index)
            .ok_or(SinkError::IndexOutOfRange { index, len })?;
        *slot = color;
        if self.config.auto_write {
            self.transmit()?;
        }
        Ok(())
    }

    fn fill(&mut self, color: PixelColor) -> Result<(), SinkError> {
        self.buffer.fill(color);
        if self.config.auto_write {
            self.transmit()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.transmit()
    }

    fn auto_flush(&self) -> bool {
        self.config.auto_write
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ioctl_numbers() {
        // Values from <linux/spi/spidev.h> on x86_64/aarch64
        assert_eq!(spi_iow(1, 1), 0x4001_6b01);
        assert_eq!(spi_iow(3, 1), 0x4001_6b03);
        assert_eq!(spi_iow(4, 4), 0x4004_6b04);
    }

    #[test]
    fn test_encode_frame_layout() {
        let config = SpiConfig {
            pixels: 1,
            brightness: 1.0,
            bytes_per_pixel: 3,
            order: PixelOrder::Grb,
            ..SpiConfig::default()
        };
        let frame = encode_frame(&[PixelColor::rgb(0x00, 0xFF, 0x81)], &config);

        // 64 reset bytes then 3 channels * 8 SPI bytes
        assert_eq!(frame.len(), 64 + 24);
        assert!(frame[..64].iter().all(|&b| b == 0));

        let data = &frame[64..];
        // Green first: 0xFF -> all ones
        assert!(data[0..8].iter().all(|&b| b == BIT1));
        // Red: 0x00 -> all zeros
        assert!(data[8..16].iter().all(|&b| b == DEFAULT_BIT0));
        // Blue: 0x81 -> 1000_0001, MSB first
        assert_eq!(data[16], BIT1);
        assert!(data[17..23].iter().all(|&b| b == DEFAULT_BIT0));
        assert_eq!(data[23], BIT1);
    }

    #[test]
    fn test_encode_frame_respects_brightness_and_bit0() {
        let config = SpiConfig {
            pixels: 1,
            brightness: 0.0,
            bit0: 0b1100_0000,
            ..SpiConfig::default()
        };
        let frame = encode_frame(&[PixelColor::FULL], &config);
        assert_eq!(frame.len(), 64 + 32);
        assert!(frame[64..].iter().all(|&b| b == 0b1100_0000));
    }

    #[test]
    fn test_open_rejects_bad_bpp() {
        let config = SpiConfig {
            bytes_per_pixel: 5,
            ..SpiConfig::default()
        };
        assert!(matches!(
            SpiSink::open(config),
            Err(SinkError::InvalidConfig(_))
        ));
    }
}
