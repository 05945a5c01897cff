//! Pixel channel order and wire encoding.

use std::fmt;
use std::str::FromStr;

use crate::{PixelColor, SinkError};

/// Single color channel as it appears on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    R,
    G,
    B,
    W,
}

impl Channel {
    fn pick(self, color: PixelColor) -> u8 {
        match self {
            Channel::R => color.r,
            Channel::G => color.g,
            Channel::B => color.b,
            Channel::W => color.w,
        }
    }
}

/// Order in which a strip expects the color channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelOrder {
    Rgb,
    Grb,
    Brg,
    Bgr,
    Rbg,
    Gbr,
    #[default]
    Rgbw,
    Grbw,
}

impl PixelOrder {
    pub const ALL: &'static [PixelOrder] = &[
        PixelOrder::Rgb,
        PixelOrder::Grb,
        PixelOrder::Brg,
        PixelOrder::Bgr,
        PixelOrder::Rbg,
        PixelOrder::Gbr,
        PixelOrder::Rgbw,
        PixelOrder::Grbw,
    ];

    /// Channels in wire order
    pub fn channels(self) -> &'static [Channel] {
        use Channel::*;
        match self {
            PixelOrder::Rgb => &[R, G, B],
            PixelOrder::Grb => &[G, R, B],
            PixelOrder::Brg => &[B, R, G],
            PixelOrder::Bgr => &[B, G, R],
            PixelOrder::Rbg => &[R, B, G],
            PixelOrder::Gbr => &[G, B, R],
            PixelOrder::Rgbw => &[R, G, B, W],
            PixelOrder::Grbw => &[G, R, B, W],
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        self.channels().len()
    }

    pub fn has_white(self) -> bool {
        self.bytes_per_pixel() == 4
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            PixelOrder::Rgb => "RGB",
            PixelOrder::Grb => "GRB",
            PixelOrder::Brg => "BRG",
            PixelOrder::Bgr => "BGR",
            PixelOrder::Rbg => "RBG",
            PixelOrder::Gbr => "GBR",
            PixelOrder::Rgbw => "RGBW",
            PixelOrder::Grbw => "GRBW",
        }
    }

    /// Append the wire bytes for one pixel, scaled by `brightness` (0.0-1.0).
    ///
    /// `bytes_per_pixel` may be wider than the order (an RGB order on a 4 byte
    /// strip pads white with 0) or narrower (white is dropped).
    pub fn encode(
        self,
        color: PixelColor,
        brightness: f32,
        bytes_per_pixel: usize,
        out: &mut Vec<u8>,
    ) {
        let color = color.scale(brightness);
        let channels = self.channels();
        for slot in 0..bytes_per_pixel {
            let value = channels.get(slot).map(|ch| ch.pick(color)).unwrap_or(0);
            out.push(value);
        }
    }
}

impl FromStr for PixelOrder {
    type Err = SinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        PixelOrder::ALL
            .iter()
            .copied()
            .find(|o| o.as_str() == upper)
            .ok_or_else(|| SinkError::InvalidConfig(format!("unknown pixel order: \"{s}\"")))
    }
}

impl fmt::Display for PixelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("grbw".parse::<PixelOrder>().unwrap(), PixelOrder::Grbw);
        assert_eq!(" RGB ".parse::<PixelOrder>().unwrap(), PixelOrder::Rgb);
        assert!("RGBWX".parse::<PixelOrder>().is_err());
    }

    #[test]
    fn test_encode_grbw() {
        let mut out = Vec::new();
        PixelOrder::Grbw.encode(PixelColor::new(1, 2, 3, 4), 1.0, 4, &mut out);
        assert_eq!(out, vec![2, 1, 3, 4]);
    }

    #[test]
    fn test_encode_applies_brightness() {
        let mut out = Vec::new();
        PixelOrder::Rgb.encode(PixelColor::new(200, 100, 0, 50), 0.5, 3, &mut out);
        assert_eq!(out, vec![100, 50, 0]);
    }

    #[test]
    fn test_encode_pads_and_truncates() {
        let mut out = Vec::new();
        PixelOrder::Rgb.encode(PixelColor::new(1, 2, 3, 4), 1.0, 4, &mut out);
        assert_eq!(out, vec![1, 2, 3, 0]);

        out.clear();
        PixelOrder::Rgbw.encode(PixelColor::new(1, 2, 3, 4), 1.0, 3, &mut out);
        assert_eq!(out, vec![1, 2, 3]);
    }
}
