//! RGBW color value and the small amount of color math patterns need.

use std::fmt;

/// RGBW color. Channel order on the wire is decided by [`crate::PixelOrder`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PixelColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub w: u8,
}

impl PixelColor {
    pub const BLACK: Self = Self::new(0, 0, 0, 0);
    pub const RED: Self = Self::new(255, 0, 0, 0);
    pub const GREEN: Self = Self::new(0, 255, 0, 0);
    pub const BLUE: Self = Self::new(0, 0, 255, 0);
    /// All three color channels at full, white channel off
    pub const WHITE: Self = Self::new(255, 255, 255, 0);
    /// Dedicated white channel only
    pub const WARM_WHITE: Self = Self::new(0, 0, 0, 255);
    /// Every channel at full
    pub const FULL: Self = Self::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, w: u8) -> Self {
        Self { r, g, b, w }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, w: 0 }
    }

    /// Build from wide integers, clamping every channel into 0..=255.
    pub fn clamped(r: i64, g: i64, b: i64, w: i64) -> Self {
        let c = |v: i64| v.clamp(0, 255) as u8;
        Self::new(c(r), c(g), c(b), c(w))
    }

    /// Parse `"R,G,B"` or `"R,G,B,W"`.
    ///
    /// Three values leave white at 0, values past the fourth are ignored and
    /// every channel is clamped. Returns `None` for empty input, fewer than
    /// three values or anything that is not an integer.
    pub fn parse_csv(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() < 3 {
            return None;
        }
        let mut vals = [0i64; 4];
        for (slot, part) in vals.iter_mut().zip(parts.iter()) {
            *slot = part.parse().ok()?;
        }
        Some(Self::clamped(vals[0], vals[1], vals[2], vals[3]))
    }

    /// Create from HSV (h: 0-360, s: 0-1, v: 0-1). White channel is 0.
    pub fn from_hsv(h: f32, s: f32, v: f32) -> Self {
        let h = h.rem_euclid(360.0);
        let s = s.clamp(0.0, 1.0);
        let v = v.clamp(0.0, 1.0);
        let c = v * s;
        let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
        let m = v - c;
        let (r, g, b) = match (h / 60.0) as i32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        Self::rgb(
            ((r + m) * 255.0) as u8,
            ((g + m) * 255.0) as u8,
            ((b + m) * 255.0) as u8,
        )
    }

    /// Classic 0-255 color wheel: red -> green -> blue -> red.
    pub fn wheel(pos: u8) -> Self {
        let pos = pos as u16;
        match pos {
            0..=84 => Self::rgb((pos * 3) as u8, (255 - pos * 3) as u8, 0),
            85..=169 => {
                let p = pos - 85;
                Self::rgb((255 - p * 3) as u8, 0, (p * 3) as u8)
            }
            _ => {
                let p = pos - 170;
                Self::rgb(0, (p * 3) as u8, (255 - p * 3) as u8)
            }
        }
    }

    /// Scale the RGB channels by a factor in [0, 1]. White is kept as is.
    pub fn scale_rgb(self, factor: f32) -> Self {
        let f = factor.clamp(0.0, 1.0);
        Self {
            r: (self.r as f32 * f) as u8,
            g: (self.g as f32 * f) as u8,
            b: (self.b as f32 * f) as u8,
            w: self.w,
        }
    }

    /// Scale every channel by a factor in [0, 1].
    pub fn scale(self, factor: f32) -> Self {
        let f = factor.clamp(0.0, 1.0);
        Self {
            w: (self.w as f32 * f) as u8,
            ..self.scale_rgb(f)
        }
    }

    pub fn is_off(self) -> bool {
        self == Self::BLACK
    }
}

impl From<(u8, u8, u8)> for PixelColor {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::rgb(r, g, b)
    }
}

impl From<(u8, u8, u8, u8)> for PixelColor {
    fn from((r, g, b, w): (u8, u8, u8, u8)) -> Self {
        Self::new(r, g, b, w)
    }
}

impl fmt::Display for PixelColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.r, self.g, self.b, self.w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv() {
        assert_eq!(
            PixelColor::parse_csv("255,0,0"),
            Some(PixelColor::new(255, 0, 0, 0))
        );
        assert_eq!(
            PixelColor::parse_csv(" 1, 2 ,3,4 "),
            Some(PixelColor::new(1, 2, 3, 4))
        );
        assert_eq!(
            PixelColor::parse_csv("1,2,3,4,5"),
            Some(PixelColor::new(1, 2, 3, 4))
        );
        assert_eq!(PixelColor::parse_csv(""), None);
        assert_eq!(PixelColor::parse_csv("1,2"), None);
        assert_eq!(PixelColor::parse_csv("red,0,0"), None);
    }

    #[test]
    fn test_parse_csv_clamps() {
        assert_eq!(
            PixelColor::parse_csv("300,-5,128,999"),
            Some(PixelColor::new(255, 0, 128, 255))
        );
    }

    #[test]
    fn test_display_roundtrip() {
        let c = PixelColor::new(10, 20, 30, 40);
        assert_eq!(PixelColor::parse_csv(&c.to_string()), Some(c));
    }

    #[test]
    fn test_wheel_edges() {
        assert_eq!(PixelColor::wheel(0), PixelColor::rgb(0, 255, 0));
        assert_eq!(PixelColor::wheel(85), PixelColor::rgb(255, 0, 0));
        assert_eq!(PixelColor::wheel(170), PixelColor::rgb(0, 0, 255));
        assert_eq!(PixelColor::wheel(255), PixelColor::rgb(0, 255, 0));
    }

    #[test]
    fn test_from_hsv() {
        assert_eq!(PixelColor::from_hsv(0.0, 1.0, 1.0), PixelColor::RED);
        assert_eq!(PixelColor::from_hsv(120.0, 1.0, 1.0), PixelColor::GREEN);
        assert_eq!(PixelColor::from_hsv(240.0, 1.0, 1.0), PixelColor::BLUE);
        assert_eq!(PixelColor::from_hsv(0.0, 1.0, 0.0), PixelColor::BLACK);
        // Negative hue wraps instead of falling through
        assert_eq!(PixelColor::from_hsv(-240.0, 1.0, 1.0), PixelColor::GREEN);
    }

    #[test]
    fn test_scale_keeps_white_for_rgb_only() {
        let c = PixelColor::new(200, 100, 50, 80);
        assert_eq!(c.scale_rgb(0.5), PixelColor::new(100, 50, 25, 80));
        assert_eq!(c.scale(0.5), PixelColor::new(100, 50, 25, 40));
        assert_eq!(c.scale(2.0), c);
    }
}
