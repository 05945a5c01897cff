use std::f64::consts::TAU;
use std::time::Duration;

use booth_strip::PixelColor;

use super::{hsv_unit, Pattern};

/// Hue gradient covering 60% of the wheel, rotated through a full turn per pass.
///
/// Only the white channel of the configured color is used; the hues come
/// from the gradient itself.
#[derive(Debug, Clone)]
pub struct Gradient {
    white: u8,
    shift_step: usize,
}

impl Gradient {
    pub fn new(color: PixelColor, step_delay: Duration) -> Self {
        let shift_step = ((6.0 * step_delay.as_secs_f64().max(0.001)) as usize).max(1);
        Self {
            white: color.w,
            shift_step,
        }
    }
}

impl Pattern for Gradient {
    fn frames(&self, _len: usize) -> usize {
        360usize.div_ceil(self.shift_step)
    }

    fn render(&mut self, frame: usize, leds: &mut [PixelColor]) {
        let len = leds.len().max(1) as f64;
        let shift = (frame * self.shift_step) as f64 / 360.0;
        for (i, led) in leds.iter_mut().enumerate() {
            let h = (i as f64 / len) * 0.6 + shift;
            *led = PixelColor {
                w: self.white,
                ..hsv_unit(h, 0.8, 0.7)
            };
        }
    }
}

/// Blue-green hues swaying along the strip.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ocean;

impl Pattern for Ocean {
    fn frames(&self, _len: usize) -> usize {
        360
    }

    fn render(&mut self, frame: usize, leds: &mut [PixelColor]) {
        let len = leds.len().max(1) as f64;
        for (i, led) in leds.iter_mut().enumerate() {
            let wave = ((i as f64 / len) * TAU + frame as f64 / 20.0).sin();
            *led = hsv_unit(0.55 + 0.05 * wave, 0.8, 0.6);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gradient_frames() {
        let slow = Gradient::new(PixelColor::BLACK, Duration::from_millis(20));
        assert_eq!(slow.frames(24), 360);
        let coarse = Gradient::new(PixelColor::BLACK, Duration::from_secs(1));
        assert_eq!(coarse.frames(24), 60);
    }

    #[test]
    fn test_gradient_keeps_white_channel() {
        let mut gradient = Gradient::new(PixelColor::new(0, 128, 255, 42), Duration::ZERO);
        let mut leds = vec![PixelColor::BLACK; 5];
        gradient.render(10, &mut leds);
        assert!(leds.iter().all(|c| c.w == 42 && !c.is_off()));
    }

    #[test]
    fn test_ocean_stays_blue_green() {
        let mut leds = vec![PixelColor::BLACK; 12];
        for frame in [0, 90, 200] {
            Ocean.render(frame, &mut leds);
            for c in &leds {
                assert!(c.b > c.r && c.g > c.r, "{c}");
            }
        }
    }
}
