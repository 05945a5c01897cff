use booth_strip::PixelColor;
use keyframe::functions::EaseInOut;
// We need the EasingFunction trait to call .y()
use keyframe::EasingFunction;

use super::Pattern;

/// Whole strip breathing in and out once per pass.
#[derive(Debug, Clone)]
pub struct Pulse {
    color: PixelColor,
    steps: usize,
}

impl Pulse {
    pub fn new(color: PixelColor, steps: usize) -> Self {
        Self {
            color,
            steps: steps.max(1),
        }
    }

    /// Brightness 0.0-1.0 at `step`.
    ///
    /// Starts at half brightness, peaks a quarter of the way through and
    /// bottoms out at three quarters, with eased turnarounds.
    pub fn level(&self, step: usize) -> f64 {
        let phase = (step as f64 / self.steps as f64 + 0.25).rem_euclid(1.0);
        let triangle = if phase < 0.5 {
            phase * 2.0
        } else {
            2.0 - phase * 2.0
        };
        EaseInOut.y(triangle).clamp(0.0, 1.0)
    }
}

impl Pattern for Pulse {
    fn frames(&self, _len: usize) -> usize {
        self.steps
    }

    fn render(&mut self, frame: usize, leds: &mut [PixelColor]) {
        let color = self.color.scale_rgb(self.level(frame) as f32);
        leds.fill(color);
    }
}
