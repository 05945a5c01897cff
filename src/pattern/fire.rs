use booth_strip::PixelColor;

use super::{hsv_unit, Pattern};

/// Frames per pass. The heat map carries over between passes, so the
/// flicker is continuous while the attract player keeps replaying it.
const PASS_FRAMES: usize = 50;

/// Cooling embers with occasional random sparks.
#[derive(Debug, Clone)]
pub struct Fire {
    cooling: f64,
    sparking: f64,
    heat: Vec<f64>,
    rng: fastrand::Rng,
}

impl Fire {
    pub fn new(cooling: f64, sparking: f64) -> Self {
        Self {
            cooling: cooling.clamp(0.0, 1.0),
            sparking: sparking.clamp(0.0, 1.0),
            heat: Vec::new(),
            rng: fastrand::Rng::new(),
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self
    }

    fn step(&mut self) {
        for h in self.heat.iter_mut() {
            *h = (*h * self.cooling - self.rng.f64() * 0.02).max(0.0);
        }
        if !self.heat.is_empty() && self.rng.f64() < self.sparking {
            let idx = self.rng.usize(..self.heat.len());
            let boost = 0.4 + self.rng.f64() * 0.5;
            self.heat[idx] = (self.heat[idx] + boost).min(1.0);
        }
    }

    fn color_for(heat: f64) -> PixelColor {
        if heat <= 0.0 {
            return PixelColor::BLACK;
        }
        hsv_unit(0.02 + 0.02 * heat, heat.min(1.0), (0.6 + heat * 0.4).min(1.0))
    }
}

impl Pattern for Fire {
    fn frames(&self, _len: usize) -> usize {
        PASS_FRAMES
    }

    fn render(&mut self, _frame: usize, leds: &mut [PixelColor]) {
        if self.heat.len() != leds.len() {
            self.heat = vec![0.0; leds.len()];
        }
        self.step();
        for (led, &heat) in leds.iter_mut().zip(&self.heat) {
            *led = Self::color_for(heat);
        }
    }
}
