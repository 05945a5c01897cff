use std::time::Duration;

use booth_strip::PixelColor;

use super::Pattern;

/// Random twinkles: every frame each pixel lights with probability `chance`.
#[derive(Debug, Clone)]
pub struct Sparkle {
    color: PixelColor,
    chance: f32,
    rounds: usize,
    rng: fastrand::Rng,
}

impl Sparkle {
    /// One pass lasts roughly `duration` at the given `step_delay`.
    pub fn new(color: PixelColor, chance: f32, duration: Duration, step_delay: Duration) -> Self {
        let step = step_delay.as_secs_f64().max(0.001);
        let rounds = ((duration.as_secs_f64() / step) as usize).max(1);
        Self {
            color,
            chance: chance.clamp(0.0, 1.0),
            rounds,
            rng: fastrand::Rng::new(),
        }
    }

    /// Use a fixed seed so the twinkles are reproducible.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self
    }
}

impl Pattern for Sparkle {
    fn frames(&self, _len: usize) -> usize {
        self.rounds
    }

    fn render(&mut self, _frame: usize, leds: &mut [PixelColor]) {
        for led in leds.iter_mut() {
            *led = if self.rng.f32() < self.chance {
                self.color
            } else {
                PixelColor::BLACK
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparkle_rounds_follow_step_delay() {
        let sparkle = Sparkle::new(
            PixelColor::WHITE,
            0.06,
            Duration::from_millis(1500),
            Duration::from_millis(20),
        );
        assert_eq!(sparkle.frames(24), 75);

        let fast = Sparkle::new(PixelColor::WHITE, 0.06, Duration::from_secs(1), Duration::ZERO);
        assert_eq!(fast.frames(24), 1000);
    }

    #[test]
    fn test_sparkle_chance_extremes() {
        let mut leds = vec![PixelColor::RED; 16];
        let mut never = Sparkle::new(PixelColor::WHITE, 0.0, Duration::ZERO, Duration::ZERO);
        never.render(0, &mut leds);
        assert!(leds.iter().all(|c| c.is_off()));

        let mut always =
            Sparkle::new(PixelColor::WHITE, 1.0, Duration::ZERO, Duration::ZERO).with_seed(7);
        always.render(0, &mut leds);
        assert!(leds.iter().all(|c| *c == PixelColor::WHITE));
    }
}
