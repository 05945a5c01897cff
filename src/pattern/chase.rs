use booth_strip::PixelColor;

use super::Pattern;

/// Every third pixel lit, shifting by one each frame.
#[derive(Debug, Clone)]
pub struct TheaterChase {
    color: PixelColor,
    iterations: usize,
    lit: Vec<usize>,
}

impl TheaterChase {
    pub fn new(color: PixelColor, iterations: usize) -> Self {
        Self {
            color,
            iterations,
            lit: Vec::new(),
        }
    }
}

impl Pattern for TheaterChase {
    fn frames(&self, _len: usize) -> usize {
        self.iterations * 3
    }

    fn render(&mut self, frame: usize, leds: &mut [PixelColor]) {
        let len = leds.len();
        // Turn off what the previous frame lit; untouched pixels keep their color
        for &i in &self.lit {
            if let Some(led) = leds.get_mut(i) {
                *led = PixelColor::BLACK;
            }
        }
        self.lit.clear();
        if len == 0 {
            return;
        }

        let offset = frame % 3;
        for i in (0..len).step_by(3) {
            let index = (i + offset) % len;
            leds[index] = self.color;
            self.lit.push(index);
        }
    }
}

/// Bands from a small palette sliding along the strip.
#[derive(Debug, Clone)]
pub struct ChaseMulti {
    palette: Vec<PixelColor>,
    spacing: usize,
    reps: usize,
}

impl ChaseMulti {
    pub fn new(palette: Vec<PixelColor>, spacing: usize, reps: usize) -> Self {
        Self {
            palette,
            spacing: spacing.max(1),
            reps,
        }
    }
}

impl Pattern for ChaseMulti {
    fn frames(&self, len: usize) -> usize {
        len * self.reps
    }

    fn render(&mut self, frame: usize, leds: &mut [PixelColor]) {
        let len = leds.len();
        let colors = self.palette.len();
        if len == 0 || colors == 0 {
            return;
        }
        let pos = frame % len;
        for (i, led) in leds.iter_mut().enumerate() {
            *led = if ((i + pos) / self.spacing) % colors == 0 {
                self.palette[(i / self.spacing) % colors]
            } else {
                PixelColor::BLACK
            };
        }
    }
}
