use booth_strip::PixelColor;

use super::Pattern;

/// Paint pixels one at a time from the start of the strip.
#[derive(Debug, Clone)]
pub struct ColorWipe {
    color: PixelColor,
}

impl ColorWipe {
    pub fn new(color: PixelColor) -> Self {
        Self { color }
    }
}

impl Pattern for ColorWipe {
    fn frames(&self, len: usize) -> usize {
        len
    }

    fn render(&mut self, frame: usize, leds: &mut [PixelColor]) {
        if let Some(led) = leds.get_mut(frame) {
            *led = self.color;
        }
    }
}
