use booth_strip::PixelColor;

use super::Pattern;

/// Single bright head running off the end of the strip, trailing a linear fade.
#[derive(Debug, Clone)]
pub struct Comet {
    color: PixelColor,
    tail: usize,
}

impl Comet {
    pub fn new(color: PixelColor, tail: usize) -> Self {
        Self {
            color,
            tail: tail.max(1),
        }
    }
}

impl Pattern for Comet {
    fn frames(&self, len: usize) -> usize {
        len + self.tail
    }

    fn render(&mut self, frame: usize, leds: &mut [PixelColor]) {
        for (i, led) in leds.iter_mut().enumerate() {
            *led = match frame.checked_sub(i) {
                Some(distance) if distance < self.tail => {
                    let level = 1.0 - distance as f32 / self.tail as f32;
                    self.color.scale_rgb(level)
                }
                _ => PixelColor::BLACK,
            };
        }
    }
}
