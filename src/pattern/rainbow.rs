use booth_strip::PixelColor;

use super::Pattern;

/// Color wheel spread across the strip, rotated one step per frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rainbow;

impl Pattern for Rainbow {
    fn frames(&self, _len: usize) -> usize {
        256
    }

    fn render(&mut self, frame: usize, leds: &mut [PixelColor]) {
        let len = leds.len();
        for (i, led) in leds.iter_mut().enumerate() {
            let pos = (i * 256 / len) + frame;
            *led = PixelColor::wheel((pos & 255) as u8);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rainbow_spreads_wheel() {
        let mut leds = vec![PixelColor::BLACK; 4];
        Rainbow.render(0, &mut leds);
        assert_eq!(leds[0], PixelColor::wheel(0));
        assert_eq!(leds[1], PixelColor::wheel(64));
        assert_eq!(leds[3], PixelColor::wheel(192));

        Rainbow.render(255, &mut leds);
        assert_eq!(leds[1], PixelColor::wheel(63));
    }
}
