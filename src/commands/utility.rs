//! Utility commands: hardware color check and pattern listing.

use booth_lights::config::seconds;
use booth_lights::pattern::PatternId;
use booth_strip::{PixelColor, PixelSinkExt};

use super::{setup_interrupt_handler, CommandResult, Context};

const TEST_COLORS: &[(&str, PixelColor)] = &[
    ("red", PixelColor::RED),
    ("green", PixelColor::GREEN),
    ("blue", PixelColor::BLUE),
    ("white", PixelColor::WARM_WHITE),
];

/// Fill the strip with each test color in turn.
pub fn test_colors(ctx: &Context, hold: f64, once: bool) -> CommandResult {
    let hold = seconds(hold);
    let sink = ctx.open_sink()?;
    let interrupted = setup_interrupt_handler();

    'cycle: loop {
        for (name, color) in TEST_COLORS {
            println!("{name}");
            sink.lock().fill_and_show(*color)?;
            if interrupted.sleep(hold) {
                break 'cycle;
            }
        }
        if once {
            break;
        }
    }

    sink.lock().clear()?;
    Ok(())
}

/// List every pattern name usable in `attract_sequence`.
pub fn patterns() -> CommandResult {
    println!("{:<16} Description", "Name");
    println!("{}", "-".repeat(60));
    for id in PatternId::ALL {
        let marker = if *id == PatternId::FALLBACK {
            " (fallback)"
        } else {
            ""
        };
        println!("{:<16} {}{}", id.as_str(), id.describe(), marker);
    }
    Ok(())
}
