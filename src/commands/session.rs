//! Long-running commands: the stdin event loop and the attract player.

use std::io::BufRead;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use booth_lights::attract::{AttractSequencer, DEFAULT_STOP_TIMEOUT};
use booth_lights::config::seconds;
use booth_lights::hooks::{BoothEvent, BoothLights};
use booth_lights::sequence::AttractSequence;
use tracing::{debug, info, warn};

use super::{setup_interrupt_handler, CommandResult, Context};

/// How often the event loop checks for Ctrl-C while waiting on stdin
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Parse one line of the event protocol. Blank lines and `#` comments are skipped.
fn parse_line(line: &str) -> Option<BoothEvent> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    match line.parse() {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("{}", e);
            None
        }
    }
}

/// Drive the lights from booth events on stdin.
pub fn run(ctx: &Context) -> CommandResult {
    let sink = ctx.open_sink()?;
    let lights = BoothLights::from_config(&ctx.config, sink);
    let interrupted = setup_interrupt_handler();

    // stdin blocks, so read it on its own thread and poll the channel
    let (tx, rx) = mpsc::channel::<String>();
    thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })?;

    lights.startup();
    info!("Waiting for booth events on stdin");

    while !interrupted.is_cancelled() {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(line) => {
                if let Some(event) = parse_line(&line) {
                    lights.dispatch(event);
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("stdin closed");
                break;
            }
        }
    }

    lights.cleanup();
    info!("Booth lights off");
    Ok(())
}

/// Play the attract sequence until Ctrl-C.
pub fn attract(ctx: &Context, sequence: Option<&str>, speed: Option<f64>) -> CommandResult {
    let sequence = AttractSequence::parse(sequence.unwrap_or(&ctx.config.attract_sequence));
    let step_delay = speed.map(seconds).unwrap_or_else(|| ctx.config.attract_speed());
    let sink = ctx.open_sink()?;
    let interrupted = setup_interrupt_handler();

    info!("Playing \"{}\" (Ctrl-C to stop)", sequence);
    let sequencer = AttractSequencer::new();
    sequencer.start(
        sink,
        Arc::new(sequence),
        step_delay,
        ctx.config.attract_default_duration(),
    );

    while !interrupted.sleep(Duration::from_secs(3600)) {}

    sequencer.stop(DEFAULT_STOP_TIMEOUT)?;
    Ok(())
}
