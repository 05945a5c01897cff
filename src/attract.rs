//! Attract sequence player.
//!
//! Plays an [`AttractSequence`] in a loop on a background thread while the
//! booth is idle. At most one session runs at a time: starting while one is
//! live does nothing. Stopping cancels the worker, waits a bounded time for
//! it to notice, then blanks the strip whether or not it exited.
//!
//! A pattern that fails, whether through a sink error or a panic in its
//! renderer, is logged and the player moves on to the next entry.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use booth_strip::{PixelSinkExt, SharedSink, SinkError};
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::cancel::CancelToken;
use crate::pattern::{play_pass, PassOutcome, Pattern, PatternId};
use crate::sequence::AttractSequence;

/// Pause between passes of the same entry
const IDLE_BETWEEN_PASSES: Duration = Duration::from_millis(10);

/// How often `stop` checks whether the worker has exited
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Default bound on how long `stop` waits for the worker
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(1);

struct AttractSession {
    cancel: CancelToken,
    handle: JoinHandle<()>,
    sink: SharedSink,
    sequence: Arc<AttractSequence>,
}

/// Owner of the (at most one) running attract session
#[derive(Default)]
pub struct AttractSequencer {
    session: Mutex<Option<AttractSession>>,
}

impl AttractSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start playing `sequence` on `sink`.
    ///
    /// Returns `false` without doing anything if a session is already live.
    pub fn start(
        &self,
        sink: SharedSink,
        sequence: Arc<AttractSequence>,
        step_delay: Duration,
        default_duration: Duration,
    ) -> bool {
        let mut slot = self.session.lock();
        if let Some(session) = slot.as_ref() {
            if !session.handle.is_finished() {
                return false;
            }
        }
        // Reap a worker that exited on its own
        if let Some(old) = slot.take() {
            if old.handle.join().is_err() {
                error!("Previous attract worker panicked");
            }
        }

        let cancel = CancelToken::new();
        let worker = Worker {
            sink: sink.clone(),
            sequence: sequence.clone(),
            cancel: cancel.clone(),
            step_delay,
            default_duration,
        };
        let handle = match thread::Builder::new()
            .name("attract".to_string())
            .spawn(move || worker.run())
        {
            Ok(handle) => handle,
            Err(e) => {
                error!("Failed to spawn attract worker: {}", e);
                return false;
            }
        };

        debug!("Attract started with {} entries", sequence.len());
        *slot = Some(AttractSession {
            cancel,
            handle,
            sink,
            sequence,
        });
        true
    }

    /// Stop the running session, if any, and blank the strip.
    ///
    /// Waits up to `timeout` for the worker to exit. A worker that is still
    /// busy after that is detached; it re-checks cancellation before every
    /// write, so it cannot paint over the cleared strip.
    pub fn stop(&self, timeout: Duration) -> Result<(), SinkError> {
        let mut slot = self.session.lock();
        let Some(session) = slot.take() else {
            return Ok(());
        };

        session.cancel.cancel();
        let deadline = Instant::now().checked_add(timeout);
        while !session.handle.is_finished() && deadline.map_or(true, |d| Instant::now() < d) {
            thread::sleep(STOP_POLL_INTERVAL);
        }
        if session.handle.is_finished() {
            if session.handle.join().is_err() {
                error!("Attract worker panicked");
            }
        } else {
            warn!("Attract worker still busy after {:?}; detaching", timeout);
        }

        debug!("Attract stopped");
        let mut sink = session.sink.lock();
        sink.clear()
    }

    /// True while a session's worker is alive
    pub fn is_running(&self) -> bool {
        self.session
            .lock()
            .as_ref()
            .is_some_and(|s| !s.handle.is_finished())
    }

    /// Sequence of the current session
    pub fn sequence(&self) -> Option<Arc<AttractSequence>> {
        self.session.lock().as_ref().map(|s| s.sequence.clone())
    }
}

impl Drop for AttractSequencer {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().as_ref() {
            session.cancel.cancel();
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panicked: {msg}")
    } else {
        "panicked".to_string()
    }
}

/// One [`play_pass`] with sink errors and pattern panics both reported as `Err`.
///
/// The sink lock does not poison, so the strip stays usable after a panic.
fn guarded_pass(
    pattern: &mut dyn Pattern,
    sink: &SharedSink,
    cancel: &CancelToken,
    step_delay: Duration,
) -> Result<PassOutcome, String> {
    match panic::catch_unwind(AssertUnwindSafe(|| {
        play_pass(pattern, sink, cancel, step_delay)
    })) {
        Ok(Ok(outcome)) => Ok(outcome),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

struct Worker {
    sink: SharedSink,
    sequence: Arc<AttractSequence>,
    cancel: CancelToken,
    step_delay: Duration,
    default_duration: Duration,
}

impl Worker {
    fn run(self) {
        debug!("Attract loop starting");
        let mut index = 0usize;
        while !self.cancel.is_cancelled() {
            self.play_entry(index);
            index = index.wrapping_add(1);
        }
        debug!("Attract loop exiting");
    }

    /// Replay one entry's pattern until its dwell time is used up.
    fn play_entry(&self, index: usize) {
        let (id, color, dwell) = match self.sequence.get_wrapping(index) {
            Some(entry) => {
                let id = PatternId::parse_from_str(&entry.pattern).unwrap_or_else(|| {
                    warn!("Unknown pattern '{}', using rainbow", entry.pattern);
                    PatternId::FALLBACK
                });
                (
                    id,
                    entry.color,
                    entry.duration.unwrap_or(self.default_duration),
                )
            }
            None => (PatternId::FALLBACK, None, self.default_duration),
        };

        let mut pattern = id.build(color, self.step_delay);
        let start = Instant::now();
        if dwell.is_zero() {
            // Nothing to play; don't spin through the list
            self.cancel.sleep(IDLE_BETWEEN_PASSES);
            return;
        }

        while !self.cancel.is_cancelled() && start.elapsed() < dwell {
            let pass = guarded_pass(pattern.as_mut(), &self.sink, &self.cancel, self.step_delay);
            if let Err(e) = pass {
                error!("Pattern '{}' failed: {}", id, e);
                self.cancel.sleep(IDLE_BETWEEN_PASSES);
                return;
            }
            if start.elapsed() < dwell {
                self.cancel.sleep(IDLE_BETWEEN_PASSES);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use booth_strip::{shared, MemorySink, PixelColor};

    /// Log writer backed by a shared buffer
    #[derive(Clone, Default)]
    struct LogCapture(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capture_logs(f: impl FnOnce()) -> String {
        let capture = LogCapture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_target(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = capture.0.lock().clone();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Draws frame 0, then blows up
    struct Exploding;

    impl Pattern for Exploding {
        fn frames(&self, _len: usize) -> usize {
            3
        }

        fn render(&mut self, frame: usize, leds: &mut [PixelColor]) {
            if frame == 1 {
                panic!("render blew up");
            }
            leds.fill(PixelColor::BLUE);
        }
    }

    #[test]
    fn test_stop_without_session_is_noop() {
        let sequencer = AttractSequencer::new();
        assert!(!sequencer.is_running());
        assert!(sequencer.stop(Duration::from_millis(10)).is_ok());
    }

    #[test]
    fn test_start_then_stop() {
        let sink = shared(MemorySink::new(8));
        let sequencer = AttractSequencer::new();
        let sequence = Arc::new(AttractSequence::parse("rainbow||1"));

        assert!(sequencer.start(
            sink.clone(),
            sequence.clone(),
            Duration::from_millis(1),
            Duration::from_secs(1)
        ));
        assert!(sequencer.is_running());
        assert_eq!(sequencer.sequence(), Some(sequence));

        thread::sleep(Duration::from_millis(30));
        sequencer.stop(DEFAULT_STOP_TIMEOUT).unwrap();
        assert!(!sequencer.is_running());
        assert!(sequencer.sequence().is_none());
    }

    #[test]
    fn test_unknown_pattern_warns_and_plays_fallback() {
        let strip = Arc::new(Mutex::new(MemorySink::new(4)));
        let sink: SharedSink = strip.clone();
        let worker = Worker {
            sink,
            sequence: Arc::new(AttractSequence::parse("strobe||0.01")),
            cancel: CancelToken::new(),
            step_delay: Duration::from_millis(1),
            default_duration: Duration::from_secs(1),
        };

        let logs = capture_logs(|| worker.play_entry(0));
        assert!(
            logs.contains("Unknown pattern 'strobe', using rainbow"),
            "logs: {logs}"
        );
        assert_eq!(strip.lock().set_writes()[0], (0, PixelColor::wheel(0)));
    }

    #[test]
    fn test_panicking_pattern_is_contained() {
        let strip = Arc::new(Mutex::new(MemorySink::new(4)));
        let sink: SharedSink = strip.clone();

        let result = guarded_pass(
            &mut Exploding,
            &sink,
            &CancelToken::new(),
            Duration::from_millis(1),
        );
        let message = result.unwrap_err();
        assert!(message.contains("render blew up"), "{message}");

        // Frame 0 made it out and the strip is still usable
        assert_eq!(strip.lock().flush_count(), 1);
        sink.lock().clear().unwrap();
        assert!(strip.lock().pixels().iter().all(|c| c.is_off()));
    }

    #[test]
    fn test_sink_error_reported_by_guarded_pass() {
        let strip = Arc::new(Mutex::new(MemorySink::new(2)));
        strip.lock().fail_next_flushes(1);
        let sink: SharedSink = strip.clone();

        let result = guarded_pass(
            &mut Exploding,
            &sink,
            &CancelToken::new(),
            Duration::from_millis(1),
        );
        assert!(result.unwrap_err().contains("flush failed"));
    }
}
