//! Echo suppression window
//!
//! After synthesized audio is emitted, inbound audio is suppressed for
//! a fixed window so the assistant's own playback, acoustically coupled
//! back into the microphone, cannot re-trigger recognition.
//!
//! The window timestamp is written by exactly one duty (transcript
//! processing) and read by exactly one other (audio relay), so an
//! atomic millisecond counter relative to a session epoch is all the
//! synchronization required.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Whether inbound audio is suppressed at `now`
#[must_use]
pub fn is_suppressed(now: Duration, suppress_until: Duration) -> bool {
    now < suppress_until
}

/// The window produced by arming suppression at `now`
#[must_use]
pub const fn armed_until(now: Duration, hold: Duration) -> Duration {
    now.saturating_add(hold)
}

/// Shared echo-suppression window for one session
#[derive(Debug)]
pub struct EchoSuppressor {
    epoch: Instant,
    hold: Duration,
    suppress_until_ms: AtomicU64,
}

impl EchoSuppressor {
    /// Create an unarmed suppressor holding for `hold` after each arm
    #[must_use]
    pub fn new(hold: Duration) -> Self {
        Self {
            epoch: Instant::now(),
            hold,
            suppress_until_ms: AtomicU64::new(0),
        }
    }

    /// Whether inbound audio should currently be replaced with silence
    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        let now = self.epoch.elapsed();
        let until = Duration::from_millis(self.suppress_until_ms.load(Ordering::Acquire));
        is_suppressed(now, until)
    }

    /// Arm the window; called once per completed synthesis
    pub fn arm(&self) {
        let until = armed_until(self.epoch.elapsed(), self.hold);
        #[allow(clippy::cast_possible_truncation)]
        self.suppress_until_ms
            .store(until.as_millis() as u64, Ordering::Release);
    }
}
