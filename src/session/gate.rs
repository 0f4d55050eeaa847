//! Duplicate-transcript cooldown gate
//!
//! Streaming STT backends frequently re-emit a near-identical
//! finalization while the speaker pauses; without this gate the
//! pipeline would issue duplicate completion and synthesis calls.

use std::time::Duration;

/// Cooldown tracking for one session
///
/// Owned exclusively by the transcript-processing duty; `last_accepted_at`
/// is monotonically non-decreasing within a session.
#[derive(Debug, Clone, Default)]
pub struct CooldownState {
    last_normalized: String,
    last_accepted_at: Option<Duration>,
}

/// Pure accept/reject policy for finalized transcripts
#[derive(Debug, Clone, Copy)]
pub struct TranscriptGate {
    cooldown: Duration,
}

impl TranscriptGate {
    /// Create a gate with the given cooldown interval
    #[must_use]
    pub const fn new(cooldown: Duration) -> Self {
        Self { cooldown }
    }

    /// Decide whether a transcript should be processed
    ///
    /// `now` is the time since the session epoch. Accepts iff the
    /// normalized text differs from the last accepted transcript, or
    /// the cooldown has elapsed since that acceptance. On acceptance
    /// the state is updated; on rejection it is left untouched.
    pub fn admit(&self, text: &str, now: Duration, state: &mut CooldownState) -> bool {
        let normalized = normalize(text);

        let duplicate_in_cooldown = state.last_accepted_at.is_some_and(|accepted_at| {
            normalized == state.last_normalized
                && now.saturating_sub(accepted_at) < self.cooldown
        });

        if duplicate_in_cooldown {
            return false;
        }

        state.last_normalized = normalized;
        state.last_accepted_at = Some(now);
        true
    }
}

/// Normalize transcript text for equality comparison
fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOLDOWN: Duration = Duration::from_millis(2500);

    fn gate() -> TranscriptGate {
        TranscriptGate::new(COOLDOWN)
    }

    #[test]
    fn first_transcript_is_accepted() {
        let mut state = CooldownState::default();
        assert!(gate().admit("hello there", Duration::ZERO, &mut state));
    }

    #[test]
    fn duplicate_within_cooldown_is_rejected() {
        let mut state = CooldownState::default();
        assert!(gate().admit("hello there", Duration::ZERO, &mut state));
        assert!(!gate().admit("hello there", Duration::from_millis(1000), &mut state));
    }

    #[test]
    fn normalization_covers_case_and_whitespace() {
        let mut state = CooldownState::default();
        assert!(gate().admit("hello there", Duration::ZERO, &mut state));
        assert!(!gate().admit("  HELLO THERE  ", Duration::from_millis(1000), &mut state));
    }

    #[test]
    fn duplicate_after_cooldown_is_accepted() {
        let mut state = CooldownState::default();
        assert!(gate().admit("hello there", Duration::ZERO, &mut state));
        assert!(gate().admit("hello there", Duration::from_millis(2500), &mut state));
    }

    #[test]
    fn different_text_is_accepted_at_any_delta() {
        let mut state = CooldownState::default();
        assert!(gate().admit("hello there", Duration::ZERO, &mut state));
        assert!(gate().admit("what time is it", Duration::from_millis(1), &mut state));
    }

    #[test]
    fn rejection_leaves_state_untouched() {
        let mut state = CooldownState::default();
        assert!(gate().admit("hello", Duration::ZERO, &mut state));
        // Rejected at t=1s; the cooldown anchor stays at t=0
        assert!(!gate().admit("hello", Duration::from_millis(1000), &mut state));
        // So at t=2.5s from the original acceptance, the duplicate passes
        assert!(gate().admit("hello", Duration::from_millis(2500), &mut state));
    }

    #[test]
    fn acceptance_rearms_the_cooldown() {
        let mut state = CooldownState::default();
        assert!(gate().admit("hello", Duration::ZERO, &mut state));
        assert!(gate().admit("hello", Duration::from_millis(2500), &mut state));
        // Re-acceptance at t=2.5s re-anchors the window
        assert!(!gate().admit("hello", Duration::from_millis(3000), &mut state));
    }
}
