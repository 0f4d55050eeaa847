//! Streaming speech-to-text session abstraction

pub mod deepgram;

pub use deepgram::DeepgramLiveSession;

use std::time::Instant;

use async_trait::async_trait;

use crate::Result;
use crate::audio::AudioFrame;

/// A speech-recognition result
#[derive(Debug, Clone)]
pub struct Transcript {
    /// Recognized text
    pub text: String,
    /// Whether the backend marked this result as stable
    pub is_final: bool,
    /// When the result was observed
    pub observed_at: Instant,
}

impl Transcript {
    /// A finalized transcript observed now
    #[must_use]
    pub fn finalized(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            observed_at: Instant::now(),
        }
    }
}

/// A long-lived bidirectional recognition session
///
/// Accepts audio frames and asynchronously emits finalized transcripts
/// in receipt order. Implementations own their reconnect policy; the
/// caller only observes a gap in transcripts across a link drop, never
/// an error. `close` cancels any reconnect loop and is idempotent.
#[async_trait]
pub trait RecognitionSession: Send + Sync {
    /// Queue an audio frame for recognition
    ///
    /// Tolerates frames sent before the link is first established;
    /// they are buffered (and eventually dropped under backpressure)
    /// rather than failing.
    ///
    /// # Errors
    ///
    /// Returns error only once the session is closed.
    async fn send_audio(&self, frame: AudioFrame) -> Result<()>;

    /// The next finalized transcript, or `None` once the session is closed
    async fn next_transcript(&self) -> Option<Transcript>;

    /// Terminate the link and cancel the reconnect policy; idempotent
    async fn close(&self);
}
