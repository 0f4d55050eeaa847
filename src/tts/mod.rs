//! Speech synthesis abstraction

pub mod elevenlabs;

pub use elevenlabs::ElevenLabsSynthesizer;

use async_trait::async_trait;

use crate::Result;

/// Synthesizes a complete text into an encoded audio payload
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize text into audio bytes
    ///
    /// Empty or whitespace-only input yields an empty payload rather
    /// than an error: there is simply no audio to produce.
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails, including when the configured
    /// voice cannot be resolved. Callers treat this as recoverable.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}
