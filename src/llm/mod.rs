//! Streaming completion backend abstraction

pub mod groq;

pub use groq::GroqCompletion;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::Result;

/// An ordered, finite stream of completion text fragments
///
/// Terminates normally at end-of-response or abnormally with an error
/// item; fragments yielded before the error remain valid output.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A text-in, token-stream-out completion call
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Start a completion for the given prompt
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be started at all; errors
    /// after the first fragment arrive through the stream instead.
    async fn complete(&self, prompt: &str) -> Result<FragmentStream>;
}
