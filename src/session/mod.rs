//! Per-session duplex pipeline coordination
//!
//! One [`SessionCoordinator`] owns one live session end to end: it
//! relays inbound audio into the recognition session (substituting
//! silence while echo suppression holds or no audio arrives, so the
//! link cadence never breaks), and processes finalized transcripts one
//! at a time through the completion and synthesis backends. All output
//! is written through a single sink channel, which preserves the
//! ordering between text fragments and audio payloads.

pub mod echo;
pub mod gate;

pub use echo::EchoSuppressor;
pub use gate::{CooldownState, TranscriptGate};

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tokio::sync::mpsc;

use crate::audio::{AudioFrame, AudioFrameSource};
use crate::config::PipelineConfig;
use crate::llm::CompletionBackend;
use crate::stt::RecognitionSession;
use crate::tts::SpeechSynthesizer;
use crate::Result;

/// Prefix marking a transcript announcement on the text channel
pub const TRANSCRIPT_PREFIX: &str = "__TRANSCRIPT__:";

/// One ordered message toward the session's client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkMessage {
    /// A transcript announcement or completion fragment
    Text(String),
    /// A synthesized audio payload
    Audio(Vec<u8>),
}

/// Coordinates one session's concurrent duties
pub struct SessionCoordinator {
    pipeline: PipelineConfig,
    recognizer: Arc<dyn RecognitionSession>,
    completion: Arc<dyn CompletionBackend>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    session_id: String,
}

impl SessionCoordinator {
    /// Wire a coordinator over the session's adapters
    #[must_use]
    pub fn new(
        pipeline: PipelineConfig,
        recognizer: Arc<dyn RecognitionSession>,
        completion: Arc<dyn CompletionBackend>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            pipeline,
            recognizer,
            completion,
            synthesizer,
            session_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Session ID for logging
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Run the session to completion
    ///
    /// Returns when the audio source closes, the recognition session
    /// ends, or the sink's client goes away. Whichever duty finishes
    /// first cancels the other, and the recognition session is closed
    /// (cancelling its reconnect loop) before returning.
    ///
    /// # Errors
    ///
    /// Returns error if a duty fails unrecoverably; partial failures
    /// (completion or synthesis errors) are absorbed per policy.
    pub async fn run(
        &self,
        source: Box<dyn AudioFrameSource>,
        sink: mpsc::Sender<SinkMessage>,
    ) -> Result<()> {
        let suppressor = Arc::new(EchoSuppressor::new(self.pipeline.echo_hold()));

        tracing::info!(session_id = %self.session_id, "session pipeline started");

        let result = tokio::select! {
            result = self.relay_audio(source, &suppressor) => result,
            result = self.process_transcripts(sink, &suppressor) => result,
        };

        // Teardown: cancel the recognition link and its reconnect loop.
        self.recognizer.close().await;

        tracing::info!(session_id = %self.session_id, "session pipeline ended");
        result
    }

    /// Inbound-audio relay duty
    ///
    /// Forwards frames to recognition, replacing them with silence
    /// while echo suppression holds; when no frame arrives within the
    /// silence timeout, a silence frame is substituted anyway so the
    /// recognition link's frame cadence never breaks.
    async fn relay_audio(
        &self,
        mut source: Box<dyn AudioFrameSource>,
        suppressor: &EchoSuppressor,
    ) -> Result<()> {
        loop {
            match tokio::time::timeout(self.pipeline.silence_timeout(), source.next_frame()).await {
                Ok(Some(frame)) => {
                    let frame = if suppressor.is_suppressed() {
                        AudioFrame::silence(frame.len())
                    } else {
                        frame
                    };
                    self.recognizer.send_audio(frame).await?;
                }
                Ok(None) => {
                    tracing::debug!(session_id = %self.session_id, "audio source closed");
                    return Ok(());
                }
                Err(_elapsed) => {
                    self.recognizer
                        .send_audio(AudioFrame::silence(self.pipeline.silence_frame_bytes))
                        .await?;
                }
            }
        }
    }

    /// Transcript-processing duty
    ///
    /// Strictly one transcript at a time: a transcript arriving while
    /// another is in flight waits in the recognition queue.
    async fn process_transcripts(
        &self,
        sink: mpsc::Sender<SinkMessage>,
        suppressor: &EchoSuppressor,
    ) -> Result<()> {
        let gate = TranscriptGate::new(self.pipeline.cooldown());
        let mut cooldown = CooldownState::default();
        let epoch = Instant::now();

        while let Some(transcript) = self.recognizer.next_transcript().await {
            let observed = transcript.observed_at.saturating_duration_since(epoch);
            if !gate.admit(&transcript.text, observed, &mut cooldown) {
                tracing::debug!(
                    session_id = %self.session_id,
                    text = %transcript.text,
                    "duplicate transcript ignored within cooldown"
                );
                continue;
            }

            tracing::info!(session_id = %self.session_id, text = %transcript.text, "processing transcript");

            if sink
                .send(SinkMessage::Text(format!(
                    "{TRANSCRIPT_PREFIX}{}",
                    transcript.text
                )))
                .await
                .is_err()
            {
                return Ok(());
            }

            let Some(response) = self.stream_completion(&transcript.text, &sink).await else {
                return Ok(());
            };

            if response.trim().is_empty() {
                continue;
            }

            match self.synthesizer.synthesize(&response).await {
                Ok(audio) if audio.is_empty() => {
                    tracing::debug!(session_id = %self.session_id, "synthesis produced no audio");
                }
                Ok(audio) => {
                    if sink.send(SinkMessage::Audio(audio)).await.is_err() {
                        return Ok(());
                    }
                    suppressor.arm();
                }
                Err(e) => {
                    // Text-only response; no echo window to arm since
                    // nothing will be played back.
                    tracing::warn!(
                        session_id = %self.session_id,
                        error = %e,
                        "synthesis failed, continuing without audio"
                    );
                }
            }
        }

        tracing::debug!(session_id = %self.session_id, "recognition session ended");
        Ok(())
    }

    /// Stream one completion, forwarding fragments and accumulating the
    /// full response
    ///
    /// A mid-stream failure ends the stream early; fragments already
    /// delivered stand as the final response. Returns `None` only when
    /// the sink's client has gone away.
    async fn stream_completion(
        &self,
        prompt: &str,
        sink: &mpsc::Sender<SinkMessage>,
    ) -> Option<String> {
        let mut response = String::new();

        let mut fragments = match self.completion.complete(prompt).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, error = %e, "completion call failed");
                return Some(response);
            }
        };

        while let Some(item) = fragments.next().await {
            match item {
                Ok(piece) => {
                    if sink.send(SinkMessage::Text(piece.clone())).await.is_err() {
                        return None;
                    }
                    response.push_str(&piece);
                }
                Err(e) => {
                    tracing::warn!(
                        session_id = %self.session_id,
                        error = %e,
                        delivered_chars = response.len(),
                        "completion stream failed, partial response stands"
                    );
                    break;
                }
            }
        }

        Some(response)
    }
}
