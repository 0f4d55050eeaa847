//! Shared test doubles for the session pipeline

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use cadence_gateway::audio::AudioFrame;
use cadence_gateway::config::PipelineConfig;
use cadence_gateway::llm::{CompletionBackend, FragmentStream};
use cadence_gateway::session::SinkMessage;
use cadence_gateway::stt::{RecognitionSession, Transcript};
use cadence_gateway::tts::SpeechSynthesizer;
use cadence_gateway::{Error, Result};

/// Recognition session fed by the test, recording forwarded frames
pub struct FakeRecognizer {
    transcript_rx: Mutex<mpsc::Receiver<Transcript>>,
    pub frames: Mutex<Vec<AudioFrame>>,
    pub closed: AtomicBool,
}

impl FakeRecognizer {
    pub fn new() -> (mpsc::Sender<Transcript>, Arc<Self>) {
        let (tx, rx) = mpsc::channel(16);
        let recognizer = Arc::new(Self {
            transcript_rx: Mutex::new(rx),
            frames: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        });
        (tx, recognizer)
    }
}

#[async_trait]
impl RecognitionSession for FakeRecognizer {
    async fn send_audio(&self, frame: AudioFrame) -> Result<()> {
        self.frames.lock().await.push(frame);
        Ok(())
    }

    async fn next_transcript(&self) -> Option<Transcript> {
        self.transcript_rx.lock().await.recv().await
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Completion backend yielding scripted fragment sequences
pub struct FakeCompletion {
    scripts: Mutex<VecDeque<Vec<Result<String>>>>,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeCompletion {
    pub fn new(scripts: Vec<Vec<Result<String>>>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// One response repeated for every prompt
    pub fn fragments(fragments: &[&str]) -> Vec<Result<String>> {
        fragments.iter().map(|f| Ok((*f).to_string())).collect()
    }
}

#[async_trait]
impl CompletionBackend for FakeCompletion {
    async fn complete(&self, prompt: &str) -> Result<FragmentStream> {
        self.prompts.lock().await.push(prompt.to_string());
        let script = self
            .scripts
            .lock()
            .await
            .pop_front()
            .unwrap_or_default();
        Ok(Box::pin(futures::stream::iter(script)))
    }
}

/// Synthesizer returning a fixed payload or a scripted failure
pub struct FakeSynthesizer {
    payload: Option<Vec<u8>>,
    pub texts: Mutex<Vec<String>>,
}

impl FakeSynthesizer {
    pub fn with_payload(payload: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            payload: Some(payload),
            texts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            payload: None,
            texts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        self.texts.lock().await.push(text.to_string());
        match &self.payload {
            Some(payload) => Ok(payload.clone()),
            None => Err(Error::Tts("synthesis unavailable".to_string())),
        }
    }
}

/// Pipeline timing tuned so tests run fast
pub fn fast_pipeline() -> PipelineConfig {
    PipelineConfig {
        silence_timeout_ms: 20,
        ..PipelineConfig::default()
    }
}

/// Drain the sink until it closes or `deadline` elapses
pub async fn collect_sink(
    rx: &mut mpsc::Receiver<SinkMessage>,
    expected: usize,
    deadline: Duration,
) -> Vec<SinkMessage> {
    let mut messages = Vec::new();
    let end = tokio::time::Instant::now() + deadline;

    while messages.len() < expected {
        match tokio::time::timeout_at(end, rx.recv()).await {
            Ok(Some(message)) => messages.push(message),
            Ok(None) | Err(_) => break,
        }
    }

    messages
}
