//! ElevenLabs text-to-speech client
//!
//! Resolves a human-readable voice name to a provider voice id via
//! `GET /v1/voices` (cached after the first successful lookup), then
//! synthesizes with `pcm_16000` output and wraps the raw PCM in a WAV
//! container so clients can play it directly.

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::SpeechSynthesizer;
use crate::audio::pcm16_to_wav;
use crate::config::TtsConfig;
use crate::{Error, Result};

const API_BASE: &str = "https://api.elevenlabs.io/v1";

/// Sample rate of the requested `pcm_16000` output format
const OUTPUT_SAMPLE_RATE: u32 = 16_000;

/// ElevenLabs speech synthesizer
pub struct ElevenLabsSynthesizer {
    client: reqwest::Client,
    api_key: String,
    voice_name: String,
    model_id: String,
    // Resolved lazily; a failed lookup is retried on the next call.
    voice_id: RwLock<Option<String>>,
}

impl ElevenLabsSynthesizer {
    /// Create a synthesizer from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(config: &TtsConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            Error::Config("ElevenLabs API key required (ELEVENLABS_API_KEY)".to_string())
        })?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            voice_name: config.voice.clone(),
            model_id: config.model_id.clone(),
            voice_id: RwLock::new(None),
        })
    }

    /// Resolve the configured voice name to a provider voice id
    async fn resolve_voice(&self) -> Result<String> {
        if let Some(id) = self.voice_id.read().await.clone() {
            return Ok(id);
        }

        let response = self
            .client
            .get(format!("{API_BASE}/voices"))
            .header("xi-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| Error::Tts(format!("voice listing failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("voice listing error {status}: {body}")));
        }

        let listing: VoiceListing = response
            .json()
            .await
            .map_err(|e| Error::Tts(format!("invalid voice listing: {e}")))?;

        let id = find_voice(&listing.voices, &self.voice_name).ok_or_else(|| {
            Error::Tts(format!("voice not found: {}", self.voice_name))
        })?;

        tracing::debug!(voice = %self.voice_name, voice_id = %id, "resolved synthesis voice");
        *self.voice_id.write().await = Some(id.clone());
        Ok(id)
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let voice_id = self.resolve_voice().await?;

        #[derive(serde::Serialize)]
        struct SynthesisRequest<'a> {
            text: &'a str,
            model_id: &'a str,
        }

        let response = self
            .client
            .post(format!(
                "{API_BASE}/text-to-speech/{voice_id}?output_format=pcm_16000"
            ))
            .header("xi-api-key", &self.api_key)
            .json(&SynthesisRequest {
                text,
                model_id: &self.model_id,
            })
            .send()
            .await
            .map_err(|e| Error::Tts(format!("synthesis request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("synthesis error {status}: {body}")));
        }

        let pcm = response
            .bytes()
            .await
            .map_err(|e| Error::Tts(format!("synthesis body read failed: {e}")))?;

        tracing::debug!(pcm_bytes = pcm.len(), "synthesis complete");
        pcm16_to_wav(&pcm, OUTPUT_SAMPLE_RATE)
    }
}

/// Voice listing response (partial schema)
#[derive(Deserialize)]
struct VoiceListing {
    #[serde(default)]
    voices: Vec<Voice>,
}

#[derive(Deserialize)]
struct Voice {
    voice_id: String,
    name: String,
}

/// Find a voice by case-insensitive name match
fn find_voice(voices: &[Voice], name: &str) -> Option<String> {
    voices
        .iter()
        .find(|v| v.name.eq_ignore_ascii_case(name))
        .map(|v| v.voice_id.clone())
}
