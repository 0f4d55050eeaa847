//! Configuration management for the Cadence gateway
//!
//! Configuration is layered: built-in defaults, then an optional TOML
//! file (`~/.config/cadence/gateway.toml` by default), then environment
//! variables for secrets and the listen port.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{Error, Result};

/// Cadence gateway configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP/WebSocket server settings
    pub server: ServerConfig,

    /// Streaming speech-to-text settings
    pub stt: SttConfig,

    /// Completion backend settings
    pub llm: LlmConfig,

    /// Speech synthesis settings
    pub tts: TtsConfig,

    /// Room credential issuance settings
    pub token: TokenConfig,

    /// Pipeline timing settings
    pub pipeline: PipelineConfig,
}

/// HTTP/WebSocket server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Optional directory of static audio files served under `/audio`
    pub static_audio_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            static_audio_dir: None,
        }
    }
}

/// Streaming STT (Deepgram live) configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SttConfig {
    /// Deepgram API key (`DEEPGRAM_API_KEY`)
    pub api_key: Option<String>,

    /// Live listen endpoint
    pub url: String,

    /// Recognition language
    pub language: String,

    /// Input sample rate in Hz (raw PCM16 mono)
    pub sample_rate: u32,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            url: "wss://api.deepgram.com/v1/listen".to_string(),
            language: "en".to_string(),
            sample_rate: 16_000,
        }
    }
}

/// Completion backend (OpenAI-compatible) configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LlmConfig {
    /// API key (`GROQ_API_KEY`)
    pub api_key: Option<String>,

    /// API base URL (`GROQ_API_BASE`)
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Sampling temperature
    pub temperature: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "meta-llama/llama-4-scout-17b-16e-instruct".to_string(),
            temperature: 0.7,
        }
    }
}

/// Speech synthesis (ElevenLabs) configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TtsConfig {
    /// ElevenLabs API key (`ELEVENLABS_API_KEY`)
    pub api_key: Option<String>,

    /// Human-readable voice name, resolved to a provider voice id
    pub voice: String,

    /// Synthesis model identifier
    pub model_id: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            voice: "Jessica".to_string(),
            model_id: "eleven_monolingual_v1".to_string(),
        }
    }
}

/// Room credential issuance configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TokenConfig {
    /// Signing key id, used as the credential issuer (`LIVEKIT_API_KEY`)
    pub api_key: Option<String>,

    /// Signing secret (`LIVEKIT_API_SECRET`)
    pub api_secret: Option<String>,

    /// Credential lifetime in seconds
    pub ttl_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_secret: None,
            ttl_secs: 3600,
        }
    }
}

impl TokenConfig {
    /// Credential lifetime as a [`Duration`]
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Session pipeline timing configuration
///
/// The defaults mirror the tuning the pipeline was built around; they
/// are exposed here rather than hardcoded so deployments can adjust
/// them per provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Minimum interval before an identical transcript is reprocessed
    pub cooldown_secs: f64,

    /// How long inbound audio is suppressed after synthesized playback
    pub echo_hold_secs: f64,

    /// How long the relay waits for a queued frame before substituting
    /// silence to keep the recognition link cadence alive
    pub silence_timeout_ms: u64,

    /// Size of a substituted silence frame in bytes
    pub silence_frame_bytes: usize,

    /// Backoff between recognition-link reconnect attempts
    pub reconnect_backoff_secs: u64,

    /// Interval between recognition-link keep-alive messages
    pub keepalive_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 2.5,
            echo_hold_secs: 2.5,
            silence_timeout_ms: 200,
            silence_frame_bytes: 320,
            reconnect_backoff_secs: 1,
            keepalive_secs: 5,
        }
    }
}

impl PipelineConfig {
    /// Duplicate-transcript cooldown as a [`Duration`]
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs_f64(self.cooldown_secs)
    }

    /// Echo-suppression window as a [`Duration`]
    #[must_use]
    pub fn echo_hold(&self) -> Duration {
        Duration::from_secs_f64(self.echo_hold_secs)
    }

    /// Silence-substitution timeout as a [`Duration`]
    #[must_use]
    pub const fn silence_timeout(&self) -> Duration {
        Duration::from_millis(self.silence_timeout_ms)
    }

    /// Reconnect backoff as a [`Duration`]
    #[must_use]
    pub const fn reconnect_backoff(&self) -> Duration {
        Duration::from_secs(self.reconnect_backoff_secs)
    }

    /// Keep-alive interval as a [`Duration`]
    #[must_use]
    pub const fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }
}

impl Config {
    /// Load configuration from the default location with environment
    /// overrides applied
    ///
    /// # Errors
    ///
    /// Returns error if the config file exists but cannot be parsed
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path().as_deref())
    }

    /// Load configuration from an explicit path (or defaults when the
    /// path is absent or the file does not exist)
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let raw = std::fs::read_to_string(p)
                    .map_err(|e| Error::Config(format!("failed to read {}: {e}", p.display())))?;
                toml::from_str(&raw)?
            }
            _ => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Overlay secrets and the listen port from the environment
    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("DEEPGRAM_API_KEY") {
            self.stt.api_key = Some(key);
        }
        if let Ok(key) = std::env::var("GROQ_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Ok(base) = std::env::var("GROQ_API_BASE") {
            self.llm.base_url = base;
        }
        if let Ok(key) = std::env::var("ELEVENLABS_API_KEY") {
            self.tts.api_key = Some(key);
        }
        if let Ok(key) = std::env::var("LIVEKIT_API_KEY") {
            self.token.api_key = Some(key);
        }
        if let Ok(secret) = std::env::var("LIVEKIT_API_SECRET") {
            self.token.api_secret = Some(secret);
        }
        if let Ok(port) = std::env::var("CADENCE_PORT") {
            match port.parse() {
                Ok(p) => self.server.port = p,
                Err(e) => tracing::warn!(port = %port, error = %e, "ignoring invalid CADENCE_PORT"),
            }
        }
    }

    /// The Deepgram live URL with query parameters applied
    #[must_use]
    pub fn stt_listen_url(&self) -> String {
        format!(
            "{}?punctuate=true&language={}&sample_rate={}&encoding=linear16",
            self.stt.url, self.stt.language, self.stt.sample_rate
        )
    }
}

/// Default config path: `~/.config/cadence/gateway.toml`
fn default_config_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.config_dir().join("cadence").join("gateway.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_pipeline_tuning() {
        let config = Config::default();
        assert!((config.pipeline.cooldown_secs - 2.5).abs() < f64::EPSILON);
        assert!((config.pipeline.echo_hold_secs - 2.5).abs() < f64::EPSILON);
        assert_eq!(config.pipeline.silence_timeout_ms, 200);
        assert_eq!(config.pipeline.silence_frame_bytes, 320);
        assert_eq!(config.pipeline.reconnect_backoff_secs, 1);
        assert_eq!(config.pipeline.keepalive_secs, 5);
        assert_eq!(config.token.ttl_secs, 3600);
        assert_eq!(config.stt.sample_rate, 16_000);
    }

    #[test]
    fn listen_url_carries_query_parameters() {
        let config = Config::default();
        let url = config.stt_listen_url();
        assert!(url.starts_with("wss://api.deepgram.com/v1/listen?"));
        assert!(url.contains("language=en"));
        assert!(url.contains("sample_rate=16000"));
        assert!(url.contains("encoding=linear16"));
    }

    #[test]
    fn toml_overrides_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[server]
port = 9100

[tts]
voice = "Aria"

[pipeline]
cooldown_secs = 1.0
"#
        )
        .unwrap();

        let config = Config::load_from(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.tts.voice, "Aria");
        assert!((config.pipeline.cooldown_secs - 1.0).abs() < f64::EPSILON);
        // Untouched sections keep defaults
        assert_eq!(config.llm.model, "meta-llama/llama-4-scout-17b-16e-instruct");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load_from(Some(Path::new("/nonexistent/gateway.toml"))).unwrap();
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn rejects_unknown_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[server]\nprot = 9100\n").unwrap();
        assert!(Config::load_from(Some(file.path())).is_err());
    }
}
