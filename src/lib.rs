//! Cadence Gateway - Real-time voice assistant relay
//!
//! This library provides the core functionality for the Cadence gateway:
//! - Duplex session coordination (audio in, transcript/response/audio out)
//! - Streaming speech-to-text over a persistent, self-healing link
//! - Streaming LLM completion and speech synthesis
//! - Room credential issuance for real-time media clients
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     Clients                          │
//! │   WebSocket audio stream  │  Local microphone       │
//! └────────────────────┬────────────────────────────────┘
//!                      │ PCM frames
//! ┌────────────────────▼────────────────────────────────┐
//! │               Session Coordinator                    │
//! │   Echo suppressor │ Transcript gate │ Output sink   │
//! └──────┬──────────────────┬──────────────────┬────────┘
//!        │                  │                  │
//! ┌──────▼──────┐   ┌───────▼───────┐   ┌──────▼───────┐
//! │ Deepgram STT│   │ Groq streaming│   │ ElevenLabs   │
//! │ (live link) │   │  completion   │   │     TTS      │
//! └─────────────┘   └───────────────┘   └──────────────┘
//! ```

pub mod api;
pub mod audio;
pub mod config;
pub mod error;
pub mod llm;
pub mod session;
pub mod stt;
pub mod token;
pub mod tts;

pub use audio::{AudioFrame, AudioFrameSource};
pub use config::Config;
pub use error::{Error, Result};
pub use llm::CompletionBackend;
pub use session::{SessionCoordinator, SinkMessage, TRANSCRIPT_PREFIX};
pub use stt::{RecognitionSession, Transcript};
pub use token::RoomTokenIssuer;
pub use tts::SpeechSynthesizer;
