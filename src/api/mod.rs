//! HTTP API server for the Cadence gateway

pub mod health;
pub mod token;
pub mod websocket;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::{Config, PipelineConfig};
use crate::llm::{CompletionBackend, GroqCompletion};
use crate::stt::deepgram::DeepgramSettings;
use crate::token::RoomTokenIssuer;
use crate::tts::{ElevenLabsSynthesizer, SpeechSynthesizer};
use crate::Result;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Room token issuer.
    /// Present only when the media API key and secret are configured.
    pub issuer: Option<RoomTokenIssuer>,
    pub completion: Arc<dyn CompletionBackend>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    /// Per-connection recognition link settings
    pub stt: DeepgramSettings,
    pub pipeline: PipelineConfig,
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
    static_audio_dir: Option<PathBuf>,
}

impl ApiServer {
    /// Build a server from configuration
    ///
    /// # Errors
    ///
    /// Returns error if a required backend credential is missing
    pub fn from_config(config: &Config) -> Result<Self> {
        let issuer = match (&config.token.api_key, &config.token.api_secret) {
            (Some(_), Some(_)) => Some(RoomTokenIssuer::new(&config.token)?),
            _ => {
                tracing::warn!("media credentials not configured, token issuance disabled");
                None
            }
        };

        let stt_api_key = config.stt.api_key.clone().ok_or_else(|| {
            crate::Error::Config("Deepgram API key required (DEEPGRAM_API_KEY)".to_string())
        })?;

        let state = Arc::new(ApiState {
            issuer,
            completion: Arc::new(GroqCompletion::new(&config.llm)?),
            synthesizer: Arc::new(ElevenLabsSynthesizer::new(&config.tts)?),
            stt: DeepgramSettings {
                url: config.stt_listen_url(),
                api_key: stt_api_key,
                keepalive: config.pipeline.keepalive(),
                reconnect_backoff: config.pipeline.reconnect_backoff(),
            },
            pipeline: config.pipeline.clone(),
        });

        Ok(Self {
            state,
            port: config.server.port,
            static_audio_dir: config.server.static_audio_dir.clone(),
        })
    }

    /// Build the router with all routes
    fn router(&self) -> Router {
        let mut router = Router::new()
            .nest("/api/token", token::router(self.state.clone()))
            .nest("/ws", websocket::router(self.state.clone()))
            .merge(health::router());

        // Serve pre-rendered audio assets if configured
        if let Some(audio_dir) = &self.static_audio_dir {
            router = router.nest_service("/audio", ServeDir::new(audio_dir));
            tracing::info!(path = %audio_dir.display(), "serving static audio files");
        }

        // CORS layer for cross-origin requests from frontend
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }
}
