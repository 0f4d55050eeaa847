//! Deepgram live-transcription WebSocket client
//!
//! Protocol: connect to `wss://api.deepgram.com/v1/listen` with a
//! `Token` authorization header, stream raw PCM16 frames as binary
//! messages, and receive JSON results carrying a transcript string and
//! an `is_final` flag. Empty text frames act as keep-alives. The link
//! is supervised: an unexpected drop triggers a reconnect after a fixed
//! backoff, invisibly to the consumer, until `close` is called.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_util::sync::CancellationToken;

use super::{RecognitionSession, Transcript};
use crate::audio::AudioFrame;
use crate::{Error, Result};

/// Frames buffered toward the link while it (re)connects
const AUDIO_QUEUE: usize = 256;

/// Finalized transcripts buffered toward the consumer
const TRANSCRIPT_QUEUE: usize = 64;

/// Connection settings for a Deepgram live session
#[derive(Debug, Clone)]
pub struct DeepgramSettings {
    /// Full listen URL including query parameters
    pub url: String,
    /// Bearer credential
    pub api_key: String,
    /// Keep-alive interval
    pub keepalive: Duration,
    /// Fixed backoff between reconnect attempts
    pub reconnect_backoff: Duration,
}

/// A live recognition session against Deepgram
pub struct DeepgramLiveSession {
    audio_tx: mpsc::Sender<AudioFrame>,
    transcript_rx: Arc<Mutex<mpsc::Receiver<Transcript>>>,
    cancel: CancellationToken,
    session_id: String,
}

impl DeepgramLiveSession {
    /// Start a session, spawning the link supervisor
    ///
    /// The first connect happens in the background; frames sent before
    /// it completes are buffered.
    #[must_use]
    pub fn connect(settings: DeepgramSettings) -> Self {
        let (audio_tx, audio_rx) = mpsc::channel(AUDIO_QUEUE);
        let (transcript_tx, transcript_rx) = mpsc::channel(TRANSCRIPT_QUEUE);
        let cancel = CancellationToken::new();
        let session_id = uuid::Uuid::new_v4().to_string();

        tokio::spawn(supervise(
            settings,
            audio_rx,
            transcript_tx,
            cancel.clone(),
            session_id.clone(),
        ));

        Self {
            audio_tx,
            transcript_rx: Arc::new(Mutex::new(transcript_rx)),
            cancel,
            session_id,
        }
    }

    /// Session ID for logging
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

#[async_trait]
impl RecognitionSession for DeepgramLiveSession {
    async fn send_audio(&self, frame: AudioFrame) -> Result<()> {
        match self.audio_tx.try_send(frame) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                // Link is down or slow; dropping is preferable to
                // stalling the capture transport.
                tracing::trace!(session_id = %self.session_id, "audio queue full, dropping frame");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(Error::Stt("recognition session closed".to_string()))
            }
        }
    }

    async fn next_transcript(&self) -> Option<Transcript> {
        self.transcript_rx.lock().await.recv().await
    }

    async fn close(&self) {
        self.cancel.cancel();
    }
}

/// Why a connected link stopped
enum LinkEnd {
    /// `close` was called or the consumer went away
    Closed,
    /// The audio feed was dropped; nothing left to recognize
    SourceDrained,
    /// The link failed; the supervisor should reconnect
    Dropped,
}

/// Own the link for the session's lifetime, reconnecting on drops
async fn supervise(
    settings: DeepgramSettings,
    mut audio_rx: mpsc::Receiver<AudioFrame>,
    transcript_tx: mpsc::Sender<Transcript>,
    cancel: CancellationToken,
    session_id: String,
) {
    loop {
        let connected = tokio::select! {
            () = cancel.cancelled() => break,
            result = connect_once(&settings) => result,
        };

        match connected {
            Ok(ws) => {
                tracing::info!(session_id = %session_id, "recognition link established");
                match run_link(ws, &mut audio_rx, &transcript_tx, &settings, &cancel).await {
                    LinkEnd::Closed | LinkEnd::SourceDrained => break,
                    LinkEnd::Dropped => {
                        tracing::warn!(session_id = %session_id, "recognition link dropped, reconnecting");
                        tokio::select! {
                            () = cancel.cancelled() => break,
                            () = tokio::time::sleep(settings.reconnect_backoff) => {}
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %session_id,
                    error = %e,
                    backoff_secs = settings.reconnect_backoff.as_secs(),
                    "recognition connect failed, retrying"
                );
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(settings.reconnect_backoff) => {}
                }
            }
        }
    }

    tracing::debug!(session_id = %session_id, "recognition supervisor terminated");
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// One connection attempt
async fn connect_once(settings: &DeepgramSettings) -> Result<WsStream> {
    let mut request = settings
        .url
        .clone()
        .into_client_request()
        .map_err(|e| Error::Stt(format!("invalid listen URL: {e}")))?;
    request.headers_mut().insert(
        "Authorization",
        format!("Token {}", settings.api_key)
            .parse()
            .map_err(|e| Error::Stt(format!("invalid auth header: {e}")))?,
    );

    let (ws, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| Error::Stt(format!("connect failed: {e}")))?;
    Ok(ws)
}

/// Drive one connected link until it drops or the session ends
async fn run_link(
    ws: WsStream,
    audio_rx: &mut mpsc::Receiver<AudioFrame>,
    transcript_tx: &mpsc::Sender<Transcript>,
    settings: &DeepgramSettings,
    cancel: &CancellationToken,
) -> LinkEnd {
    let (mut sink, mut stream) = ws.split();

    let mut keepalive = tokio::time::interval_at(
        tokio::time::Instant::now() + settings.keepalive,
        settings.keepalive,
    );

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                let _ = sink.send(WsMessage::Close(None)).await;
                return LinkEnd::Closed;
            }
            frame = audio_rx.recv() => match frame {
                Some(frame) => {
                    if sink.send(WsMessage::Binary(frame.into_pcm())).await.is_err() {
                        return LinkEnd::Dropped;
                    }
                }
                None => {
                    let _ = sink.send(WsMessage::Close(None)).await;
                    return LinkEnd::SourceDrained;
                }
            },
            _ = keepalive.tick() => {
                if sink.send(WsMessage::Text(String::new())).await.is_err() {
                    return LinkEnd::Dropped;
                }
            }
            msg = stream.next() => match msg {
                Some(Ok(WsMessage::Text(text))) => {
                    if let Some(transcript) = parse_listen_message(&text) {
                        if transcript_tx.send(transcript).await.is_err() {
                            return LinkEnd::Closed;
                        }
                    }
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    tracing::debug!(close_frame = ?frame, "recognition link closed by peer");
                    return LinkEnd::Dropped;
                }
                Some(Ok(_)) => {
                    // Ping/pong handled by tungstenite; binary not expected
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "recognition link error");
                    return LinkEnd::Dropped;
                }
                None => return LinkEnd::Dropped,
            }
        }
    }
}

/// Inbound result message (partial schema)
#[derive(Deserialize)]
struct ListenMessage {
    #[serde(default)]
    channel: ListenChannel,
    #[serde(default)]
    is_final: bool,
}

#[derive(Deserialize, Default)]
struct ListenChannel {
    #[serde(default)]
    alternatives: Vec<ListenAlternative>,
}

#[derive(Deserialize)]
struct ListenAlternative {
    #[serde(default)]
    transcript: String,
}

/// Parse an inbound message into a finalized transcript
///
/// Interim results, empty finals, and malformed messages all yield
/// `None`; a malformed message never terminates the receive loop.
fn parse_listen_message(text: &str) -> Option<Transcript> {
    let message: ListenMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!(error = %e, "dropping malformed recognition message");
            return None;
        }
    };

    if !message.is_final {
        return None;
    }

    let transcript = message
        .channel
        .alternatives
        .first()
        .map(|a| a.transcript.trim())
        .unwrap_or_default();

    if transcript.is_empty() {
        return None;
    }

    Some(Transcript::finalized(transcript))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_transcript_is_accepted() {
        let json = r#"{"channel":{"alternatives":[{"transcript":"hello there"}]},"is_final":true}"#;
        let t = parse_listen_message(json).unwrap();
        assert_eq!(t.text, "hello there");
        assert!(t.is_final);
    }

    #[test]
    fn interim_result_is_dropped() {
        let json = r#"{"channel":{"alternatives":[{"transcript":"hello"}]},"is_final":false}"#;
        assert!(parse_listen_message(json).is_none());
    }

    #[test]
    fn empty_final_is_dropped() {
        let json = r#"{"channel":{"alternatives":[{"transcript":"   "}]},"is_final":true}"#;
        assert!(parse_listen_message(json).is_none());
    }

    #[test]
    fn missing_alternatives_is_dropped() {
        let json = r#"{"channel":{"alternatives":[]},"is_final":true}"#;
        assert!(parse_listen_message(json).is_none());
    }

    #[test]
    fn malformed_message_is_dropped() {
        assert!(parse_listen_message("not json").is_none());
        assert!(parse_listen_message(r#"{"metadata":{"request_id":"x"}}"#).is_none());
    }

    #[test]
    fn transcript_text_is_trimmed() {
        let json = r#"{"channel":{"alternatives":[{"transcript":"  hi  "}]},"is_final":true}"#;
        assert_eq!(parse_listen_message(json).unwrap().text, "hi");
    }
}
