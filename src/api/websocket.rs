//! WebSocket handler for live audio sessions
//!
//! Each connection gets its own recognition link and pipeline
//! coordinator. Inbound binary frames are raw PCM16 audio; outbound
//! traffic interleaves text messages (transcript announcements and
//! response fragments) with binary WAV payloads, in pipeline order.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::ApiState;
use crate::audio::{AudioFrame, ChannelFrameSource};
use crate::session::{SessionCoordinator, SinkMessage};
use crate::stt::deepgram::DeepgramLiveSession;
use crate::stt::RecognitionSession;

/// Inbound frames buffered between the transport and the relay
const FRAME_QUEUE: usize = 64;

/// Outbound messages buffered between the pipeline and the transport
const SINK_QUEUE: usize = 64;

/// Build WebSocket router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/audio", get(ws_upgrade))
        .with_state(state)
}

/// Handle WebSocket upgrade request
async fn ws_upgrade(State(state): State<Arc<ApiState>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle one audio session connection
async fn handle_socket(socket: WebSocket, state: Arc<ApiState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (frame_tx, source) = ChannelFrameSource::new(FRAME_QUEUE);
    let (sink_tx, mut sink_rx) = mpsc::channel::<SinkMessage>(SINK_QUEUE);

    // Outbound writer: the single consumer of the sink channel, so
    // text/audio ordering survives the transport hop.
    let send_task = tokio::spawn(async move {
        while let Some(message) = sink_rx.recv().await {
            let frame = match message {
                SinkMessage::Text(text) => Message::Text(text.into()),
                SinkMessage::Audio(payload) => Message::Binary(payload.into()),
            };
            if ws_sender.send(frame).await.is_err() {
                break;
            }
        }
    });

    // Inbound reader: binary frames feed the pipeline; closing the
    // sender ends the relay's audio source.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = ws_receiver.next().await {
            match message {
                Message::Binary(data) => {
                    if frame_tx.send(AudioFrame::new(data.to_vec())).await.is_err() {
                        break;
                    }
                }
                Message::Close(_) => break,
                // Text and ping/pong frames carry no audio
                _ => {}
            }
        }
    });

    let recognizer = Arc::new(DeepgramLiveSession::connect(state.stt.clone()));
    let coordinator = SessionCoordinator::new(
        state.pipeline.clone(),
        recognizer.clone(),
        state.completion.clone(),
        state.synthesizer.clone(),
    );

    let session_id = coordinator.session_id().to_string();
    tracing::info!(session_id = %session_id, "audio session connected");

    let result = tokio::select! {
        result = coordinator.run(Box::new(source), sink_tx) => result,
        _ = &mut recv_task => Ok(()),
    };

    if let Err(e) = result {
        tracing::warn!(session_id = %session_id, error = %e, "audio session ended with error");
    }

    // Exiting through the transport branch skips the coordinator's own
    // teardown, so cancel the recognition link here as well.
    recognizer.close().await;
    send_task.abort();
    recv_task.abort();
    tracing::info!(session_id = %session_id, "audio session disconnected");
}
