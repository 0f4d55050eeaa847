//! Recognition link reconnect tests
//!
//! Runs a local WebSocket server speaking the live-transcription result
//! format and verifies the session survives an abrupt link drop without
//! surfacing an error to the consumer.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use cadence_gateway::audio::AudioFrame;
use cadence_gateway::stt::deepgram::{DeepgramLiveSession, DeepgramSettings};
use cadence_gateway::stt::RecognitionSession;

const FIRST_RESULT: &str =
    r#"{"channel":{"alternatives":[{"transcript":"first connection"}]},"is_final":true}"#;
const SECOND_RESULT: &str =
    r#"{"channel":{"alternatives":[{"transcript":"after reconnect"}]},"is_final":true}"#;

#[tokio::test]
async fn test_session_survives_link_drop() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        // First connection: emit one result, then drop the socket
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::Text(FIRST_RESULT.to_string()))
            .await
            .unwrap();
        drop(ws);

        // The client reconnects on its own; serve the second link until
        // it closes
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::Text(SECOND_RESULT.to_string()))
            .await
            .unwrap();
        while let Some(msg) = ws.next().await {
            if msg.is_err() {
                break;
            }
        }
    });

    let session = DeepgramLiveSession::connect(DeepgramSettings {
        url: format!("ws://{addr}"),
        api_key: "test-key".to_string(),
        keepalive: Duration::from_secs(30),
        reconnect_backoff: Duration::from_millis(50),
    });

    let first = tokio::time::timeout(Duration::from_secs(2), session.next_transcript())
        .await
        .expect("timed out waiting for first transcript")
        .expect("session ended early");
    assert_eq!(first.text, "first connection");
    assert!(first.is_final);

    // Sending audio across the drop stays error-free
    session
        .send_audio(AudioFrame::silence(320))
        .await
        .unwrap();

    let second = tokio::time::timeout(Duration::from_secs(2), session.next_transcript())
        .await
        .expect("timed out waiting for transcript after reconnect")
        .expect("session ended early");
    assert_eq!(second.text, "after reconnect");

    session.close().await;
    server.await.unwrap();
}
