//! API endpoint integration tests

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use tower::ServiceExt;

use cadence_gateway::api::{health, token, ApiState};
use cadence_gateway::config::{PipelineConfig, TokenConfig};
use cadence_gateway::stt::deepgram::DeepgramSettings;
use cadence_gateway::RoomTokenIssuer;

mod common;
use common::{FakeCompletion, FakeSynthesizer};

/// Build API state over test doubles
fn build_test_state(issuer: Option<RoomTokenIssuer>) -> Arc<ApiState> {
    Arc::new(ApiState {
        issuer,
        completion: FakeCompletion::new(vec![]),
        synthesizer: FakeSynthesizer::with_payload(vec![0]),
        stt: DeepgramSettings {
            url: "ws://127.0.0.1:1".to_string(),
            api_key: "test-key".to_string(),
            keepalive: Duration::from_secs(5),
            reconnect_backoff: Duration::from_secs(1),
        },
        pipeline: PipelineConfig::default(),
    })
}

fn test_issuer() -> RoomTokenIssuer {
    RoomTokenIssuer::new(&TokenConfig {
        api_key: Some("test-api-key".to_string()),
        api_secret: Some("test-secret".to_string()),
        ttl_secs: 3600,
    })
    .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let router = health::router();

    let response = router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_token_endpoint_issues_jwt() {
    let router = token::router(build_test_state(Some(test_issuer())));

    let response = router
        .oneshot(
            Request::get("/?identity=alice&room=lobby")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let token = json["token"].as_str().unwrap();
    // Three dot-separated JWT segments
    assert_eq!(token.split('.').count(), 3);
}

#[tokio::test]
async fn test_token_endpoint_defaults_room() {
    let router = token::router(build_test_state(Some(test_issuer())));

    let response = router
        .oneshot(
            Request::get("/?identity=bob")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_token_endpoint_rejects_blank_identity() {
    let router = token::router(build_test_state(Some(test_issuer())));

    let response = router
        .oneshot(
            Request::get("/?identity=%20%20")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_token_endpoint_unconfigured_is_unavailable() {
    let router = token::router(build_test_state(None));

    let response = router
        .oneshot(
            Request::get("/?identity=alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert!(json["error"].is_string());
}
