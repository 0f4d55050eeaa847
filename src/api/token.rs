//! Room token endpoint

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::ApiState;

/// Query parameters for token issuance
#[derive(Debug, Deserialize)]
struct TokenQuery {
    identity: String,
    #[serde(default = "default_room")]
    room: String,
}

fn default_room() -> String {
    "default".to_string()
}

/// Issued token response
#[derive(Serialize)]
struct TokenResponse {
    token: String,
}

/// Token endpoint errors
enum TokenError {
    NotConfigured,
    EmptyIdentity,
    Signing(String),
}

impl IntoResponse for TokenError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotConfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                "token issuance not configured".to_string(),
            ),
            Self::EmptyIdentity => (
                StatusCode::BAD_REQUEST,
                "identity must not be empty".to_string(),
            ),
            Self::Signing(e) => (StatusCode::INTERNAL_SERVER_ERROR, e),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Issue a room access token for the given identity
async fn issue_token(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<TokenResponse>, TokenError> {
    let issuer = state.issuer.as_ref().ok_or(TokenError::NotConfigured)?;

    if query.identity.trim().is_empty() {
        return Err(TokenError::EmptyIdentity);
    }

    let token = issuer
        .issue(&query.identity, &query.room)
        .map_err(|e| TokenError::Signing(e.to_string()))?;

    tracing::info!(identity = %query.identity, room = %query.room, "room token issued");
    Ok(Json(TokenResponse { token }))
}

/// Build token router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(issue_token))
        .with_state(state)
}
