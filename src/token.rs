//! Room access token issuance
//!
//! Issues short-lived HS256 JWTs granting a named identity publish and
//! subscribe rights in a media room. The claim layout matches what
//! LiveKit-compatible media servers verify: registered claims plus a
//! `video` grant object with camelCase keys.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::config::TokenConfig;
use crate::{Error, Result};

/// Room grant embedded in the token's `video` claim
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    pub room_join: bool,
    pub room: String,
    pub can_publish: bool,
    pub can_subscribe: bool,
}

/// Full claim set of an issued room token
#[derive(Debug, Serialize, Deserialize)]
pub struct RoomClaims {
    /// Unique token id, `{identity}-{issued_at}`
    pub jti: String,
    /// Issuer, the media API key
    pub iss: String,
    /// Subject, the participant identity
    pub sub: String,
    pub nbf: u64,
    pub exp: u64,
    pub video: VideoGrant,
}

/// Signs room access tokens with a shared API secret
#[derive(Clone)]
pub struct RoomTokenIssuer {
    api_key: String,
    api_secret: String,
    ttl: Duration,
}

impl RoomTokenIssuer {
    /// Create an issuer from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the API key or secret is missing
    pub fn new(config: &TokenConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            Error::Config("media API key required (LIVEKIT_API_KEY)".to_string())
        })?;
        let api_secret = config.api_secret.clone().ok_or_else(|| {
            Error::Config("media API secret required (LIVEKIT_API_SECRET)".to_string())
        })?;

        Ok(Self {
            api_key,
            api_secret,
            ttl: config.ttl(),
        })
    }

    /// Issue a token for `identity` to join `room`
    ///
    /// # Errors
    ///
    /// Returns error if signing fails
    pub fn issue(&self, identity: &str, room: &str) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs();
        self.issue_at(identity, room, now)
    }

    /// Issue a token anchored at an explicit unix timestamp
    pub(crate) fn issue_at(&self, identity: &str, room: &str, now: u64) -> Result<String> {
        let claims = RoomClaims {
            jti: format!("{identity}-{now}"),
            iss: self.api_key.clone(),
            sub: identity.to_string(),
            nbf: now,
            exp: now + self.ttl.as_secs(),
            video: VideoGrant {
                room_join: true,
                room: room.to_string(),
                can_publish: true,
                can_subscribe: true,
            },
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.api_secret.as_bytes()),
        )?;

        tracing::debug!(identity, room, "issued room token");
        Ok(token)
    }
}
