//! Room Access Grants
//!
//! This module builds the signed, time-bounded join tokens the room platform
//! expects. A token names one identity, scopes it to one room, and carries the
//! publish/subscribe capabilities the holder is allowed to use.

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Lifetime of a grant when the builder is not given an explicit TTL.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(6 * 60 * 60);

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("access grant is missing required field: {0}")]
    MissingField(&'static str),
    #[error("failed to sign access grant: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Room capabilities carried in the `video` claim.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrants {
    pub room_join: bool,
    pub room: String,
    pub can_publish: bool,
    pub can_subscribe: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_publish_data: Option<bool>,
}

impl VideoGrants {
    /// Join rights for `room` with both publish and subscribe enabled.
    pub fn join(room: impl Into<String>) -> Self {
        Self {
            room_join: true,
            room: room.into(),
            can_publish: true,
            can_subscribe: true,
            can_publish_data: None,
        }
    }

    pub fn with_publish_data(mut self) -> Self {
        self.can_publish_data = Some(true);
        self
    }
}

/// The JWT claim set understood by the room platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantClaims {
    pub iss: String,
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub nbf: i64,
    pub exp: i64,
    pub jti: String,
    pub video: VideoGrants,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,
}

/// Builder for a signed access grant.
///
/// Mirrors the platform SDK builders: start from the API key pair, then add
/// identity, display name and grants before calling [`AccessToken::to_jwt`].
#[derive(Debug, Clone)]
pub struct AccessToken {
    api_key: String,
    api_secret: SecretString,
    identity: String,
    name: Option<String>,
    grants: VideoGrants,
    ttl: Duration,
    kind: Option<String>,
    attributes: HashMap<String, String>,
}

impl AccessToken {
    pub fn new(api_key: impl Into<String>, api_secret: SecretString) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret,
            identity: String::new(),
            name: None,
            grants: VideoGrants::default(),
            ttl: DEFAULT_TOKEN_TTL,
            kind: None,
            attributes: HashMap::new(),
        }
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_grants(mut self, grants: VideoGrants) -> Self {
        self.grants = grants;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Marks the participant kind (e.g. `agent`) for platform-side routing.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    fn claims(&self, now: i64) -> Result<GrantClaims, TokenError> {
        if self.identity.is_empty() {
            return Err(TokenError::MissingField("identity"));
        }
        if self.grants.room_join && self.grants.room.is_empty() {
            return Err(TokenError::MissingField("room"));
        }
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);

        Ok(GrantClaims {
            iss: self.api_key.clone(),
            sub: self.identity.clone(),
            name: self.name.clone(),
            nbf: now,
            exp: now.saturating_add(ttl),
            jti: self.identity.clone(),
            video: self.grants.clone(),
            kind: self.kind.clone(),
            attributes: self.attributes.clone(),
        })
    }

    /// Signs the grant with HS256 using the API secret.
    pub fn to_jwt(&self) -> Result<String, TokenError> {
        let claims = self.claims(Utc::now().timestamp())?;
        let key = EncodingKey::from_secret(self.api_secret.expose_secret().as_bytes());
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &key)?)
    }
}

/// Issues the standard join grant: `identity` may join `room` as `display_name`
/// with publish and subscribe rights.
pub fn issue_room_grant(
    api_key: &str,
    api_secret: &SecretString,
    room: &str,
    identity: &str,
    display_name: &str,
) -> Result<String, TokenError> {
    AccessToken::new(api_key, api_secret.clone())
        .with_identity(identity)
        .with_name(display_name)
        .with_grants(VideoGrants::join(room))
        .to_jwt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation, decode};

    fn decode_claims(token: &str, secret: &str) -> jsonwebtoken::errors::Result<GrantClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        decode::<GrantClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
    }

    #[test]
    fn test_issue_room_grant_claims() {
        let secret = SecretString::from("test-secret");
        let token =
            issue_room_grant("test-key", &secret, "room123", "simli-avatar", "AI Interviewer")
                .unwrap();

        let claims = decode_claims(&token, "test-secret").unwrap();
        assert_eq!(claims.iss, "test-key");
        assert_eq!(claims.sub, "simli-avatar");
        assert_eq!(claims.name.as_deref(), Some("AI Interviewer"));
        assert_eq!(claims.video, VideoGrants::join("room123"));
        assert!(claims.video.room_join);
        assert!(claims.video.can_publish);
        assert!(claims.video.can_subscribe);
        assert_eq!(claims.exp - claims.nbf, DEFAULT_TOKEN_TTL.as_secs() as i64);
    }

    #[test]
    fn test_grant_rejected_with_wrong_secret() {
        let token = issue_room_grant(
            "test-key",
            &SecretString::from("right-secret"),
            "room123",
            "simli-avatar",
            "AI Interviewer",
        )
        .unwrap();

        assert!(decode_claims(&token, "wrong-secret").is_err());
    }

    #[test]
    fn test_custom_ttl_kind_and_attributes() {
        let token = AccessToken::new("key", SecretString::from("secret"))
            .with_identity("simli-avatar-agent")
            .with_kind("agent")
            .with_attribute("lk.publish_on_behalf", "simli-avatar")
            .with_ttl(Duration::from_secs(60))
            .with_grants(VideoGrants::join("room123").with_publish_data())
            .to_jwt()
            .unwrap();

        let claims = decode_claims(&token, "secret").unwrap();
        assert_eq!(claims.exp - claims.nbf, 60);
        assert_eq!(claims.kind.as_deref(), Some("agent"));
        assert_eq!(
            claims.attributes.get("lk.publish_on_behalf").map(String::as_str),
            Some("simli-avatar")
        );
        assert_eq!(claims.video.can_publish_data, Some(true));
        assert_eq!(claims.name, None);
    }

    #[test]
    fn test_missing_identity_and_room() {
        let err = AccessToken::new("key", SecretString::from("secret"))
            .with_grants(VideoGrants::join("room123"))
            .to_jwt()
            .unwrap_err();
        assert!(matches!(err, TokenError::MissingField("identity")));

        let err = issue_room_grant("key", &SecretString::from("secret"), "", "id", "name")
            .unwrap_err();
        assert!(matches!(err, TokenError::MissingField("room")));
    }

    #[test]
    fn test_debug_does_not_leak_secret() {
        let token = AccessToken::new("key", SecretString::from("super-secret-value"));
        assert!(!format!("{:?}", token).contains("super-secret-value"));
    }
}
