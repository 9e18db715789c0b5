//! Avatar Rendering Provider Client
//!
//! A thin REST client for the audio-to-video avatar provider. It covers the two
//! calls the bridge relies on: creating a rendering session, and asking the
//! provider to join that session to a room on our behalf.

use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://api.simli.ai";
pub const START_SESSION_PATH: &str = "/startAudioToVideoSession";
pub const START_LIVEKIT_SESSION_PATH: &str = "/StartLivekitAgentsSession";

/// Upper bound on a rendering session, in seconds (15 minutes).
pub const MAX_SESSION_LENGTH_SECS: u64 = 900;
/// Idle time after which the provider drops the session, in seconds.
pub const MAX_IDLE_TIME_SECS: u64 = 120;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("avatar provider request to {endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("avatar provider returned HTTP {status} from {endpoint}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },
    #[error("malformed avatar provider response from {endpoint}: {source}")]
    Malformed {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("avatar provider response from {endpoint} has no session_token")]
    MissingSessionToken { endpoint: &'static str },
}

/// Provider credentials and rendering options.
#[derive(Debug, Clone)]
pub struct SimliConfig {
    pub api_key: SecretString,
    pub face_id: String,
    pub max_session_length: u64,
    pub max_idle_time: u64,
}

impl SimliConfig {
    pub fn new(api_key: SecretString, face_id: impl Into<String>) -> Self {
        Self {
            api_key,
            face_id: face_id.into(),
            max_session_length: MAX_SESSION_LENGTH_SECS,
            max_idle_time: MAX_IDLE_TIME_SECS,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartSessionRequest<'a> {
    api_key: &'a str,
    face_id: &'a str,
    sync_audio: bool,
    handle_silence: bool,
    max_session_length: u64,
    max_idle_time: u64,
}

#[derive(Deserialize)]
struct StartSessionResponse {
    session_token: Option<String>,
}

#[derive(Serialize)]
struct StartLivekitSessionRequest<'a> {
    session_token: &'a str,
    livekit_token: &'a str,
    livekit_url: &'a str,
}

/// Opaque token for a live rendering session.
#[derive(Debug)]
pub struct AvatarSessionHandle(SecretString);

impl AvatarSessionHandle {
    pub fn token(&self) -> &str {
        self.0.expose_secret()
    }

    /// Token length, for logging without revealing the token.
    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug)]
pub struct SimliClient {
    http: Client,
    base_url: String,
}

impl SimliClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    /// Creates an audio-to-video rendering session.
    pub async fn start_audio_to_video_session(
        &self,
        config: &SimliConfig,
    ) -> Result<AvatarSessionHandle, ProviderError> {
        let body = StartSessionRequest {
            api_key: config.api_key.expose_secret(),
            face_id: &config.face_id,
            sync_audio: true,
            handle_silence: true,
            max_session_length: config.max_session_length,
            max_idle_time: config.max_idle_time,
        };
        let response = self.post(START_SESSION_PATH, &body).await?;

        let parsed: StartSessionResponse =
            response
                .json()
                .await
                .map_err(|source| ProviderError::Malformed {
                    endpoint: START_SESSION_PATH,
                    source,
                })?;

        match parsed.session_token {
            Some(token) if !token.is_empty() => {
                Ok(AvatarSessionHandle(SecretString::from(token)))
            }
            _ => Err(ProviderError::MissingSessionToken {
                endpoint: START_SESSION_PATH,
            }),
        }
    }

    /// Hands the rendering session and a room grant to the provider, which
    /// then joins the room itself. Only the status code is relied upon.
    pub async fn start_livekit_agents_session(
        &self,
        session: &AvatarSessionHandle,
        livekit_token: &str,
        livekit_url: &str,
    ) -> Result<(), ProviderError> {
        let body = StartLivekitSessionRequest {
            session_token: session.token(),
            livekit_token,
            livekit_url,
        };
        self.post(START_LIVEKIT_SESSION_PATH, &body).await?;
        Ok(())
    }

    async fn post<T: Serialize>(
        &self,
        endpoint: &'static str,
        body: &T,
    ) -> Result<Response, ProviderError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(%url, "Calling avatar provider");

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| ProviderError::Transport { endpoint, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}
