//! Axum Handlers for the REST API
//!
//! The avatar entry point, the participant token route and a health probe.
//! Handlers carry `utoipa` annotations for the OpenAPI document.

use axum::{
    body::Bytes,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use avatar_core::{
    DEFAULT_DISPLAY_NAME,
    access_token::{AccessToken, VideoGrants},
};
use std::{sync::Arc, time::Duration};
use tracing::{error, info, warn};

use crate::{
    bridge::RoomRequest,
    config::load_platform,
    error::AvatarError,
    models::{BridgeResult, ErrorResponse, SpawnAvatarPayload, TokenRequest, TokenResponse},
    session::run_avatar_session,
    state::AppState,
};

/// Lifetime of a token issued to a human participant.
pub const PARTICIPANT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub enum ApiError {
    Avatar(AvatarError),
    InvalidTokenRequest(String),
    TokenGeneration(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Avatar(err) => {
                let status = err.status();
                if status.is_server_error() {
                    error!(kind = err.kind(), "Avatar invocation failed: {}", err);
                }
                (status, Json(BridgeResult::failure(err.to_string()))).into_response()
            }
            ApiError::InvalidTokenRequest(error) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { error })).into_response()
            }
            ApiError::TokenGeneration(err) => {
                error!("Error generating token: {:?}", err);
                let error = "Failed to generate token".to_string();
                (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error })).into_response()
            }
        }
    }
}

impl From<AvatarError> for ApiError {
    fn from(err: AvatarError) -> Self {
        Self::Avatar(err)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Bring the avatar into a room and keep it there for the session duration.
///
/// Returns only after the avatar session has ended or failed.
#[utoipa::path(
    post,
    path = "/",
    request_body = SpawnAvatarPayload,
    responses(
        (status = 200, description = "Avatar session completed", body = BridgeResult),
        (status = 400, description = "roomName missing", body = BridgeResult),
        (status = 500, description = "Avatar session failed", body = BridgeResult)
    )
)]
pub async fn invoke_avatar(
    state: State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<BridgeResult>, ApiError> {
    spawn_avatar(state, body).await
}

/// Same as `POST /`, under a descriptive path.
#[utoipa::path(
    post,
    path = "/avatar",
    request_body = SpawnAvatarPayload,
    responses(
        (status = 200, description = "Avatar session completed", body = BridgeResult),
        (status = 400, description = "roomName missing", body = BridgeResult),
        (status = 500, description = "Avatar session failed", body = BridgeResult)
    )
)]
pub async fn spawn_avatar(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<BridgeResult>, ApiError> {
    // Parsed without requiring a JSON content type.
    let payload = serde_json::from_slice::<SpawnAvatarPayload>(&body).unwrap_or_else(|e| {
        warn!(error = %e, "Unreadable avatar request body");
        SpawnAvatarPayload::default()
    });

    let room_name = non_empty(payload.room_name)
        .ok_or_else(|| AvatarError::Validation("roomName is required".to_string()))?;
    let display_name = non_empty(payload.participant_name)
        .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string());

    info!(room = %room_name, "Avatar requested");
    let message = run_avatar_session(
        &state,
        RoomRequest {
            room_name,
            display_name,
        },
    )
    .await?;

    Ok(Json(BridgeResult::ended(message)))
}

/// Issue a room join token for a human participant (query string variant).
#[utoipa::path(
    get,
    path = "/token",
    params(TokenRequest),
    responses(
        (status = 200, description = "Signed join token", body = TokenResponse),
        (status = 400, description = "Missing parameter", body = ErrorResponse),
        (status = 500, description = "Token could not be generated", body = ErrorResponse)
    )
)]
pub async fn get_token(
    State(state): State<Arc<AppState>>,
    Query(request): Query<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    issue_participant_token(&state, request)
}

/// Issue a room join token for a human participant (JSON body variant).
#[utoipa::path(
    post,
    path = "/token",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Signed join token", body = TokenResponse),
        (status = 400, description = "Missing parameter", body = ErrorResponse),
        (status = 500, description = "Token could not be generated", body = ErrorResponse)
    )
)]
pub async fn post_token(
    State(state): State<Arc<AppState>>,
    request: Result<Json<TokenRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    issue_participant_token(&state, request)
}

fn issue_participant_token(
    state: &AppState,
    request: TokenRequest,
) -> Result<Json<TokenResponse>, ApiError> {
    let room_name = non_empty(request.room_name).ok_or_else(|| {
        ApiError::InvalidTokenRequest("Missing roomName parameter".to_string())
    })?;
    let participant_name = non_empty(request.participant_name).ok_or_else(|| {
        ApiError::InvalidTokenRequest("Missing participantName parameter".to_string())
    })?;

    let platform = load_platform(state.credentials.as_ref())
        .map_err(|e| ApiError::TokenGeneration(e.into()))?;
    let token = AccessToken::new(platform.api_key, platform.api_secret)
        .with_identity(&participant_name)
        .with_name(&participant_name)
        .with_grants(VideoGrants::join(room_name).with_publish_data())
        .with_ttl(PARTICIPANT_TOKEN_TTL)
        .to_jwt()
        .map_err(|e| ApiError::TokenGeneration(e.into()))?;

    Ok(Json(TokenResponse { token }))
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health() -> &'static str {
    "ok"
}
