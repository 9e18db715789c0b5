//! Error kinds surfaced by an avatar invocation.

use crate::config::ConfigError;
use avatar_core::access_token::TokenError;
use avatar_core::agent::AvatarStartError;
use avatar_core::room::RoomError;
use avatar_core::simli::ProviderError;
use axum::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum AvatarError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    RoomConnection(#[from] RoomError),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl AvatarError {
    pub fn status(&self) -> StatusCode {
        match self {
            AvatarError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable name, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            AvatarError::Configuration(_) => "configuration",
            AvatarError::Validation(_) => "validation",
            AvatarError::Provider(_) => "provider",
            AvatarError::RoomConnection(_) => "room_connection",
            AvatarError::Unexpected(_) => "unexpected",
        }
    }
}

impl From<TokenError> for AvatarError {
    fn from(err: TokenError) -> Self {
        AvatarError::Unexpected(err.into())
    }
}

impl From<AvatarStartError> for AvatarError {
    fn from(err: AvatarStartError) -> Self {
        match err {
            AvatarStartError::Token(e) => e.into(),
            AvatarStartError::Provider(e) => e.into(),
        }
    }
}
