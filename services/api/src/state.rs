//! Shared Application State
//!
//! Process-wide resources, created once at startup and shared by every
//! invocation. Credentials are read per invocation through `credentials`.

use crate::config::{Config, CredentialSource};
use avatar_core::{http_scope::HttpScope, room::RoomConnector};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub credentials: Arc<dyn CredentialSource>,
    pub http_scope: Arc<dyn HttpScope>,
    pub room_connector: Arc<dyn RoomConnector>,
    /// Cancelled on server shutdown; every supervisor waits on a child of it.
    pub shutdown: CancellationToken,
}
