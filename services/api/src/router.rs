//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the avatar entry point, the token route and OpenAPI documentation.

use crate::{
    handlers,
    models::{BridgeResult, ErrorResponse, SpawnAvatarPayload, TokenRequest, TokenResponse},
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::invoke_avatar,
        handlers::spawn_avatar,
        handlers::get_token,
        handlers::post_token,
        handlers::health,
    ),
    components(
        schemas(SpawnAvatarPayload, BridgeResult, TokenRequest, TokenResponse, ErrorResponse)
    ),
    tags(
        (name = "Avatar API", description = "Places an interviewer avatar into a LiveKit room")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/", post(handlers::invoke_avatar))
        .route("/avatar", post(handlers::spawn_avatar))
        .route(
            "/token",
            get(handlers::get_token).post(handlers::post_token),
        )
        .route("/health", get(handlers::health))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
