//! One avatar invocation, start to finish.
//!
//! Loads credentials, builds the configured bridge, activates it and hands it
//! to the supervisor. The bridge is terminated on every path out of here.

use crate::{
    bridge::{self, RoomRequest},
    config::Credentials,
    error::AvatarError,
    state::AppState,
    supervisor::Supervisor,
};
use tracing::{error, info, instrument};

#[instrument(skip_all, fields(room = %request.room_name, strategy = ?state.config.strategy))]
pub async fn run_avatar_session(
    state: &AppState,
    request: RoomRequest,
) -> Result<String, AvatarError> {
    let credentials = Credentials::load(state.credentials.as_ref(), state.config.strategy)?;
    info!("Credentials loaded");

    let mut bridge = bridge::build(state, credentials);
    if let Err(e) = bridge.activate(&request).await {
        error!(kind = e.kind(), state = %bridge.state(), error = %e, "Avatar bridge failed");
        bridge.terminate().await;
        return Err(e);
    }

    let supervisor = Supervisor::new(state.config.session_duration, state.shutdown.child_token());
    let reason = supervisor.supervise(bridge.as_mut()).await;
    info!(?reason, "Avatar session ended");

    Ok(format!("Avatar session ended for room: {}", request.room_name))
}
