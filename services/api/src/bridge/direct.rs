//! Direct provider handshake.
//!
//! We never join the room ourselves: the avatar provider is given a session
//! handle and a room grant, and joins on our behalf. Remote cleanup of the
//! rendering session belongs to the provider (it expires the session after
//! `maxSessionLength`), so teardown here is local only.

use super::{Bridge, BridgeState, Lifecycle, RoomRequest};
use crate::{config::Credentials, error::AvatarError};
use avatar_core::{
    AVATAR_IDENTITY,
    access_token::issue_room_grant,
    http_scope::{HttpLease, HttpScope},
    simli::{AvatarSessionHandle, SimliClient},
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};

pub struct DirectHandshakeBridge {
    credentials: Credentials,
    http_scope: Arc<dyn HttpScope>,
    simli_api_url: String,
    lease: Option<HttpLease>,
    session: Option<AvatarSessionHandle>,
    lifecycle: Lifecycle,
}

impl DirectHandshakeBridge {
    pub fn new(
        credentials: Credentials,
        http_scope: Arc<dyn HttpScope>,
        simli_api_url: String,
    ) -> Self {
        Self {
            credentials,
            http_scope,
            simli_api_url,
            lease: None,
            session: None,
            lifecycle: Lifecycle::new(),
        }
    }
}

#[async_trait]
impl Bridge for DirectHandshakeBridge {
    fn state(&self) -> BridgeState {
        self.lifecycle.current()
    }

    #[instrument(name = "direct_bridge", skip_all, fields(room = %request.room_name))]
    async fn activate(&mut self, request: &RoomRequest) -> Result<(), AvatarError> {
        let lease = self
            .http_scope
            .acquire()
            .map_err(|e| AvatarError::Unexpected(e.into()))?;
        let simli = SimliClient::new(lease.client().clone(), &self.simli_api_url);
        self.lease = Some(lease);

        self.lifecycle.advance(BridgeState::RendererRequested);
        info!("Creating avatar rendering session");
        let session = simli
            .start_audio_to_video_session(&self.credentials.simli)
            .await?;
        info!(token_len = session.len(), "Avatar rendering session created");
        self.lifecycle.advance(BridgeState::RendererReady);

        let platform = &self.credentials.platform;
        let grant = issue_room_grant(
            &platform.api_key,
            &platform.api_secret,
            &request.room_name,
            AVATAR_IDENTITY,
            &request.display_name,
        )?;

        info!("Handing rendering session to the provider for room join");
        simli
            .start_livekit_agents_session(&session, &grant, &platform.url)
            .await?;
        self.session = Some(session);
        self.lifecycle.advance(BridgeState::Active);
        info!("Avatar connected to room");
        Ok(())
    }

    async fn disconnected(&mut self) {
        std::future::pending::<()>().await
    }

    async fn terminate(&mut self) {
        if self.lifecycle.current() == BridgeState::Closed {
            return;
        }
        self.lifecycle.advance(BridgeState::Terminating);
        self.session = None;
        if let Some(lease) = self.lease.take() {
            lease.release();
        }
        self.lifecycle.advance(BridgeState::Closed);
    }
}
