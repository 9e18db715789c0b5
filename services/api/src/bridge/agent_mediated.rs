//! Agent-mediated join.
//!
//! We join the room ourselves, start a conversational agent backed by the
//! language model, and attach an avatar renderer to both. Everything acquired
//! here (HTTP lease, room connection) is released on every exit path, either
//! by [`Bridge::terminate`] or, failing that, by the owners' `Drop`.

use super::{Bridge, BridgeState, Lifecycle, RoomRequest};
use crate::{
    config::{Config, ConfigError, CredentialGroup, Credentials},
    error::AvatarError,
};
use avatar_core::{
    AVATAR_IDENTITY,
    access_token::issue_room_grant,
    agent::{AgentSession, AvatarAgent},
    http_scope::{HttpLease, HttpScope},
    llm_client::OpenAICompatibleClient,
    room::{RoomConnection, RoomConnector},
    simli::{AvatarSessionHandle, SimliClient},
};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct AgentMediatedBridge {
    credentials: Credentials,
    http_scope: Arc<dyn HttpScope>,
    room_connector: Arc<dyn RoomConnector>,
    simli_api_url: String,
    llm_model: String,
    llm_api_base: String,
    lease: Option<HttpLease>,
    room: Option<Box<dyn RoomConnection>>,
    agent_session: Option<AgentSession>,
    avatar_session: Option<AvatarSessionHandle>,
    lifecycle: Lifecycle,
}

impl AgentMediatedBridge {
    pub fn new(
        credentials: Credentials,
        http_scope: Arc<dyn HttpScope>,
        room_connector: Arc<dyn RoomConnector>,
        config: &Config,
    ) -> Self {
        Self {
            credentials,
            http_scope,
            room_connector,
            simli_api_url: config.simli_api_url.clone(),
            llm_model: config.llm_model.clone(),
            llm_api_base: config.llm_api_base.clone(),
            lease: None,
            room: None,
            agent_session: None,
            avatar_session: None,
            lifecycle: Lifecycle::new(),
        }
    }

    /// The interviewer agent, once the avatar is attached.
    pub fn agent_session(&self) -> Option<&AgentSession> {
        self.agent_session.as_ref()
    }
}

#[async_trait]
impl Bridge for AgentMediatedBridge {
    fn state(&self) -> BridgeState {
        self.lifecycle.current()
    }

    #[instrument(name = "agent_bridge", skip_all, fields(room = %request.room_name))]
    async fn activate(&mut self, request: &RoomRequest) -> Result<(), AvatarError> {
        let google_api_key = self.credentials.google_api_key.clone().ok_or(
            ConfigError::MissingCredentials {
                group: CredentialGroup::Llm,
                missing: vec!["GOOGLE_API_KEY"],
            },
        )?;

        let lease = self
            .http_scope
            .acquire()
            .map_err(|e| AvatarError::Unexpected(e.into()))?;
        let http = lease.client().clone();
        self.lease = Some(lease);

        let platform = &self.credentials.platform;
        let token = issue_room_grant(
            &platform.api_key,
            &platform.api_secret,
            &request.room_name,
            AVATAR_IDENTITY,
            &request.display_name,
        )?;

        self.lifecycle.advance(BridgeState::RoomJoining);
        info!("Connecting to room");
        let room = self.room_connector.connect(&platform.url, &token).await?;
        self.room = Some(room);
        self.lifecycle.advance(BridgeState::RoomBound);
        info!("Connected to room");

        let llm = OpenAICompatibleClient::with_api_key(
            google_api_key.expose_secret(),
            &self.llm_api_base,
            self.llm_model.clone(),
        );
        let mut agent_session = AgentSession::new(Arc::new(llm));

        let avatar = AvatarAgent::new(
            self.credentials.simli.clone(),
            SimliClient::new(http, &self.simli_api_url),
        );
        self.lifecycle.advance(BridgeState::RendererRequested);
        info!("Starting avatar");
        let handle = avatar
            .start(
                &mut agent_session,
                platform,
                &request.room_name,
                AVATAR_IDENTITY,
            )
            .await?;
        self.lifecycle.advance(BridgeState::RendererReady);

        self.avatar_session = Some(handle);
        self.agent_session = Some(agent_session);
        self.lifecycle.advance(BridgeState::Active);
        info!("Avatar started successfully");
        Ok(())
    }

    async fn disconnected(&mut self) {
        match self.room.as_mut() {
            Some(room) => room.disconnected().await,
            None => std::future::pending::<()>().await,
        }
    }

    async fn terminate(&mut self) {
        if self.lifecycle.current() == BridgeState::Closed {
            return;
        }
        self.lifecycle.advance(BridgeState::Terminating);
        self.avatar_session = None;
        self.agent_session = None;
        if let Some(lease) = self.lease.take() {
            lease.release();
        }
        if let Some(mut room) = self.room.take() {
            if let Err(e) = room.close().await {
                warn!(error = %e, "Room connection did not close cleanly");
            }
        }
        self.lifecycle.advance(BridgeState::Closed);
        info!("Avatar disconnected");
    }
}
