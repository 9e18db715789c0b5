//! Interviewer Agent and Avatar Attachment
//!
//! An [`AgentSession`] is the conversational side of the interviewer: it owns
//! the language-model backend and knows where its spoken output goes. An
//! [`AvatarAgent`] attaches a rendering session to it, so the agent's audio is
//! voiced by the avatar participant in the room.

use crate::access_token::{AccessToken, TokenError, VideoGrants};
use crate::llm_client::LLMClient;
use crate::room::PlatformCredentials;
use crate::simli::{AvatarSessionHandle, ProviderError, SimliClient, SimliConfig};
use std::sync::Arc;
use tracing::info;

/// Identity the rendering provider joins the room under.
pub const AVATAR_AGENT_IDENTITY: &str = "simli-avatar-agent";

/// Participant attribute telling the platform whose media the avatar publishes.
pub const PUBLISH_ON_BEHALF_ATTRIBUTE: &str = "lk.publish_on_behalf";

const DEFAULT_INSTRUCTIONS: &str = "You are a professional, friendly job interviewer. \
Ask one question at a time, listen to the candidate's answer, and follow up briefly before moving on.";

#[derive(Debug, thiserror::Error)]
pub enum AvatarStartError {
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

pub struct AgentSession {
    llm: Arc<dyn LLMClient>,
    instructions: String,
    audio_output: Option<String>,
}

impl AgentSession {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self {
            llm,
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            audio_output: None,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn model(&self) -> &str {
        self.llm.model()
    }

    /// Participant identity the agent's speech is streamed to, once attached.
    pub fn audio_output(&self) -> Option<&str> {
        self.audio_output.as_deref()
    }

    pub fn route_audio_to(&mut self, identity: impl Into<String>) {
        self.audio_output = Some(identity.into());
    }

    /// Produces the interviewer's next turn for `user_message`.
    pub async fn generate_reply(&self, user_message: &str) -> anyhow::Result<String> {
        self.llm.complete(&self.instructions, user_message).await
    }
}

/// Avatar renderer that voices an [`AgentSession`] inside a room.
pub struct AvatarAgent {
    config: SimliConfig,
    client: SimliClient,
}

impl AvatarAgent {
    pub fn new(config: SimliConfig, client: SimliClient) -> Self {
        Self { config, client }
    }

    /// Starts rendering for `session` in `room`.
    ///
    /// The avatar joins as its own participant, publishing on behalf of
    /// `local_identity`; on success the session's audio is routed to it.
    pub async fn start(
        &self,
        session: &mut AgentSession,
        platform: &PlatformCredentials,
        room: &str,
        local_identity: &str,
    ) -> Result<AvatarSessionHandle, AvatarStartError> {
        let avatar_token = AccessToken::new(&platform.api_key, platform.api_secret.clone())
            .with_identity(AVATAR_AGENT_IDENTITY)
            .with_kind("agent")
            .with_attribute(PUBLISH_ON_BEHALF_ATTRIBUTE, local_identity)
            .with_grants(VideoGrants::join(room))
            .to_jwt()?;

        let handle = self.client.start_audio_to_video_session(&self.config).await?;
        info!(token_len = handle.len(), "Avatar rendering session created");

        self.client
            .start_livekit_agents_session(&handle, &avatar_token, &platform.url)
            .await?;

        session.route_audio_to(AVATAR_AGENT_IDENTITY);
        info!(model = session.model(), "Avatar attached to agent session");
        Ok(handle)
    }
}
