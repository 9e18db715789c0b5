//! Avatar Session Bridge
//!
//! A bridge joins one avatar rendering session to one room. Two strategies
//! implement the same [`Bridge`] contract:
//!
//! - `direct`: the avatar provider joins the room itself after a direct handshake.
//! - `agent_mediated`: we join the room and attach the avatar to a conversational agent.
//!
//! Both move through the same [`BridgeState`] lifecycle and converge at
//! `Active`. A bridge is used for exactly one invocation and ends `Closed`.

pub mod agent_mediated;
pub mod direct;

use crate::{
    config::{BridgeStrategy, Credentials},
    error::AvatarError,
    state::AppState,
};
use async_trait::async_trait;
use std::fmt;
use tracing::{debug, warn};

pub use agent_mediated::AgentMediatedBridge;
pub use direct::DirectHandshakeBridge;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Idle,
    RendererRequested,
    RendererReady,
    RoomJoining,
    RoomBound,
    Active,
    Terminating,
    Closed,
}

impl BridgeState {
    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: BridgeState) -> bool {
        use BridgeState::*;
        match (self, next) {
            (Closed, _) => false,
            (Terminating, Closed) => true,
            (Terminating, _) => false,
            (_, Terminating) => true,
            (Idle, RendererRequested | RoomJoining) => true,
            (RoomJoining, RoomBound) => true,
            (RoomBound, RendererRequested) => true,
            (RendererRequested, RendererReady) => true,
            (RendererReady, Active) => true,
            _ => false,
        }
    }
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BridgeState::Idle => "idle",
            BridgeState::RendererRequested => "renderer_requested",
            BridgeState::RendererReady => "renderer_ready",
            BridgeState::RoomJoining => "room_joining",
            BridgeState::RoomBound => "room_bound",
            BridgeState::Active => "active",
            BridgeState::Terminating => "terminating",
            BridgeState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Tracks and logs lifecycle transitions for a single bridge.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    state: BridgeState,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            state: BridgeState::Idle,
        }
    }

    pub(crate) fn current(&self) -> BridgeState {
        self.state
    }

    pub(crate) fn advance(&mut self, next: BridgeState) {
        if !self.state.can_transition_to(next) {
            warn!(from = %self.state, to = %next, "Unexpected bridge state transition");
        }
        debug!(from = %self.state, to = %next, "Bridge state transition");
        self.state = next;
    }
}

/// What the caller asked for: which room, and how the avatar is labelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomRequest {
    pub room_name: String,
    pub display_name: String,
}

#[async_trait]
pub trait Bridge: Send {
    fn state(&self) -> BridgeState;

    /// Drives the bridge from `Idle` to `Active`. The first failure aborts.
    async fn activate(&mut self, request: &RoomRequest) -> Result<(), AvatarError>;

    /// Resolves when the underlying connection reports it has gone away.
    /// Never resolves for bridges that hold no connection of their own.
    async fn disconnected(&mut self);

    /// Releases everything the bridge owns and moves it to `Closed`.
    /// Safe to call from any state, and more than once.
    async fn terminate(&mut self);
}

/// Builds the bridge variant selected by configuration.
pub fn build(state: &AppState, credentials: Credentials) -> Box<dyn Bridge> {
    match state.config.strategy {
        BridgeStrategy::DirectHandshake => Box::new(DirectHandshakeBridge::new(
            credentials,
            state.http_scope.clone(),
            state.config.simli_api_url.clone(),
        )),
        BridgeStrategy::AgentMediated => Box::new(AgentMediatedBridge::new(
            credentials,
            state.http_scope.clone(),
            state.room_connector.clone(),
            &state.config,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BridgeState::*;

    #[test]
    fn test_direct_handshake_path_is_legal() {
        let path = [Idle, RendererRequested, RendererReady, Active, Terminating, Closed];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_agent_mediated_path_is_legal() {
        let path = [
            Idle,
            RoomJoining,
            RoomBound,
            RendererRequested,
            RendererReady,
            Active,
            Terminating,
            Closed,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_early_failure_can_terminate() {
        for state in [Idle, RendererRequested, RendererReady, RoomJoining, RoomBound] {
            assert!(state.can_transition_to(Terminating));
        }
    }

    #[test]
    fn test_closed_is_terminal() {
        for next in [Idle, Active, Terminating, Closed] {
            assert!(!Closed.can_transition_to(next));
        }
        assert!(!Terminating.can_transition_to(Active));
        assert!(!Idle.can_transition_to(Active));
    }

    #[test]
    fn test_lifecycle_tracks_state() {
        let mut lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.current(), Idle);
        lifecycle.advance(RoomJoining);
        lifecycle.advance(RoomBound);
        assert_eq!(lifecycle.current(), RoomBound);
        assert_eq!(RoomBound.to_string(), "room_bound");
    }
}
