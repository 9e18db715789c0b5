pub mod access_token;
pub mod agent;
pub mod http_scope;
pub mod llm_client;
pub mod room;
pub mod simli;

/// Participant identity the avatar bridge joins interview rooms under.
pub const AVATAR_IDENTITY: &str = "simli-avatar";

/// Display name shown for the avatar when the caller does not pick one.
pub const DEFAULT_DISPLAY_NAME: &str = "AI Interviewer";
