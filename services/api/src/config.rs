use avatar_core::llm_client::{DEFAULT_MODEL, GEMINI_OPENAI_API_BASE};
use avatar_core::room::PlatformCredentials;
use avatar_core::simli::{DEFAULT_API_URL, SimliConfig};
use secrecy::SecretString;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// Keepalive duration for an active bridge (15 minutes).
pub const DEFAULT_SESSION_SECONDS: u64 = 900;

const LIVEKIT_URL: &str = "LIVEKIT_URL";
const LIVEKIT_API_KEY: &str = "LIVEKIT_API_KEY";
const LIVEKIT_API_SECRET: &str = "LIVEKIT_API_SECRET";
const SIMLI_API_KEY: &str = "SIMLI_API_KEY";
const SIMLI_FACE_ID: &str = "SIMLI_FACE_ID";
const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
    #[error("Missing {group} credentials: {}", .missing.join(", "))]
    MissingCredentials {
        group: CredentialGroup,
        missing: Vec<&'static str>,
    },
}

/// The credential sets the bridge depends on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialGroup {
    Platform,
    Avatar,
    Llm,
}

impl fmt::Display for CredentialGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialGroup::Platform => write!(f, "LiveKit"),
            CredentialGroup::Avatar => write!(f, "Simli"),
            CredentialGroup::Llm => write!(f, "LLM"),
        }
    }
}

/// How the avatar gets into the room.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BridgeStrategy {
    /// The avatar provider joins the room itself after a direct handshake.
    DirectHandshake,
    /// We join the room and attach the avatar to a conversational agent.
    AgentMediated,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub strategy: BridgeStrategy,
    pub simli_api_url: String,
    pub session_duration: Duration,
    pub llm_model: String,
    pub llm_api_base: String,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let strategy_str =
            std::env::var("AVATAR_BRIDGE_STRATEGY").unwrap_or_else(|_| "direct".to_string());
        let strategy = match strategy_str.to_lowercase().as_str() {
            "direct" => BridgeStrategy::DirectHandshake,
            "agent" => BridgeStrategy::AgentMediated,
            other => {
                return Err(ConfigError::InvalidValue(
                    "AVATAR_BRIDGE_STRATEGY".to_string(),
                    format!("'{}' is not one of 'direct' or 'agent'", other),
                ));
            }
        };

        let simli_api_url =
            std::env::var("SIMLI_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let session_seconds = match std::env::var("AVATAR_SESSION_SECONDS") {
            Ok(value) => value.parse::<u64>().map_err(|e| {
                ConfigError::InvalidValue("AVATAR_SESSION_SECONDS".to_string(), e.to_string())
            })?,
            Err(_) => DEFAULT_SESSION_SECONDS,
        };

        let llm_model = std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let llm_api_base =
            std::env::var("LLM_API_BASE").unwrap_or_else(|_| GEMINI_OPENAI_API_BASE.to_string());

        Ok(Self {
            bind_address,
            log_level,
            strategy,
            simli_api_url,
            session_duration: Duration::from_secs(session_seconds),
            llm_model,
            llm_api_base,
        })
    }
}

/// Where per-invocation credentials are read from.
pub trait CredentialSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads credentials from the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl CredentialSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Everything the bridge needs to authenticate against its collaborators.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub platform: PlatformCredentials,
    pub simli: SimliConfig,
    pub google_api_key: Option<SecretString>,
}

impl Credentials {
    /// Loads and validates the credentials `strategy` requires.
    ///
    /// Groups are checked platform first, then avatar, then LLM; the first
    /// incomplete group is reported with all of its missing variables.
    pub fn load(
        source: &dyn CredentialSource,
        strategy: BridgeStrategy,
    ) -> Result<Self, ConfigError> {
        let platform = load_platform(source)?;

        let [api_key, face_id] =
            require_group(source, CredentialGroup::Avatar, [SIMLI_API_KEY, SIMLI_FACE_ID])?;
        let simli = SimliConfig::new(SecretString::from(api_key), face_id);

        let google_api_key = match strategy {
            BridgeStrategy::AgentMediated => {
                let [key] = require_group(source, CredentialGroup::Llm, [GOOGLE_API_KEY])?;
                Some(SecretString::from(key))
            }
            BridgeStrategy::DirectHandshake => None,
        };

        Ok(Self {
            platform,
            simli,
            google_api_key,
        })
    }
}

/// Loads only the room platform credentials.
pub fn load_platform(source: &dyn CredentialSource) -> Result<PlatformCredentials, ConfigError> {
    let [url, api_key, api_secret] = require_group(
        source,
        CredentialGroup::Platform,
        [LIVEKIT_URL, LIVEKIT_API_KEY, LIVEKIT_API_SECRET],
    )?;
    Ok(PlatformCredentials {
        url,
        api_key,
        api_secret: SecretString::from(api_secret),
    })
}

fn require_group<const N: usize>(
    source: &dyn CredentialSource,
    group: CredentialGroup,
    keys: [&'static str; N],
) -> Result<[String; N], ConfigError> {
    let values = keys.map(|key| present(source, key));
    let missing: Vec<&'static str> = keys
        .iter()
        .zip(values.iter())
        .filter(|(_, value)| value.is_none())
        .map(|(key, _)| *key)
        .collect();

    if !missing.is_empty() {
        return Err(ConfigError::MissingCredentials { group, missing });
    }
    Ok(values.map(Option::unwrap_or_default))
}

/// Blank values and unreplaced `placeholder` values count as absent.
fn present(source: &dyn CredentialSource, key: &str) -> Option<String> {
    source
        .get(key)
        .filter(|value| !value.trim().is_empty() && !value.contains("placeholder"))
}
