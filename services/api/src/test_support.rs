//! Shared fakes for bridge, session and router tests.

use crate::config::{BridgeStrategy, Config, Credentials};
use crate::state::AppState;
use async_trait::async_trait;
use avatar_core::access_token::GrantClaims;
use avatar_core::http_scope::{HttpLease, HttpScope};
use avatar_core::llm_client::{DEFAULT_MODEL, GEMINI_OPENAI_API_BASE};
use avatar_core::room::{PlatformCredentials, RoomConnection, RoomConnector, RoomError};
use avatar_core::simli::SimliConfig;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use secrecy::SecretString;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::Level;

pub const TEST_API_SECRET: &str = "lk-secret";

/// Hands out real clients and counts acquisitions and releases.
#[derive(Clone, Default)]
pub struct CountingScope {
    acquired: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl CountingScope {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl HttpScope for CountingScope {
    fn acquire(&self) -> Result<HttpLease, reqwest::Error> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        let released = self.released.clone();
        Ok(HttpLease::new(reqwest::Client::new()).on_release(move || {
            released.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

struct FakeRoomInner {
    closes: AtomicUsize,
    gone: watch::Sender<bool>,
}

/// A room connection whose disconnect is triggered by the test.
#[derive(Clone)]
pub struct FakeRoom {
    inner: Arc<FakeRoomInner>,
}

impl Default for FakeRoom {
    fn default() -> Self {
        let (gone, _) = watch::channel(false);
        Self {
            inner: Arc::new(FakeRoomInner {
                closes: AtomicUsize::new(0),
                gone,
            }),
        }
    }
}

impl FakeRoom {
    pub fn closes(&self) -> usize {
        self.inner.closes.load(Ordering::SeqCst)
    }

    pub fn disconnect(&self) {
        self.inner.gone.send_replace(true);
    }
}

#[async_trait]
impl RoomConnection for FakeRoom {
    async fn disconnected(&mut self) {
        let mut gone = self.inner.gone.subscribe();
        let _ = gone.wait_for(|gone| *gone).await;
    }

    async fn close(&mut self) -> Result<(), RoomError> {
        self.inner.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

mockall::mock! {
    pub Connector {}

    #[async_trait]
    impl RoomConnector for Connector {
        async fn connect(&self, url: &str, token: &str) -> Result<Box<dyn RoomConnection>, RoomError>;
    }
}

/// Decodes a grant signed with [`TEST_API_SECRET`].
pub fn decode_grant(token: &str) -> GrantClaims {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;
    decode::<GrantClaims>(
        token,
        &DecodingKey::from_secret(TEST_API_SECRET.as_bytes()),
        &validation,
    )
    .expect("grant should decode with the test secret")
    .claims
}

pub fn credential_map() -> HashMap<String, String> {
    [
        ("LIVEKIT_URL", "wss://demo.livekit.cloud"),
        ("LIVEKIT_API_KEY", "lk-key"),
        ("LIVEKIT_API_SECRET", TEST_API_SECRET),
        ("SIMLI_API_KEY", "simli-key"),
        ("SIMLI_FACE_ID", "face-1"),
        ("GOOGLE_API_KEY", "google-key"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

pub fn test_credentials() -> Credentials {
    Credentials {
        platform: PlatformCredentials {
            url: "wss://demo.livekit.cloud".to_string(),
            api_key: "lk-key".to_string(),
            api_secret: SecretString::from(TEST_API_SECRET),
        },
        simli: SimliConfig::new(SecretString::from("simli-key"), "face-1"),
        google_api_key: Some(SecretString::from("google-key")),
    }
}

pub fn test_config(simli_api_url: String) -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().expect("valid socket address"),
        log_level: Level::DEBUG,
        strategy: BridgeStrategy::DirectHandshake,
        simli_api_url,
        session_duration: Duration::from_millis(50),
        llm_model: DEFAULT_MODEL.to_string(),
        llm_api_base: GEMINI_OPENAI_API_BASE.to_string(),
    }
}

/// App state wired to fakes; the room connector rejects every call unless replaced.
pub fn test_state(config: Config, credentials: HashMap<String, String>) -> AppState {
    AppState {
        config: Arc::new(config),
        credentials: Arc::new(credentials),
        http_scope: Arc::new(CountingScope::default()),
        room_connector: Arc::new(MockConnector::new()),
        shutdown: CancellationToken::new(),
    }
}
