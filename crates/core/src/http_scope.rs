//! Scoped HTTP client.
//!
//! An [`HttpLease`] owns one HTTP client for the duration of a bridge. The
//! lease is released exactly once: either explicitly via [`HttpLease::release`]
//! or when it is dropped on any exit path.

use reqwest::Client;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Request timeout applied to leased clients.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

type ReleaseHook = Box<dyn FnOnce() + Send + Sync>;

pub struct HttpLease {
    client: Client,
    on_release: Option<ReleaseHook>,
}

impl HttpLease {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            on_release: None,
        }
    }

    /// Registers a hook that runs when the lease is released.
    pub fn on_release(mut self, hook: impl FnOnce() + Send + Sync + 'static) -> Self {
        self.on_release = Some(Box::new(hook));
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn release(self) {
        drop(self);
    }
}

impl Drop for HttpLease {
    fn drop(&mut self) {
        if let Some(hook) = self.on_release.take() {
            hook();
        }
        debug!("HTTP client lease released");
    }
}

impl fmt::Debug for HttpLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpLease").finish_non_exhaustive()
    }
}

/// Source of scoped HTTP clients.
pub trait HttpScope: Send + Sync {
    fn acquire(&self) -> Result<HttpLease, reqwest::Error>;
}

/// Builds a fresh client with a request timeout for every lease.
#[derive(Debug, Clone)]
pub struct DefaultHttpScope {
    timeout: Duration,
}

impl DefaultHttpScope {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for DefaultHttpScope {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl HttpScope for DefaultHttpScope {
    fn acquire(&self) -> Result<HttpLease, reqwest::Error> {
        let client = Client::builder().timeout(self.timeout).build()?;
        debug!(timeout = ?self.timeout, "HTTP client lease acquired");
        Ok(HttpLease::new(client))
    }
}
