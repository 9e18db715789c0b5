//! Session Supervisor
//!
//! Holds an active bridge open for a bounded wall-clock duration. The wait is a
//! single timed future raced against the bridge's own disconnect signal and an
//! external cancellation token; whichever fires first, the bridge is torn down
//! through the same `terminate` path.

use crate::bridge::Bridge;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Why a supervised bridge stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The keepalive duration elapsed.
    Timeout,
    /// The bridge's connection went away first.
    Disconnected,
    /// The surrounding platform asked us to stop.
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct Supervisor {
    duration: Duration,
    cancel: CancellationToken,
}

impl Supervisor {
    pub fn new(duration: Duration, cancel: CancellationToken) -> Self {
        Self { duration, cancel }
    }

    /// Waits for the first termination condition, then terminates `bridge`.
    pub async fn supervise(&self, bridge: &mut dyn Bridge) -> Termination {
        info!(duration = ?self.duration, "Avatar session active");
        let reason = tokio::select! {
            _ = tokio::time::sleep(self.duration) => Termination::Timeout,
            _ = bridge.disconnected() => Termination::Disconnected,
            _ = self.cancel.cancelled() => Termination::Cancelled,
        };
        info!(?reason, "Avatar session ending");
        bridge.terminate().await;
        reason
    }
}
