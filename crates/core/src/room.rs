//! Room Platform Connections
//!
//! Defines the seam between the bridge and the conferencing platform. The
//! production implementation holds a signalling WebSocket open for the room
//! and reports when the platform drops it.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use prost::Message;
use secrecy::SecretString;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite};
use tracing::{debug, info, warn};

/// Interval between signal keepalive pings.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(5);

/// Signal protocol revision announced on connect.
const SIGNAL_PROTOCOL_VERSION: u32 = 9;

/// Connection details for the room platform.
#[derive(Debug, Clone)]
pub struct PlatformCredentials {
    pub url: String,
    pub api_key: String,
    pub api_secret: SecretString,
}

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("invalid room platform URL '{0}'")]
    InvalidUrl(String),
    #[error("room platform rejected the connection with HTTP {0}")]
    Rejected(u16),
    #[error("failed to connect to room: {0}")]
    Connect(String),
    #[error("room transport error: {0}")]
    Transport(String),
}

/// Opens connections to rooms on the platform.
#[async_trait]
pub trait RoomConnector: Send + Sync {
    /// Joins the room named in `token` at the platform `url`.
    async fn connect(&self, url: &str, token: &str) -> Result<Box<dyn RoomConnection>, RoomError>;
}

/// A live room connection owned by one bridge.
#[async_trait]
pub trait RoomConnection: Send {
    /// Resolves once the platform side has gone away.
    async fn disconnected(&mut self);

    /// Leaves the room. Calling this more than once is a no-op.
    async fn close(&mut self) -> Result<(), RoomError>;
}

/// Builds the signalling endpoint for `base`, mapping `http(s)` to `ws(s)`.
pub fn signal_url(base: &str, token: &str) -> Result<String, RoomError> {
    let base = base.trim().trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if base.starts_with("wss://") || base.starts_with("ws://") {
        base.to_string()
    } else {
        return Err(RoomError::InvalidUrl(base.to_string()));
    };

    Ok(format!(
        "{ws_base}/rtc?access_token={token}&auto_subscribe=1&sdk=rust&protocol={SIGNAL_PROTOCOL_VERSION}"
    ))
}

/// Client-to-server signal frame. Only the keepalive ping is sent.
#[derive(Clone, PartialEq, Message)]
pub struct SignalRequest {
    #[prost(int64, optional, tag = "14")]
    pub ping: Option<i64>,
}

/// Server-to-client signal frame. Fields other than `leave` are skipped on decode.
#[derive(Clone, PartialEq, Message)]
pub struct SignalResponse {
    #[prost(message, optional, tag = "8")]
    pub leave: Option<LeaveRequest>,
}

/// The platform removing this participant from the room.
#[derive(Clone, PartialEq, Message)]
pub struct LeaveRequest {
    #[prost(bool, tag = "1")]
    pub can_reconnect: bool,
    #[prost(int32, tag = "2")]
    pub reason: i32,
}

/// Encodes a keepalive `SignalRequest` carrying `timestamp_ms`.
pub fn encode_signal_ping(timestamp_ms: i64) -> Vec<u8> {
    SignalRequest {
        ping: Some(timestamp_ms),
    }
    .encode_to_vec()
}

/// Connects over the platform's signalling WebSocket.
#[derive(Debug, Clone)]
pub struct SignalConnector {
    ping_interval: Duration,
}

impl SignalConnector {
    pub fn new(ping_interval: Duration) -> Self {
        Self { ping_interval }
    }
}

impl Default for SignalConnector {
    fn default() -> Self {
        Self::new(DEFAULT_PING_INTERVAL)
    }
}

#[async_trait]
impl RoomConnector for SignalConnector {
    async fn connect(&self, url: &str, token: &str) -> Result<Box<dyn RoomConnection>, RoomError> {
        let endpoint = signal_url(url, token)?;
        let (ws_stream, _) = connect_async(endpoint.as_str())
            .await
            .map_err(|e| match e {
                tungstenite::Error::Http(response) => RoomError::Rejected(response.status().as_u16()),
                other => RoomError::Connect(other.to_string()),
            })?;
        info!("Signal connection established");

        let (closed_tx, closed_rx) = watch::channel(false);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let ping_interval = self.ping_interval;

        let task = tokio::spawn(async move {
            let mut ws_stream = ws_stream;
            let mut ping = tokio::time::interval(ping_interval);
            ping.tick().await;

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        if let Err(e) = ws_stream.close(None).await {
                            debug!(error = %e, "Close frame could not be sent");
                        }
                        break;
                    }
                    _ = ping.tick() => {
                        let now = chrono::Utc::now().timestamp_millis();
                        let frame = tungstenite::Message::binary(encode_signal_ping(now));
                        if let Err(e) = ws_stream.send(frame).await {
                            warn!(error = %e, "Signal ping failed");
                            break;
                        }
                    }
                    msg = ws_stream.next() => match msg {
                        Some(Ok(tungstenite::Message::Close(frame))) => {
                            info!(?frame, "Room platform closed the signal connection");
                            break;
                        }
                        Some(Ok(tungstenite::Message::Binary(data))) => {
                            match SignalResponse::decode(&data[..]) {
                                Ok(SignalResponse { leave: Some(leave) }) => {
                                    info!(reason = leave.reason, "Room platform asked us to leave");
                                    if let Err(e) = ws_stream.close(None).await {
                                        debug!(error = %e, "Close frame could not be sent");
                                    }
                                    break;
                                }
                                Ok(_) => {}
                                Err(e) => debug!(error = %e, "Undecodable signal frame"),
                            }
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!(error = %e, "Signal connection error");
                            break;
                        }
                        None => break,
                    },
                }
            }
            let _ = closed_tx.send(true);
        });

        Ok(Box::new(SignalConnection {
            closed_rx,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }))
    }
}

pub struct SignalConnection {
    closed_rx: watch::Receiver<bool>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

#[async_trait]
impl RoomConnection for SignalConnection {
    async fn disconnected(&mut self) {
        // A dropped sender means the reader task is gone, which is a disconnect too.
        let _ = self.closed_rx.wait_for(|closed| *closed).await;
    }

    async fn close(&mut self) -> Result<(), RoomError> {
        if let Some(shutdown) = self.shutdown_tx.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            task.await
                .map_err(|e| RoomError::Transport(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for SignalConnection {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown_tx.take() {
            let _ = shutdown.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_signal_url_scheme_mapping() {
        assert_eq!(
            signal_url("https://demo.livekit.cloud/", "tok").unwrap(),
            "wss://demo.livekit.cloud/rtc?access_token=tok&auto_subscribe=1&sdk=rust&protocol=9"
        );
        assert!(
            signal_url("http://localhost:7880", "tok")
                .unwrap()
                .starts_with("ws://localhost:7880/rtc?")
        );
        assert!(
            signal_url("wss://demo.livekit.cloud", "tok")
                .unwrap()
                .starts_with("wss://demo.livekit.cloud/rtc?")
        );
        assert!(matches!(
            signal_url("demo.livekit.cloud", "tok"),
            Err(RoomError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_encode_signal_ping() {
        assert_eq!(encode_signal_ping(300), vec![0x70, 0xac, 0x02]);
        assert_eq!(encode_signal_ping(0), vec![0x70, 0x00]);
        let decoded = SignalRequest::decode(encode_signal_ping(1_700_000_000_000).as_slice()).unwrap();
        assert_eq!(decoded.ping, Some(1_700_000_000_000));
    }

    #[test]
    fn test_decode_leave_skips_unknown_fields() {
        // join response (field 1) followed by leave { reason: 4 }
        let frame = [0x0a, 0x00, 0x42, 0x02, 0x10, 0x04];
        let response = SignalResponse::decode(&frame[..]).unwrap();
        assert_eq!(response.leave.map(|l| l.reason), Some(4));

        let pong = [0x90, 0x01, 0x05];
        assert_eq!(SignalResponse::decode(&pong[..]).unwrap().leave, None);
    }

    #[tokio::test]
    async fn test_leave_reported_while_socket_stays_open() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (sent_tx, sent_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let leave = SignalResponse {
                leave: Some(LeaveRequest {
                    can_reconnect: false,
                    reason: 4,
                }),
            };
            ws.send(tungstenite::Message::binary(leave.encode_to_vec()))
                .await
                .unwrap();
            let _ = sent_tx.send(());
            while let Some(Ok(_)) = ws.next().await {}
        });

        let mut connection = SignalConnector::new(Duration::from_secs(60))
            .connect(&format!("ws://{addr}"), "token")
            .await
            .unwrap();
        sent_rx.await.unwrap();

        tokio::time::timeout(Duration::from_secs(2), connection.disconnected())
            .await
            .expect("leave should be reported as a disconnect");
        connection.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_disconnect_reported_when_server_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.close(None).await.unwrap();
        });

        let connector = SignalConnector::new(Duration::from_secs(60));
        let mut connection = connector
            .connect(&format!("http://{addr}"), "token")
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), connection.disconnected())
            .await
            .expect("disconnect should be observed");
        assert!(connection.close().await.is_ok());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        });

        let connector = SignalConnector::default();
        let mut connection = connector
            .connect(&format!("ws://{addr}"), "token")
            .await
            .unwrap();

        connection.close().await.unwrap();
        connection.close().await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), connection.disconnected())
            .await
            .expect("closed connection should count as disconnected");
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = SignalConnector::default()
            .connect(&format!("ws://{addr}"), "token")
            .await
            .err()
            .expect("connect should fail");
        assert!(matches!(err, RoomError::Connect(_)));
    }
}
