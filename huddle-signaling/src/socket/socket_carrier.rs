use crate::error::SignalingError;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;

/// Server acknowledgement: response data or the server's error reason.
pub type Ack = Result<Value, String>;

/// Why the carrier went down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The server closed the session on purpose.
    ServerClosed,
    /// We called `disconnect`.
    ClientClosed,
    TransportClosed,
    TransportError,
    PingTimeout,
}

impl DisconnectReason {
    /// Terminal reasons end the connection; the rest are followed by a reconnect.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DisconnectReason::ServerClosed | DisconnectReason::ClientClosed
        )
    }
}

/// Callbacks of a reconnecting, server-acknowledged duplex socket.
#[derive(Debug)]
pub enum SocketCarrierEvent {
    Connect,
    Disconnect(DisconnectReason),
    ReconnectAttempt(u32),
    ConnectError(String),
    /// Inbound event. `ack` is present when the server expects an answer.
    Message {
        event: String,
        payload: Value,
        ack: Option<oneshot::Sender<Ack>>,
    },
}

#[async_trait]
pub trait SocketCarrier: Send + Sync + 'static {
    fn is_connected(&self) -> bool;

    async fn emit(&self, event: &str, payload: Value) -> Result<(), SignalingError>;

    /// Resolves with the server acknowledgement. Has no timeout of its own.
    async fn emit_with_ack(&self, event: &str, payload: Value) -> Result<Ack, SignalingError>;

    fn disconnect(&self);
}
