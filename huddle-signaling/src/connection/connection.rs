use crate::error::SignalingError;
use async_trait::async_trait;
use huddle_core::{ConnectionId, Notification, Request};
use serde_json::Value;

/// One physical signaling link to the room server.
///
/// Every method is a no-op once the connection is closed: `notify` and
/// `request` return [`SignalingError::TransportClosed`] without touching the
/// carrier, and `close` returns immediately.
#[async_trait]
pub trait Connection: Send + Sync + 'static {
    /// Stable identifier of the underlying transport.
    fn id(&self) -> &ConnectionId;

    fn is_connected(&self) -> bool;

    fn is_closed(&self) -> bool;

    /// Fire-and-forget.
    async fn notify(&self, notification: Notification) -> Result<(), SignalingError>;

    /// Sends a request and resolves with the response data.
    async fn request(&self, request: Request) -> Result<Value, SignalingError>;

    /// Terminal. Emits [`ConnectionEvent::Closed`](crate::ConnectionEvent::Closed) exactly once.
    async fn close(&self);
}
