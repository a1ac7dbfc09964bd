use crate::connection::InboundRequest;
use huddle_core::Notification;
use tokio::sync::mpsc;

/// What the aggregate reports upward, independent of which member produced it.
#[derive(Debug)]
pub enum SignalingEvent {
    /// First member came up (or one came back after all of them dropped).
    Connected,

    /// Members remain, but none of them is currently connected.
    Reconnecting,

    /// No members left.
    Closed,

    Error(String),

    Notification(Notification),

    Request(InboundRequest),
}

pub type SignalingEvents = mpsc::UnboundedReceiver<SignalingEvent>;
