use crate::error::SignalingError;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Callbacks of one direction of an unordered, unacknowledged data channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Open,
    Message(Bytes),
    Closed,
}

/// Send side primitives of a data channel. No acknowledgement, no ordering.
#[async_trait]
pub trait ChannelEndpoint: Send + Sync + 'static {
    fn ready_state(&self) -> ChannelState;

    async fn send(&self, text: String) -> Result<(), SignalingError>;

    async fn close(&self);
}

/// One direction of a channel: the endpoint plus its callback stream.
pub struct ChannelHalf {
    pub endpoint: Arc<dyn ChannelEndpoint>,
    pub events: mpsc::UnboundedReceiver<ChannelEvent>,
}
