use crate::channel::{ChannelEndpoint, ChannelEvent, ChannelHalf, ChannelState};
use crate::error::SignalingError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;

/// [`ChannelEndpoint`] backed by a WebRTC data channel.
pub struct DataChannelEndpoint {
    channel: Arc<RTCDataChannel>,
}

impl DataChannelEndpoint {
    /// Hooks the channel callbacks and returns them as a [`ChannelHalf`].
    pub fn attach(channel: Arc<RTCDataChannel>) -> ChannelHalf {
        let (tx, events) = mpsc::unbounded_channel();

        let open_tx = tx.clone();
        channel.on_open(Box::new(move || {
            let tx = open_tx.clone();
            Box::pin(async move {
                let _ = tx.send(ChannelEvent::Open);
            })
        }));

        let msg_tx = tx.clone();
        channel.on_message(Box::new(move |msg: DataChannelMessage| {
            let tx = msg_tx.clone();
            Box::pin(async move {
                let _ = tx.send(ChannelEvent::Message(msg.data));
            })
        }));

        let close_tx = tx;
        channel.on_close(Box::new(move || {
            let tx = close_tx.clone();
            Box::pin(async move {
                let _ = tx.send(ChannelEvent::Closed);
            })
        }));

        ChannelHalf {
            endpoint: Arc::new(Self { channel }),
            events,
        }
    }
}

#[async_trait]
impl ChannelEndpoint for DataChannelEndpoint {
    fn ready_state(&self) -> ChannelState {
        match self.channel.ready_state() {
            RTCDataChannelState::Open => ChannelState::Open,
            RTCDataChannelState::Closing => ChannelState::Closing,
            RTCDataChannelState::Closed => ChannelState::Closed,
            _ => ChannelState::Connecting,
        }
    }

    async fn send(&self, text: String) -> Result<(), SignalingError> {
        self.channel
            .send_text(text)
            .await
            .map(|_| ())
            .map_err(|e| SignalingError::Carrier(e.to_string()))
    }

    async fn close(&self) {
        if let Err(e) = self.channel.close().await {
            warn!("Failed to close data channel '{}': {}", self.channel.label(), e);
        }
    }
}
