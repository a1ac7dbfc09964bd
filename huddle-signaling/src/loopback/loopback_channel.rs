use crate::channel::{ChannelEndpoint, ChannelEvent, ChannelHalf, ChannelState};
use crate::error::SignalingError;
use crate::loopback::RequestHandler;
use async_trait::async_trait;
use bytes::Bytes;
use huddle_core::{Notification, Response, WireMessage};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// One direction of an in-memory data channel.
pub struct LoopbackChannel {
    state: Mutex<ChannelState>,
    events: mpsc::UnboundedSender<ChannelEvent>,
    sent: mpsc::UnboundedSender<String>,
}

impl LoopbackChannel {
    fn new(open: bool) -> (Arc<Self>, ChannelHalf, mpsc::UnboundedReceiver<String>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let (sent, sent_rx) = mpsc::unbounded_channel();
        let state = if open {
            ChannelState::Open
        } else {
            ChannelState::Connecting
        };
        let channel = Arc::new(Self {
            state: Mutex::new(state),
            events,
            sent,
        });
        let half = ChannelHalf {
            endpoint: channel.clone(),
            events: events_rx,
        };
        (channel, half, sent_rx)
    }

    fn set_state(&self, state: ChannelState) {
        if let Ok(mut current) = self.state.lock() {
            *current = state;
        }
    }

    /// Simulates the channel finishing its handshake.
    pub fn open(&self) {
        self.set_state(ChannelState::Open);
        let _ = self.events.send(ChannelEvent::Open);
    }

    /// Delivers raw text as if it arrived from the remote side.
    pub fn deliver(&self, text: impl Into<String>) {
        let _ = self
            .events
            .send(ChannelEvent::Message(Bytes::from(text.into())));
    }

    /// Simulates the remote side tearing the channel down.
    pub fn close_remotely(&self) {
        self.set_state(ChannelState::Closed);
        let _ = self.events.send(ChannelEvent::Closed);
    }
}

#[async_trait]
impl ChannelEndpoint for LoopbackChannel {
    fn ready_state(&self) -> ChannelState {
        self.state
            .lock()
            .map(|state| *state)
            .unwrap_or(ChannelState::Closed)
    }

    async fn send(&self, text: String) -> Result<(), SignalingError> {
        if self.ready_state() != ChannelState::Open {
            return Err(SignalingError::Carrier("channel is not open".to_owned()));
        }
        self.sent
            .send(text)
            .map_err(|_| SignalingError::Carrier("remote side is gone".to_owned()))
    }

    async fn close(&self) {
        self.set_state(ChannelState::Closed);
    }
}

/// Server view of a loopback channel pair.
pub struct ChannelLink {
    /// What the client sends on.
    pub outgoing: Arc<LoopbackChannel>,
    /// What the client receives on.
    pub incoming: Arc<LoopbackChannel>,
    sent: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
}

/// Builds the two client-side halves plus the server view that drives them.
pub fn channel_link(open: bool) -> (ChannelLink, ChannelHalf, ChannelHalf) {
    let (outgoing, outgoing_half, sent) = LoopbackChannel::new(open);
    let (incoming, incoming_half, _) = LoopbackChannel::new(open);
    let link = ChannelLink {
        outgoing,
        incoming,
        sent: tokio::sync::Mutex::new(sent),
    };
    (link, outgoing_half, incoming_half)
}

impl ChannelLink {
    /// Next frame the client sent, as decoded wire message.
    pub async fn next_frame(&self) -> Option<WireMessage> {
        let text = self.sent.lock().await.recv().await?;
        WireMessage::parse(&text)
    }

    pub fn push(&self, msg: WireMessage) {
        if let Ok(text) = msg.encode() {
            self.incoming.deliver(text);
        }
    }

    pub fn push_notification(&self, notification: Notification) {
        self.push(WireMessage::Notification(notification));
    }

    /// Answers every client request with `handler` until the link goes away.
    pub fn serve(self: Arc<Self>, handler: RequestHandler) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(frame) = self.next_frame().await {
                let WireMessage::Request(request) = frame else {
                    debug!("Loopback server ignoring non-request frame");
                    continue;
                };
                let response = match handler(&request) {
                    Ok(data) => Response::success(&request, data),
                    Err(reason) => Response::error(&request, reason),
                };
                self.push(WireMessage::Response(response));
            }
        })
    }
}
