use crate::error::SignalingError;
use crate::loopback::RequestHandler;
use crate::socket::{Ack, DisconnectReason, SocketCarrier, SocketCarrierEvent};
use async_trait::async_trait;
use huddle_core::{Notification, Request, WireMessage};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

/// One event the client emitted, as seen by the loopback server.
#[derive(Debug)]
pub struct Emitted {
    pub event: String,
    pub payload: Value,
    pub ack: Option<oneshot::Sender<Ack>>,
}

/// In-memory socket carrier. Unanswered acks never resolve, like a silent server.
pub struct LoopbackSocket {
    connected: AtomicBool,
    emits: AtomicUsize,
    events: mpsc::UnboundedSender<SocketCarrierEvent>,
    emitted: mpsc::UnboundedSender<Emitted>,
}

impl LoopbackSocket {
    /// Returns the carrier, its callback stream (for the connection) and the
    /// server-side stream of emitted events.
    pub fn new() -> (
        Arc<Self>,
        mpsc::UnboundedReceiver<SocketCarrierEvent>,
        mpsc::UnboundedReceiver<Emitted>,
    ) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let (emitted, emitted_rx) = mpsc::unbounded_channel();
        let socket = Arc::new(Self {
            connected: AtomicBool::new(false),
            emits: AtomicUsize::new(0),
            events,
            emitted,
        });
        (socket, events_rx, emitted_rx)
    }

    /// Number of emits the client made so far, acknowledged or not.
    pub fn emit_count(&self) -> usize {
        self.emits.load(Ordering::Acquire)
    }

    pub fn connect(&self) {
        self.connected.store(true, Ordering::Release);
        let _ = self.events.send(SocketCarrierEvent::Connect);
    }

    pub fn drop_link(&self, reason: DisconnectReason) {
        self.connected.store(false, Ordering::Release);
        let _ = self.events.send(SocketCarrierEvent::Disconnect(reason));
    }

    pub fn reconnect_attempt(&self, attempt: u32) {
        let _ = self
            .events
            .send(SocketCarrierEvent::ReconnectAttempt(attempt));
    }

    pub fn push_notification(&self, notification: Notification) {
        let payload = serde_json::to_value(WireMessage::Notification(notification))
            .unwrap_or(Value::Null);
        let _ = self.events.send(SocketCarrierEvent::Message {
            event: "notification".to_owned(),
            payload,
            ack: None,
        });
    }

    /// Sends a server request to the client; resolves with the client's answer.
    pub fn push_request(&self, request: Request) -> oneshot::Receiver<Ack> {
        let (ack, rx) = oneshot::channel();
        let payload = serde_json::to_value(WireMessage::Request(request)).unwrap_or(Value::Null);
        let _ = self.events.send(SocketCarrierEvent::Message {
            event: "request".to_owned(),
            payload,
            ack: Some(ack),
        });
        rx
    }

    /// Acknowledges every client request with `handler`.
    pub fn serve(
        mut emitted: mpsc::UnboundedReceiver<Emitted>,
        handler: RequestHandler,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(emit) = emitted.recv().await {
                let Some(ack) = emit.ack else {
                    debug!("Loopback socket received '{}' event", emit.event);
                    continue;
                };
                let answer = match serde_json::from_value::<WireMessage>(emit.payload) {
                    Ok(WireMessage::Request(request)) => handler(&request),
                    _ => Err("malformed request".to_owned()),
                };
                let _ = ack.send(answer);
            }
        })
    }
}

#[async_trait]
impl SocketCarrier for LoopbackSocket {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn emit(&self, event: &str, payload: Value) -> Result<(), SignalingError> {
        if !self.is_connected() {
            return Err(SignalingError::NotConnected);
        }
        self.emits.fetch_add(1, Ordering::AcqRel);
        self.emitted
            .send(Emitted {
                event: event.to_owned(),
                payload,
                ack: None,
            })
            .map_err(|_| SignalingError::Carrier("loopback server is gone".to_owned()))
    }

    async fn emit_with_ack(&self, event: &str, payload: Value) -> Result<Ack, SignalingError> {
        if !self.is_connected() {
            return Err(SignalingError::NotConnected);
        }
        self.emits.fetch_add(1, Ordering::AcqRel);

        let (ack, rx) = oneshot::channel();
        self.emitted
            .send(Emitted {
                event: event.to_owned(),
                payload,
                ack: Some(ack),
            })
            .map_err(|_| SignalingError::Carrier("loopback server is gone".to_owned()))?;

        match rx.await {
            Ok(answer) => Ok(answer),
            Err(_) => std::future::pending().await,
        }
    }

    fn disconnect(&self) {
        if self.connected.swap(false, Ordering::AcqRel) {
            let _ = self
                .events
                .send(SocketCarrierEvent::Disconnect(DisconnectReason::ClientClosed));
        }
    }
}
