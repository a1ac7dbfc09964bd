use crate::config::SocketConfig;
use crate::connection::{Connection, ConnectionEvent, ConnectionEvents, InboundRequest, Lifecycle};
use crate::error::SignalingError;
use crate::socket::{Ack, SocketCarrier, SocketCarrierEvent};
use async_trait::async_trait;
use huddle_core::{CodecError, ConnectionId, Notification, Request, WireMessage};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const REQUEST_EVENT: &str = "request";
pub const NOTIFICATION_EVENT: &str = "notification";

/// Connection over a socket carrier that acknowledges every request itself.
pub struct SocketConnection {
    inner: Arc<SocketInner>,
}

struct SocketInner {
    id: ConnectionId,
    carrier: Arc<dyn SocketCarrier>,
    config: SocketConfig,
    lifecycle: Lifecycle,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl SocketConnection {
    pub fn new(
        carrier: Arc<dyn SocketCarrier>,
        carrier_events: mpsc::UnboundedReceiver<SocketCarrierEvent>,
        config: SocketConfig,
    ) -> (Self, ConnectionEvents) {
        let (lifecycle, events) = Lifecycle::new();
        let inner = Arc::new(SocketInner {
            id: ConnectionId::new(),
            carrier,
            config,
            lifecycle,
            pump: Mutex::new(None),
        });

        if inner.carrier.is_connected() && inner.lifecycle.mark_connected() {
            inner.lifecycle.emit(ConnectionEvent::Connected);
        }

        let pump = tokio::spawn(SocketInner::pump(inner.clone(), carrier_events));
        if let Ok(mut slot) = inner.pump.lock() {
            *slot = Some(pump);
        }

        (Self { inner }, events)
    }
}

impl SocketInner {
    async fn pump(
        inner: Arc<SocketInner>,
        mut carrier_events: mpsc::UnboundedReceiver<SocketCarrierEvent>,
    ) {
        while let Some(event) = carrier_events.recv().await {
            if inner.lifecycle.is_closed() {
                break;
            }

            match event {
                SocketCarrierEvent::Connect => {
                    if inner.lifecycle.mark_connected() {
                        info!("Socket connection {} connected", inner.id);
                        inner.lifecycle.emit(ConnectionEvent::Connected);
                    }
                }

                SocketCarrierEvent::Disconnect(reason) if reason.is_terminal() => {
                    info!("Socket connection {} closed by {:?}", inner.id, reason);
                    inner.shutdown();
                    break;
                }

                SocketCarrierEvent::Disconnect(reason) => {
                    warn!(
                        "Socket connection {} dropped ({:?}), waiting for reconnect",
                        inner.id, reason
                    );
                    inner.lifecycle.mark_disconnected();
                    inner
                        .lifecycle
                        .emit(ConnectionEvent::Reconnecting { attempt: 0 });
                }

                SocketCarrierEvent::ReconnectAttempt(attempt) => {
                    debug!("Socket connection {} reconnect attempt {}", inner.id, attempt);
                    inner
                        .lifecycle
                        .emit(ConnectionEvent::Reconnecting { attempt });
                }

                SocketCarrierEvent::ConnectError(reason) => {
                    warn!("Socket connection {} connect error: {}", inner.id, reason);
                    inner.lifecycle.emit(ConnectionEvent::Error(reason));
                }

                SocketCarrierEvent::Message {
                    event,
                    payload,
                    ack,
                } => inner.handle_message(&event, payload, ack),
            }
        }
    }

    fn handle_message(&self, event: &str, payload: Value, ack: Option<oneshot::Sender<Ack>>) {
        let msg = match serde_json::from_value::<WireMessage>(payload) {
            Ok(msg) => msg,
            Err(e) => {
                debug!("Dropping malformed '{}' frame on {}: {}", event, self.id, e);
                return;
            }
        };

        match msg {
            WireMessage::Notification(notification) => {
                self.lifecycle
                    .emit(ConnectionEvent::Notification(notification));
            }

            WireMessage::Request(request) => {
                let Some(ack) = ack else {
                    warn!(
                        "Request '{}' on {} arrived without an ack, ignoring",
                        request.method, self.id
                    );
                    return;
                };

                let (inbound, reply) = InboundRequest::new(request);
                self.lifecycle.emit(ConnectionEvent::Request(inbound));

                tokio::spawn(async move {
                    let answer = reply
                        .await
                        .unwrap_or_else(|_| Err(SignalingError::RequestDropped.to_string()));
                    let _ = ack.send(answer);
                });
            }

            WireMessage::Response(response) => {
                debug!(
                    "Unexpected response frame {} on socket connection {}",
                    response.id, self.id
                );
            }
        }
    }

    fn shutdown(&self) {
        if !self.lifecycle.mark_closed() {
            return;
        }

        self.carrier.disconnect();

        if let Ok(mut slot) = self.pump.lock() {
            if let Some(pump) = slot.take() {
                pump.abort();
            }
        }

        info!("Socket connection {} shut down", self.id);
    }
}

#[async_trait]
impl Connection for SocketConnection {
    fn id(&self) -> &ConnectionId {
        &self.inner.id
    }

    fn is_connected(&self) -> bool {
        self.inner.lifecycle.is_connected()
    }

    fn is_closed(&self) -> bool {
        self.inner.lifecycle.is_closed()
    }

    async fn notify(&self, notification: Notification) -> Result<(), SignalingError> {
        if self.inner.lifecycle.is_closed() {
            return Err(SignalingError::TransportClosed);
        }

        let payload = serde_json::to_value(WireMessage::from(notification))
            .map_err(CodecError::from)?;
        self.inner.carrier.emit(NOTIFICATION_EVENT, payload).await
    }

    async fn request(&self, request: Request) -> Result<Value, SignalingError> {
        if self.inner.lifecycle.is_closed() {
            return Err(SignalingError::TransportClosed);
        }

        let method = request.method.clone();
        let payload =
            serde_json::to_value(WireMessage::from(request)).map_err(CodecError::from)?;
        let attempts = self.inner.config.request_attempts.max(1);

        for attempt in 1..=attempts {
            if self.inner.lifecycle.is_closed() {
                return Err(SignalingError::TransportClosed);
            }

            let sent = self
                .inner
                .carrier
                .emit_with_ack(REQUEST_EVENT, payload.clone());

            let outcome = tokio::select! {
                outcome = tokio::time::timeout(self.inner.config.request_timeout(), sent) => outcome,
                _ = self.inner.lifecycle.closed() => {
                    debug!("Request '{}' on {} cut short by close", method, self.inner.id);
                    return Err(SignalingError::TransportClosed);
                }
            };

            match outcome {
                Ok(Ok(Ok(data))) => return Ok(data),
                Ok(Ok(Err(reason))) => return Err(SignalingError::Remote(reason)),
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    warn!(
                        "Request '{}' on {} timed out (attempt {}/{})",
                        method, self.inner.id, attempt, attempts
                    );
                }
            }
        }

        Err(SignalingError::Timeout { method, attempts })
    }

    async fn close(&self) {
        if self.inner.lifecycle.is_closed() {
            return;
        }
        self.inner.shutdown();
    }
}
