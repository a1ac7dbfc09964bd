use crate::channel::pending::PendingTable;
use crate::channel::{ChannelEndpoint, ChannelEvent, ChannelHalf, ChannelState};
use crate::config::ChannelConfig;
use crate::connection::{Connection, ConnectionEvent, ConnectionEvents, InboundRequest, Lifecycle};
use crate::error::SignalingError;
use async_trait::async_trait;
use bytes::Bytes;
use huddle_core::{ConnectionId, Notification, Request, Response, WireMessage};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Connection over a pair of data channels, correlating responses by id itself.
///
/// `outgoing` carries everything we send, `incoming` everything the server sends.
pub struct ChannelConnection {
    inner: Arc<ChannelInner>,
}

struct ChannelInner {
    id: ConnectionId,
    outgoing: Arc<dyn ChannelEndpoint>,
    incoming: Arc<dyn ChannelEndpoint>,
    config: ChannelConfig,
    lifecycle: Lifecycle,
    pending: Arc<PendingTable>,
    pumps: Mutex<Vec<JoinHandle<()>>>,
}

#[derive(Clone, Copy, Debug)]
enum Direction {
    Outgoing,
    Incoming,
}

impl ChannelConnection {
    pub fn new(
        outgoing: ChannelHalf,
        incoming: ChannelHalf,
        config: ChannelConfig,
    ) -> (Self, ConnectionEvents) {
        let (lifecycle, events) = Lifecycle::new();
        let inner = Arc::new(ChannelInner {
            id: ConnectionId::new(),
            outgoing: outgoing.endpoint,
            incoming: incoming.endpoint,
            config,
            lifecycle,
            pending: Arc::new(PendingTable::default()),
            pumps: Mutex::new(Vec::new()),
        });

        if inner.outgoing.ready_state() == ChannelState::Open {
            inner.on_outgoing_open();
        }

        let pumps = vec![
            tokio::spawn(ChannelInner::pump(
                inner.clone(),
                Direction::Outgoing,
                outgoing.events,
            )),
            tokio::spawn(ChannelInner::pump(
                inner.clone(),
                Direction::Incoming,
                incoming.events,
            )),
        ];
        if let Ok(mut slot) = inner.pumps.lock() {
            slot.extend(pumps);
        }

        (Self { inner }, events)
    }

    /// Requests still waiting for a response.
    pub fn pending_requests(&self) -> usize {
        self.inner.pending.len()
    }
}

impl ChannelInner {
    async fn pump(
        inner: Arc<ChannelInner>,
        direction: Direction,
        mut events: mpsc::UnboundedReceiver<ChannelEvent>,
    ) {
        while let Some(event) = events.recv().await {
            if inner.lifecycle.is_closed() {
                break;
            }

            match (direction, event) {
                (Direction::Outgoing, ChannelEvent::Open) => inner.on_outgoing_open(),

                (Direction::Incoming, ChannelEvent::Message(data)) => inner.handle_frame(data),

                (_, ChannelEvent::Closed) => {
                    info!(
                        "{:?} channel of connection {} closed",
                        direction, inner.id
                    );
                    inner.close().await;
                    break;
                }

                (direction, event) => {
                    debug!(
                        "Ignoring {:?} on {:?} channel of {}",
                        event, direction, inner.id
                    );
                }
            }
        }
    }

    fn on_outgoing_open(&self) {
        if self.lifecycle.mark_connected() {
            info!("Channel connection {} open", self.id);
            self.lifecycle.emit(ConnectionEvent::Connected);
        }
    }

    fn handle_frame(self: &Arc<Self>, data: Bytes) {
        let Ok(text) = std::str::from_utf8(&data) else {
            debug!("Dropping non UTF-8 frame on {}", self.id);
            return;
        };
        let Some(msg) = WireMessage::parse(text) else {
            return;
        };

        match msg {
            WireMessage::Request(request) => self.handle_request(request),

            WireMessage::Response(response) => {
                let id = response.id.clone();
                let result = response.into_result().map_err(SignalingError::Remote);
                if !self.pending.settle(&id, result) {
                    warn!("Response for unknown request {} on {}", id, self.id);
                }
            }

            WireMessage::Notification(notification) => {
                self.lifecycle
                    .emit(ConnectionEvent::Notification(notification));
            }
        }
    }

    fn handle_request(self: &Arc<Self>, request: Request) {
        let origin = request.clone();
        let (inbound, reply) = InboundRequest::new(request);
        self.lifecycle.emit(ConnectionEvent::Request(inbound));

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let response = match reply.await {
                Ok(Ok(data)) => Response::success(&origin, data),
                Ok(Err(reason)) => Response::error(&origin, reason),
                Err(_) => Response::error(&origin, SignalingError::RequestDropped.to_string()),
            };

            if inner.lifecycle.is_closed() {
                return;
            }

            let frame = match WireMessage::from(response).encode() {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Failed to encode response to '{}': {}", origin.method, e);
                    return;
                }
            };

            if let Err(e) = inner.outgoing.send(frame).await {
                warn!(
                    "Failed to answer '{}' on {}: {}",
                    origin.method, inner.id, e
                );
                inner.lifecycle.emit(ConnectionEvent::Error(e.to_string()));
            }
        });
    }

    async fn close(&self) {
        if !self.lifecycle.mark_closed() {
            return;
        }

        self.pending.reject_all();
        self.outgoing.close().await;
        self.incoming.close().await;

        info!("Channel connection {} closed", self.id);

        if let Ok(mut pumps) = self.pumps.lock() {
            for pump in pumps.drain(..) {
                pump.abort();
            }
        }
    }
}

#[async_trait]
impl Connection for ChannelConnection {
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
        if !self.inner.lifecycle.is_connected() {
            return Err(SignalingError::NotConnected);
        }

        let frame = WireMessage::from(notification).encode()?;
        self.inner.outgoing.send(frame).await
    }

    async fn request(&self, request: Request) -> Result<Value, SignalingError> {
        if self.inner.lifecycle.is_closed() {
            return Err(SignalingError::TransportClosed);
        }
        if !self.inner.lifecycle.is_connected() {
            return Err(SignalingError::NotConnected);
        }

        let id = request.id.clone();
        let method = request.method.clone();
        let frame = WireMessage::from(request).encode()?;

        let timeout = self.inner.config.request_timeout(self.inner.pending.len());
        let reply = self.inner.pending.register(id.clone(), method.clone(), timeout);

        if let Err(e) = self.inner.outgoing.send(frame).await {
            self.inner.pending.discard(&id);
            return Err(e);
        }

        debug!(
            "Sent request '{}' ({}) on {}, timeout {:?}",
            method, id, self.inner.id, timeout
        );

        reply.await.unwrap_or(Err(SignalingError::TransportClosed))
    }

    async fn close(&self) {
        if self.inner.lifecycle.is_closed() {
            return;
        }
        self.inner.close().await;
    }
}
