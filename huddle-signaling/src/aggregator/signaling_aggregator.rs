use crate::aggregator::{SignalingEvent, SignalingEvents};
use crate::connection::{Connection, ConnectionEvent, ConnectionEvents};
use huddle_core::{ConnectionId, Notification, Payload, Request};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

struct Member {
    connection: Arc<dyn Connection>,
    pump: JoinHandle<()>,
}

struct AggregatorInner {
    members: Mutex<Vec<Member>>,
    connected: AtomicBool,
    closed: AtomicBool,
    events: mpsc::UnboundedSender<SignalingEvent>,
}

/// Fans signaling over every live connection and merges what they receive.
///
/// Requests and notifications go out on the first member that accepts them.
/// Inbound traffic from any member is re-emitted unchanged on one stream.
#[derive(Clone)]
pub struct SignalingAggregator {
    inner: Arc<AggregatorInner>,
}

impl SignalingAggregator {
    pub fn new() -> (Self, SignalingEvents) {
        let (events, rx) = mpsc::unbounded_channel();
        let aggregator = Self {
            inner: Arc::new(AggregatorInner {
                members: Mutex::new(Vec::new()),
                connected: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                events,
            }),
        };
        (aggregator, rx)
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    pub fn connection_count(&self) -> usize {
        self.inner.snapshot().len()
    }

    pub fn add_connection(&self, connection: Arc<dyn Connection>, events: ConnectionEvents) {
        // The pump takes this lock before acting on `Closed`, so the member is
        // always in the set by the time its events are handled.
        let Ok(mut members) = self.inner.members.lock() else {
            return;
        };

        if self.is_closed() {
            warn!(
                "Ignoring connection {} added to a closed aggregator",
                connection.id()
            );
            return;
        }
        if connection.is_closed() {
            warn!("Ignoring connection {} that is already closed", connection.id());
            return;
        }

        let pump = tokio::spawn(AggregatorInner::pump(
            Arc::downgrade(&self.inner),
            connection.id().clone(),
            events,
        ));

        info!("Added signaling connection {}", connection.id());
        members.push(Member { connection, pump });
    }

    /// Best effort: sent on the first member that accepts it, never queued.
    pub async fn notify(&self, notification: Notification) {
        if self.is_closed() {
            return;
        }

        for connection in self.inner.snapshot() {
            match connection.notify(notification.clone()).await {
                Ok(()) => {
                    debug!(
                        "Sent notification '{}' on {}",
                        notification.method,
                        connection.id()
                    );
                    return;
                }
                Err(e) => warn!(
                    "Notification '{}' failed on {}: {}",
                    notification.method,
                    connection.id(),
                    e
                ),
            }
        }

        warn!(
            "No connection available for notification '{}'",
            notification.method
        );
    }

    pub async fn notify_payload<P: Payload>(&self, payload: &P) {
        match Notification::for_payload(payload) {
            Ok(notification) => self.notify(notification).await,
            Err(e) => error!("Failed to encode '{}' notification: {}", P::METHOD, e),
        }
    }

    /// Resolves with the first successful response, or `None` when no member
    /// could deliver the request.
    pub async fn send_request(&self, method: &str, data: Value) -> Option<Value> {
        if self.is_closed() {
            return None;
        }

        let request = Request::new(method, data);

        for connection in self.inner.snapshot() {
            match connection.request(request.clone()).await {
                Ok(response) => return Some(response),
                Err(e) => warn!("Request '{}' failed on {}: {}", method, connection.id(), e),
            }
        }

        warn!("No connection available for request '{}'", method);
        None
    }

    pub async fn request<P: Payload>(&self, payload: &P) -> Option<Value> {
        match serde_json::to_value(payload) {
            Ok(data) => self.send_request(P::METHOD, data).await,
            Err(e) => {
                error!("Failed to encode '{}' request: {}", P::METHOD, e);
                None
            }
        }
    }

    /// Closes every member. The aggregate stays usable for new connections.
    pub async fn disconnect(&self) {
        if self.is_closed() {
            return;
        }
        self.inner.teardown().await;
    }

    /// Closes every member and the aggregate itself, permanently.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("Closing signaling aggregator");
        self.inner.teardown().await;
    }
}

impl AggregatorInner {
    async fn pump(inner: Weak<AggregatorInner>, id: ConnectionId, mut events: ConnectionEvents) {
        while let Some(event) = events.recv().await {
            let Some(inner) = inner.upgrade() else {
                break;
            };

            match event {
                ConnectionEvent::Connected => inner.on_member_connected(&id),
                ConnectionEvent::Reconnecting { attempt } => {
                    inner.on_member_reconnecting(&id, attempt)
                }
                ConnectionEvent::Closed => {
                    inner.on_member_closed(&id);
                    break;
                }
                ConnectionEvent::Error(reason) => inner.emit(SignalingEvent::Error(reason)),
                ConnectionEvent::Notification(n) => inner.emit(SignalingEvent::Notification(n)),
                ConnectionEvent::Request(r) => inner.emit(SignalingEvent::Request(r)),
            }
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn Connection>> {
        match self.members.lock() {
            Ok(members) => members.iter().map(|m| m.connection.clone()).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn emit(&self, event: SignalingEvent) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        let _ = self.events.send(event);
    }

    fn on_member_connected(&self, id: &ConnectionId) {
        if !self.connected.swap(true, Ordering::AcqRel) {
            info!("Signaling connected via {}", id);
            self.emit(SignalingEvent::Connected);
        }
    }

    fn on_member_reconnecting(&self, id: &ConnectionId, attempt: u32) {
        debug!("Member {} reconnecting (attempt {})", id, attempt);

        let any_connected = self.snapshot().iter().any(|c| c.is_connected());
        if !any_connected && self.connected.swap(false, Ordering::AcqRel) {
            warn!("All signaling connections dropped, waiting for reconnect");
            self.emit(SignalingEvent::Reconnecting);
        }
    }

    fn on_member_closed(&self, id: &ConnectionId) {
        let remaining = {
            let Ok(mut members) = self.members.lock() else {
                return;
            };
            let before = members.len();
            members.retain(|m| m.connection.id() != id);
            if members.len() == before {
                return;
            }
            members
                .iter()
                .map(|m| m.connection.clone())
                .collect::<Vec<_>>()
        };

        info!(
            "Signaling connection {} closed, {} left",
            id,
            remaining.len()
        );

        if remaining.is_empty() {
            if self.connected.swap(false, Ordering::AcqRel) {
                self.emit(SignalingEvent::Closed);
            }
        } else if !remaining.iter().any(|c| c.is_connected())
            && self.connected.swap(false, Ordering::AcqRel)
        {
            self.emit(SignalingEvent::Reconnecting);
        }
    }

    async fn teardown(&self) {
        let members = match self.members.lock() {
            Ok(mut members) => std::mem::take(&mut *members),
            Err(_) => Vec::new(),
        };

        for member in members {
            member.pump.abort();
            member.connection.close().await;
        }

        // Sent past `emit`, which is silent once `close` has set the flag.
        if self.connected.swap(false, Ordering::AcqRel) {
            let _ = self.events.send(SignalingEvent::Closed);
        }
    }
}
