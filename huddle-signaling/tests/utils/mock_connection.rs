use async_trait::async_trait;
use huddle_core::{ConnectionId, Notification, Request};
use huddle_signaling::{Connection, ConnectionEvent, ConnectionEvents, SignalingError};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};

/// Connection double driven directly by the test.
pub struct MockConnection {
    id: ConnectionId,
    connected: AtomicBool,
    closed: AtomicBool,
    failing: bool,
    response: Value,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    requests: Mutex<Vec<Request>>,
    notifications: Mutex<Vec<Notification>>,
}

impl MockConnection {
    /// A connection that answers every request with `response`.
    pub fn new(response: Value) -> (Arc<Self>, ConnectionEvents) {
        Self::build(response, false)
    }

    /// A connection whose `notify` and `request` always fail.
    pub fn failing() -> (Arc<Self>, ConnectionEvents) {
        Self::build(Value::Null, true)
    }

    fn build(response: Value, failing: bool) -> (Arc<Self>, ConnectionEvents) {
        let (events, rx) = mpsc::unbounded_channel();
        let connection = Arc::new(Self {
            id: ConnectionId::new(),
            connected: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            failing,
            response,
            events,
            requests: Mutex::new(Vec::new()),
            notifications: Mutex::new(Vec::new()),
        });
        (connection, rx)
    }

    pub fn connect(&self) {
        self.connected.store(true, Ordering::Release);
        let _ = self.events.send(ConnectionEvent::Connected);
    }

    pub fn drop_link(&self) {
        self.connected.store(false, Ordering::Release);
        let _ = self.events.send(ConnectionEvent::Reconnecting { attempt: 0 });
    }

    pub fn close_remotely(&self) {
        self.connected.store(false, Ordering::Release);
        self.closed.store(true, Ordering::Release);
        let _ = self.events.send(ConnectionEvent::Closed);
    }

    pub fn emit(&self, event: ConnectionEvent) {
        let _ = self.events.send(event);
    }

    pub async fn requests(&self) -> Vec<Request> {
        self.requests.lock().await.clone()
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().await.clone()
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    async fn notify(&self, notification: Notification) -> Result<(), SignalingError> {
        self.notifications.lock().await.push(notification);
        if self.failing {
            return Err(SignalingError::NotConnected);
        }
        Ok(())
    }

    async fn request(&self, request: Request) -> Result<Value, SignalingError> {
        self.requests.lock().await.push(request);
        if self.failing {
            return Err(SignalingError::Remote("mock failure".to_owned()));
        }
        Ok(self.response.clone())
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.connected.store(false, Ordering::Release);
        let _ = self.events.send(ConnectionEvent::Closed);
    }
}
