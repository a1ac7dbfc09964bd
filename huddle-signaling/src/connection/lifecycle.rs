use crate::connection::{ConnectionEvent, ConnectionEvents};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, watch};

/// Closed/connected flags plus the event sender shared by both connection kinds.
pub(crate) struct Lifecycle {
    closed: AtomicBool,
    connected: AtomicBool,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    closing: watch::Sender<bool>,
}

impl Lifecycle {
    pub(crate) fn new() -> (Self, ConnectionEvents) {
        let (events, rx) = mpsc::unbounded_channel();
        let lifecycle = Self {
            closed: AtomicBool::new(false),
            connected: AtomicBool::new(false),
            events,
            closing: watch::Sender::new(false),
        };
        (lifecycle, rx)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Resolves once the connection is closed, immediately if it already is.
    pub(crate) async fn closed(&self) {
        let mut closing = self.closing.subscribe();
        let _ = closing.wait_for(|closed| *closed).await;
    }

    pub(crate) fn is_connected(&self) -> bool {
        !self.is_closed() && self.connected.load(Ordering::Acquire)
    }

    /// Emits nothing once closed.
    pub(crate) fn emit(&self, event: ConnectionEvent) {
        if self.is_closed() {
            return;
        }
        let _ = self.events.send(event);
    }

    /// Returns true only on the disconnected -> connected transition.
    pub(crate) fn mark_connected(&self) -> bool {
        if self.is_closed() {
            return false;
        }
        !self.connected.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::Release);
    }

    /// Flips to closed and emits `Closed`. Returns false if already closed.
    pub(crate) fn mark_closed(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.connected.store(false, Ordering::Release);
        self.closing.send_replace(true);
        let _ = self.events.send(ConnectionEvent::Closed);
        true
    }
}
