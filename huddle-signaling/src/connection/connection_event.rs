use crate::connection::InboundRequest;
use huddle_core::Notification;
use tokio::sync::mpsc;

/// Everything a connection reports to its owner.
#[derive(Debug)]
pub enum ConnectionEvent {
    /// The carrier is up (first connect or after a reconnect).
    Connected,

    /// The carrier dropped but is expected back. `attempt` is 0 on the drop itself.
    Reconnecting { attempt: u32 },

    /// Gone for good. Nothing is emitted after this.
    Closed,

    /// Non-fatal carrier error.
    Error(String),

    Notification(Notification),

    Request(InboundRequest),
}

pub type ConnectionEvents = mpsc::UnboundedReceiver<ConnectionEvent>;
