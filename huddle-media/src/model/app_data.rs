use crate::model::SourceKind;
use huddle_core::PeerId;
use std::sync::atomic::{AtomicBool, Ordering};

/// Metadata attached to every producer.
///
/// `remote_closed` only ever goes from false to true. Once set, closing the
/// producer is not reported to the server.
#[derive(Debug)]
pub struct ProducerAppData {
    pub source: SourceKind,
    /// `None` for the forwarding-server producer.
    pub peer: Option<PeerId>,
    remote_closed: AtomicBool,
}

impl ProducerAppData {
    pub fn new(source: SourceKind, peer: Option<PeerId>) -> Self {
        Self {
            source,
            peer,
            remote_closed: AtomicBool::new(false),
        }
    }

    pub fn mark_remote_closed(&self) {
        self.remote_closed.store(true, Ordering::Release);
    }

    pub fn is_remote_closed(&self) -> bool {
        self.remote_closed.load(Ordering::Acquire)
    }
}
