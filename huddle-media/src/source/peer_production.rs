use crate::transport::Producer;
use futures::future::{BoxFuture, Shared};
use std::sync::Arc;
use tracing::debug;

/// Outcome of one negotiation, shared by everyone waiting on it.
pub(crate) type Negotiation = Shared<BoxFuture<'static, Option<Arc<dyn Producer>>>>;

/// Production toward one peer. A peer is either being negotiated or active, never both.
#[derive(Clone)]
pub(crate) enum PeerProduction {
    Negotiating { attempt: u64, outcome: Negotiation },
    Active(Arc<dyn Producer>),
}

impl PeerProduction {
    pub(crate) fn is_attempt(&self, expected: u64) -> bool {
        matches!(self, PeerProduction::Negotiating { attempt, .. } if *attempt == expected)
    }

    /// Closes the production, waiting for the negotiation to land if needed.
    pub(crate) fn retire(self, remote_closed: bool) {
        match self {
            PeerProduction::Active(producer) => close_producer(&producer, remote_closed),
            PeerProduction::Negotiating { outcome, .. } => {
                tokio::spawn(async move {
                    if let Some(producer) = outcome.await {
                        close_producer(&producer, remote_closed);
                    }
                });
            }
        }
    }
}

fn close_producer(producer: &Arc<dyn Producer>, remote_closed: bool) {
    if remote_closed {
        producer.app_data().mark_remote_closed();
    }
    debug!("Closing peer producer {}", producer.id());
    producer.close();
}
