use crate::error::SignalingError;
use dashmap::DashMap;
use huddle_core::MessageId;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::warn;

type Settlement = Result<Value, SignalingError>;

struct PendingRequest {
    method: String,
    reply: oneshot::Sender<Settlement>,
    timer: Option<JoinHandle<()>>,
}

/// Requests sent over a channel that are still waiting for a response.
///
/// Each entry leaves the table exactly once: by its response, by its timer,
/// or by `reject_all`. Whoever removes it settles it.
#[derive(Default)]
pub(crate) struct PendingTable {
    entries: DashMap<MessageId, PendingRequest>,
}

impl PendingTable {
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn register(
        self: &Arc<Self>,
        id: MessageId,
        method: String,
        timeout: Duration,
    ) -> oneshot::Receiver<Settlement> {
        let (reply, rx) = oneshot::channel();
        self.entries.insert(
            id.clone(),
            PendingRequest {
                method,
                reply,
                timer: None,
            },
        );

        let table = Arc::clone(self);
        let timer_id = id.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            table.expire(&timer_id);
        });

        match self.entries.get_mut(&id) {
            Some(mut entry) => entry.timer = Some(timer),
            None => timer.abort(),
        }

        rx
    }

    /// Returns false when `id` is unknown (already settled or never sent).
    pub(crate) fn settle(&self, id: &MessageId, result: Settlement) -> bool {
        let Some((_, pending)) = self.entries.remove(id) else {
            return false;
        };
        if let Some(timer) = pending.timer {
            timer.abort();
        }
        let _ = pending.reply.send(result);
        true
    }

    /// Drops an entry without answering it.
    pub(crate) fn discard(&self, id: &MessageId) {
        if let Some((_, pending)) = self.entries.remove(id) {
            if let Some(timer) = pending.timer {
                timer.abort();
            }
        }
    }

    pub(crate) fn reject_all(&self) {
        let ids: Vec<MessageId> = self.entries.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.settle(&id, Err(SignalingError::TransportClosed));
        }
    }

    fn expire(&self, id: &MessageId) {
        let Some((_, pending)) = self.entries.remove(id) else {
            return;
        };
        warn!("Request '{}' ({}) timed out", pending.method, id);
        let _ = pending.reply.send(Err(SignalingError::Timeout {
            method: pending.method,
            attempts: 1,
        }));
    }
}
