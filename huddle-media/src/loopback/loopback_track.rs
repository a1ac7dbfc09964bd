use crate::model::TrackKind;
use crate::transport::MediaTrack;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::watch;

/// Track with no media behind it. Clones are named `<id>#<n>`.
pub struct LoopbackTrack {
    id: String,
    kind: TrackKind,
    stopped: AtomicBool,
    ended: watch::Sender<bool>,
    clones: Arc<AtomicUsize>,
}

impl LoopbackTrack {
    pub fn new(id: impl Into<String>, kind: TrackKind) -> Arc<Self> {
        Arc::new(Self::build(id.into(), kind, Arc::new(AtomicUsize::new(0))))
    }

    fn build(id: String, kind: TrackKind, clones: Arc<AtomicUsize>) -> Self {
        let (ended, _) = watch::channel(false);
        Self {
            id,
            kind,
            stopped: AtomicBool::new(false),
            ended,
            clones,
        }
    }

    /// Simulates the device going away.
    pub fn end(&self) {
        self.stopped.store(true, Ordering::Release);
        self.ended.send_replace(true);
    }

    /// Number of clones made from this track or any of its clones.
    pub fn clone_count(&self) -> usize {
        self.clones.load(Ordering::Acquire)
    }
}

#[async_trait]
impl MediaTrack for LoopbackTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn clone_track(&self) -> Arc<dyn MediaTrack> {
        let n = self.clones.fetch_add(1, Ordering::AcqRel) + 1;
        let root = self.id.split('#').next().unwrap_or(&self.id);
        Arc::new(Self::build(
            format!("{}#{}", root, n),
            self.kind,
            self.clones.clone(),
        ))
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    async fn ended(&self) {
        let mut rx = self.ended.subscribe();
        let _ = rx.wait_for(|ended| *ended).await;
    }
}
