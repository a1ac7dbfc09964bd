use crate::error::MediaError;
use crate::loopback::LoopbackProducer;
use crate::transport::{MediaTransport, ProduceOptions, Producer, TransportProvider};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use huddle_core::PeerId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

/// Transport that produces after a fixed delay, or refuses to.
pub struct LoopbackTransport {
    id: String,
    delay: Duration,
    failing: AtomicBool,
    producers: Mutex<Vec<Arc<LoopbackProducer>>>,
}

impl LoopbackTransport {
    pub fn new(id: impl Into<String>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            delay,
            failing: AtomicBool::new(false),
            producers: Mutex::new(Vec::new()),
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }

    /// Every producer created so far, closed ones included.
    pub fn producers(&self) -> Vec<Arc<LoopbackProducer>> {
        self.producers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn live_producers(&self) -> Vec<Arc<LoopbackProducer>> {
        self.producers()
            .into_iter()
            .filter(|p| !p.is_closed())
            .collect()
    }
}

#[async_trait]
impl MediaTransport for LoopbackTransport {
    fn id(&self) -> &str {
        &self.id
    }

    async fn produce(&self, options: ProduceOptions) -> Result<Arc<dyn Producer>, MediaError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::Acquire) {
            return Err(MediaError::Transport(format!(
                "{} refused to produce",
                self.id
            )));
        }

        let producer = LoopbackProducer::new(options.track, options.app_data);
        debug!(
            "{} produced {} (codec {:?})",
            self.id,
            producer.id(),
            options.codec
        );
        self.producers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(producer.clone());
        Ok(producer as Arc<dyn Producer>)
    }
}

/// One server transport plus a lazily created transport per peer.
pub struct LoopbackProvider {
    sfu: Arc<LoopbackTransport>,
    peers: DashMap<PeerId, Arc<LoopbackTransport>>,
    unreachable: DashSet<PeerId>,
    peer_delay: Duration,
}

impl LoopbackProvider {
    pub fn new(sfu_delay: Duration, peer_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            sfu: LoopbackTransport::new("sfu", sfu_delay),
            peers: DashMap::new(),
            unreachable: DashSet::new(),
            peer_delay,
        })
    }

    pub fn sfu(&self) -> Arc<LoopbackTransport> {
        self.sfu.clone()
    }

    pub fn peer(&self, peer: &PeerId) -> Option<Arc<LoopbackTransport>> {
        self.peers.get(peer).map(|t| t.value().clone())
    }

    /// Makes `peer_transport` fail for this peer.
    pub fn set_unreachable(&self, peer: PeerId) {
        self.unreachable.insert(peer);
    }
}

#[async_trait]
impl TransportProvider for LoopbackProvider {
    async fn sfu_transport(&self) -> Result<Arc<dyn MediaTransport>, MediaError> {
        Ok(self.sfu.clone() as Arc<dyn MediaTransport>)
    }

    async fn peer_transport(&self, peer: &PeerId) -> Result<Arc<dyn MediaTransport>, MediaError> {
        if self.unreachable.contains(peer) {
            return Err(MediaError::Transport(format!("peer {} is unreachable", peer)));
        }
        let transport = self
            .peers
            .entry(peer.clone())
            .or_insert_with(|| LoopbackTransport::new(format!("p2p-{}", peer), self.peer_delay))
            .clone();
        Ok(transport as Arc<dyn MediaTransport>)
    }
}
