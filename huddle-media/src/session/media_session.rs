use crate::error::MediaError;
use crate::model::{SourceEvent, SourceEvents, SourceKind, StopOptions};
use crate::source::{MediaContext, MediaSource, SourcePhase, StartOptions};
use crate::transport::MediaTrack;
use futures::future::join_all;
use huddle_core::{Notification, PeerId, ServerNotification};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub source: SourceKind,
    pub event: SourceEvent,
}

pub type SessionEvents = mpsc::UnboundedReceiver<SessionEvent>;

struct SessionState {
    sources: HashMap<SourceKind, MediaSource>,
    peers: BTreeSet<PeerId>,
    p2p: bool,
}

struct SessionInner {
    context: MediaContext,
    state: Mutex<SessionState>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

/// All capture sources of one participant.
///
/// Keeps the peer set and the P2P mode in one place and applies them to every
/// source, including sources created later. A stopped source is replaced by a
/// fresh one on the next `start`.
#[derive(Clone)]
pub struct MediaSession {
    inner: Arc<SessionInner>,
}

impl MediaSession {
    pub fn new(context: MediaContext) -> (Self, SessionEvents) {
        let (events, rx) = mpsc::unbounded_channel();
        let session = Self {
            inner: Arc::new(SessionInner {
                context,
                state: Mutex::new(SessionState {
                    sources: HashMap::new(),
                    peers: BTreeSet::new(),
                    p2p: false,
                }),
                events,
            }),
        };
        (session, rx)
    }

    pub fn source(&self, kind: SourceKind) -> Option<MediaSource> {
        self.inner.state().sources.get(&kind).cloned()
    }

    pub fn peers(&self) -> Vec<PeerId> {
        self.inner.state().peers.iter().cloned().collect()
    }

    pub fn is_p2p_active(&self) -> bool {
        self.inner.state().p2p
    }

    pub async fn start(
        &self,
        kind: SourceKind,
        track: Arc<dyn MediaTrack>,
        codec: Option<String>,
    ) -> Result<(), MediaError> {
        let source = self.prepare_source(kind).await;
        source.start(StartOptions { track, codec }).await
    }

    pub async fn stop(&self, kind: SourceKind, options: StopOptions) {
        if let Some(source) = self.source(kind) {
            source.stop(options).await;
        }
    }

    pub async fn pause(&self, kind: SourceKind) {
        if let Some(source) = self.source(kind) {
            source.pause().await;
        }
    }

    pub async fn resume(&self, kind: SourceKind) {
        if let Some(source) = self.source(kind) {
            source.resume().await;
        }
    }

    pub async fn replace_track(
        &self,
        kind: SourceKind,
        track: Arc<dyn MediaTrack>,
    ) -> Result<(), MediaError> {
        match self.source(kind) {
            Some(source) => source.replace_track(track).await,
            None => Err(MediaError::NotRunning),
        }
    }

    pub fn add_peer(&self, peer: PeerId) {
        let mut state = self.inner.state();
        if !state.peers.insert(peer.clone()) {
            return;
        }
        info!("Peer {} joined", peer);
        for source in state.sources.values() {
            source.add_peer_id(peer.clone());
        }
    }

    pub fn remove_peer(&self, peer: &PeerId) {
        let mut state = self.inner.state();
        if !state.peers.remove(peer) {
            return;
        }
        info!("Peer {} left", peer);
        for source in state.sources.values() {
            source.remove_peer_id(peer);
        }
    }

    pub async fn start_p2p(&self) {
        let sources = {
            let mut state = self.inner.state();
            if state.p2p {
                return;
            }
            state.p2p = true;
            state.sources.values().cloned().collect::<Vec<_>>()
        };
        info!("Session entering P2P mode");
        join_all(sources.iter().map(|s| s.start_p2p())).await;
    }

    pub async fn stop_p2p(&self) {
        let sources = {
            let mut state = self.inner.state();
            if !state.p2p {
                return;
            }
            state.p2p = false;
            state.sources.values().cloned().collect::<Vec<_>>()
        };
        info!("Session leaving P2P mode");
        join_all(sources.iter().map(|s| s.stop_p2p())).await;
    }

    /// Peer churn updates the peer set, anything else goes to the sources.
    /// Returns whether the notification was consumed.
    pub async fn handle_notification(&self, notification: &Notification) -> bool {
        let Some(parsed) = ServerNotification::from_notification(notification) else {
            return false;
        };

        match &parsed {
            ServerNotification::PeerJoined(joined) => {
                self.add_peer(joined.peer_id.clone());
                true
            }
            ServerNotification::PeerLeft(left) => {
                self.remove_peer(&left.peer_id);
                true
            }
            _ => {
                let sources = self.sources();
                let handled = join_all(sources.iter().map(|s| s.handle_notification(&parsed))).await;
                handled.into_iter().any(|h| h)
            }
        }
    }

    /// Waits for every in-flight peer negotiation of every source.
    pub async fn settled(&self) {
        let sources = self.sources();
        join_all(sources.iter().map(|s| s.settled())).await;
    }

    pub async fn close(&self) {
        let sources = self.sources();
        join_all(sources.iter().map(|s| s.stop(StopOptions::default()))).await;
    }

    fn sources(&self) -> Vec<MediaSource> {
        self.inner.state().sources.values().cloned().collect()
    }

    /// Returns the source for `kind`, creating a fresh one if there is none
    /// or the previous one was stopped.
    async fn prepare_source(&self, kind: SourceKind) -> MediaSource {
        let (source, p2p) = {
            let mut state = self.inner.state();
            if let Some(source) = state.sources.get(&kind) {
                if source.phase() != SourcePhase::Stopped {
                    return source.clone();
                }
            }

            debug!("Creating {} source", kind);
            let (source, events) = MediaSource::new(kind, self.inner.context.clone());
            for peer in &state.peers {
                source.add_peer_id(peer.clone());
            }
            self.inner.forward(kind, events);
            state.sources.insert(kind, source.clone());
            (source, state.p2p)
        };

        if p2p {
            source.start_p2p().await;
        }
        source
    }
}

impl SessionInner {
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn forward(&self, kind: SourceKind, mut events: SourceEvents) {
        let out = self.events.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if out.send(SessionEvent { source: kind, event }).is_err() {
                    break;
                }
            }
        });
    }
}
