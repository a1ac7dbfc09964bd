use crate::config::VolumeConfig;
use crate::error::MediaError;
use crate::model::{ProducerAppData, SourceEvent, SourceEvents, SourceKind, StopOptions};
use crate::source::VolumeWatcher;
use crate::source::peer_production::{Negotiation, PeerProduction};
use crate::transport::{MediaTrack, MeterFactory, ProduceOptions, Producer, TransportProvider};
use futures::FutureExt;
use futures::future::join_all;
use huddle_core::{
    CloseProducer, PauseProducer, PeerId, ProducerClosed, ProducerLayers, ResumeProducer,
    ServerNotification,
};
use huddle_signaling::SignalingAggregator;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Collaborators shared by every source of a session.
#[derive(Clone)]
pub struct MediaContext {
    pub provider: Arc<dyn TransportProvider>,
    pub signaling: SignalingAggregator,
    pub meters: Option<Arc<dyn MeterFactory>>,
    pub volume: VolumeConfig,
}

pub struct StartOptions {
    pub track: Arc<dyn MediaTrack>,
    pub codec: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcePhase {
    Idle,
    Starting,
    Running,
    /// Terminal.
    Stopped,
}

impl SourcePhase {
    pub fn is_live(self) -> bool {
        matches!(self, SourcePhase::Starting | SourcePhase::Running)
    }
}

struct SourceState {
    phase: SourcePhase,
    paused: bool,
    p2p_active: bool,
    track: Option<Arc<dyn MediaTrack>>,
    codec: Option<String>,
    sfu: Option<Arc<dyn Producer>>,
    peers: HashMap<PeerId, PeerProduction>,
    peer_ids: BTreeSet<PeerId>,
    next_attempt: u64,
    track_watch: Option<JoinHandle<()>>,
    sfu_watch: Option<JoinHandle<()>>,
    volume: Option<VolumeWatcher>,
}

impl SourceState {
    fn new() -> Self {
        Self {
            phase: SourcePhase::Idle,
            paused: false,
            p2p_active: false,
            track: None,
            codec: None,
            sfu: None,
            peers: HashMap::new(),
            peer_ids: BTreeSet::new(),
            next_attempt: 0,
            track_watch: None,
            sfu_watch: None,
            volume: None,
        }
    }

    fn is_current_attempt(&self, peer: &PeerId, attempt: u64) -> bool {
        self.peers.get(peer).is_some_and(|p| p.is_attempt(attempt))
    }

    fn is_current_track(&self, track: &Arc<dyn MediaTrack>) -> bool {
        self.track.as_ref().is_some_and(|t| t.id() == track.id())
    }

    fn sfu_with_id(&self, producer_id: &str) -> Option<Arc<dyn Producer>> {
        self.sfu.clone().filter(|p| p.id() == producer_id)
    }
}

struct SourceInner {
    kind: SourceKind,
    context: MediaContext,
    state: Mutex<SourceState>,
    events: mpsc::UnboundedSender<SourceEvent>,
}

/// Production state machine for one capture source.
///
/// The track always goes to the forwarding server. In P2P mode it also goes
/// to every known peer, and the server producer is kept paused as a warm
/// fallback. Pause, resume and track replacement reach every producer,
/// including the ones still being negotiated.
///
/// Lifecycle: idle, starting, running, stopped. Stopped is terminal.
#[derive(Clone)]
pub struct MediaSource {
    inner: Arc<SourceInner>,
}

impl MediaSource {
    pub fn new(kind: SourceKind, context: MediaContext) -> (Self, SourceEvents) {
        let (events, rx) = mpsc::unbounded_channel();
        let source = Self {
            inner: Arc::new(SourceInner {
                kind,
                context,
                state: Mutex::new(SourceState::new()),
                events,
            }),
        };
        (source, rx)
    }

    pub fn kind(&self) -> SourceKind {
        self.inner.kind
    }

    pub fn phase(&self) -> SourcePhase {
        self.inner.state().phase
    }

    pub fn is_running(&self) -> bool {
        self.phase().is_live()
    }

    pub fn is_paused(&self) -> bool {
        self.inner.state().paused
    }

    pub fn is_p2p_active(&self) -> bool {
        self.inner.state().p2p_active
    }

    pub fn track(&self) -> Option<Arc<dyn MediaTrack>> {
        self.inner.state().track.clone()
    }

    pub fn sfu_producer(&self) -> Option<Arc<dyn Producer>> {
        self.inner.state().sfu.clone()
    }

    pub fn peer_producer(&self, peer: &PeerId) -> Option<Arc<dyn Producer>> {
        match self.inner.state().peers.get(peer) {
            Some(PeerProduction::Active(producer)) => Some(producer.clone()),
            _ => None,
        }
    }

    pub fn is_negotiating(&self, peer: &PeerId) -> bool {
        matches!(
            self.inner.state().peers.get(peer),
            Some(PeerProduction::Negotiating { .. })
        )
    }

    pub fn peer_ids(&self) -> Vec<PeerId> {
        self.inner.state().peer_ids.iter().cloned().collect()
    }

    /// Produces toward the server, and toward every known peer when P2P is on.
    ///
    /// Only the server producer decides the outcome. A failing peer is dropped
    /// from the map and the source starts anyway.
    pub async fn start(&self, options: StartOptions) -> Result<(), MediaError> {
        let StartOptions { track, codec } = options;
        let kind = self.inner.kind;

        let peers = {
            let mut state = self.inner.state();
            match state.phase {
                SourcePhase::Starting | SourcePhase::Running => {
                    return Err(MediaError::AlreadyRunning);
                }
                SourcePhase::Stopped => return Err(MediaError::Terminated),
                SourcePhase::Idle => {}
            }

            state.phase = SourcePhase::Starting;
            state.track = Some(track.clone());
            state.codec = codec.clone();
            state.track_watch = Some(self.inner.watch_track(&track));

            if state.p2p_active {
                self.inner.begin_all_peers(&mut state)
            } else {
                Vec::new()
            }
        };

        info!("Starting {} source with track {}", kind, track.id());

        let (sfu, _) = futures::join!(
            self.inner.produce_sfu(&track, codec),
            join_all(peers)
        );

        let producer = match sfu {
            Ok(producer) => producer,
            Err(e) => {
                error!("{} source failed to start: {}", kind, e);
                self.inner.shutdown(StopOptions::remote()).await;
                return Err(e);
            }
        };

        let paused = {
            let mut state = self.inner.state();
            if state.phase == SourcePhase::Starting {
                let paused = state.paused || state.p2p_active;
                if paused {
                    producer.pause();
                }
                state.sfu_watch = Some(self.inner.watch_sfu(&producer));
                state.sfu = Some(producer.clone());
                state.phase = SourcePhase::Running;
                self.inner.emit(SourceEvent::Started);
                state.volume = self.inner.volume_watcher(&track);
                Some(paused)
            } else {
                None
            }
        };

        let Some(paused) = paused else {
            warn!(
                "{} source stopped while starting, dropping producer {}",
                kind,
                producer.id()
            );
            self.inner.close_sfu(&producer).await;
            return Err(MediaError::Aborted);
        };

        info!(
            "{} source running, server producer {}{}",
            kind,
            producer.id(),
            if paused { " (paused)" } else { "" }
        );

        if paused {
            self.inner.signal_paused(&producer, true).await;
        }
        Ok(())
    }

    /// Adds a peer. Negotiates toward it right away when running in P2P mode.
    pub fn add_peer_id(&self, peer: PeerId) {
        let mut state = self.inner.state();
        if !state.peer_ids.insert(peer.clone()) {
            return;
        }
        if state.phase.is_live() && state.p2p_active {
            let _ = self.inner.begin_peer(&mut state, peer);
        }
    }

    /// Removes a peer, closing live or in-flight production toward it.
    pub fn remove_peer_id(&self, peer: &PeerId) {
        let mut state = self.inner.state();
        state.peer_ids.remove(peer);
        if let Some(production) = state.peers.remove(peer) {
            debug!("Dropping {} production toward {}", self.inner.kind, peer);
            production.retire(false);
        }
    }

    /// Turns P2P on: produces toward every known peer, then pauses the
    /// server producer. Before `start` this only records the mode.
    pub async fn start_p2p(&self) {
        let outcomes = {
            let mut state = self.inner.state();
            if state.phase == SourcePhase::Stopped || state.p2p_active {
                return;
            }
            state.p2p_active = true;
            if !state.phase.is_live() {
                return;
            }
            self.inner.begin_all_peers(&mut state)
        };

        info!(
            "{} source entering P2P mode with {} peer(s)",
            self.inner.kind,
            outcomes.len()
        );
        join_all(outcomes).await;

        let sfu = {
            let state = self.inner.state();
            if state.phase == SourcePhase::Running && state.p2p_active {
                state.sfu.clone().filter(|p| set_producer_paused(p, true))
            } else {
                None
            }
        };
        if let Some(sfu) = sfu {
            self.inner.signal_paused(&sfu, true).await;
        }
    }

    /// Turns P2P off: closes every peer producer, negotiated or not, and
    /// resumes the server producer unless the source itself is paused.
    pub async fn stop_p2p(&self) {
        let sfu = {
            let mut state = self.inner.state();
            if !state.p2p_active {
                return;
            }
            state.p2p_active = false;
            for (_, production) in state.peers.drain() {
                production.retire(false);
            }
            info!("{} source leaving P2P mode", self.inner.kind);

            if state.phase == SourcePhase::Running && !state.paused {
                state.sfu.clone().filter(|p| set_producer_paused(p, false))
            } else {
                None
            }
        };
        if let Some(sfu) = sfu {
            self.inner.signal_paused(&sfu, false).await;
        }
    }

    pub async fn pause(&self) {
        self.set_paused(true).await;
    }

    pub async fn resume(&self) {
        self.set_paused(false).await;
    }

    /// Negotiations still in flight pick the flag up when they land.
    async fn set_paused(&self, paused: bool) {
        let sfu = {
            let mut state = self.inner.state();
            if state.phase == SourcePhase::Stopped {
                return;
            }
            state.paused = paused;

            for production in state.peers.values() {
                if let PeerProduction::Active(producer) = production {
                    set_producer_paused(producer, paused);
                }
            }

            if state.p2p_active {
                None
            } else {
                state.sfu.clone().filter(|p| set_producer_paused(p, paused))
            }
        };

        debug!(
            "{} source {}",
            self.inner.kind,
            if paused { "paused" } else { "resumed" }
        );

        if let Some(sfu) = sfu {
            self.inner.signal_paused(&sfu, paused).await;
        }
    }

    /// Swaps the track on every producer, in-flight ones included, then stops
    /// the old track. Each producer gets its own clone of `track`.
    pub async fn replace_track(&self, track: Arc<dyn MediaTrack>) -> Result<(), MediaError> {
        let (old, targets) = {
            let mut state = self.inner.state();
            if state.phase != SourcePhase::Running {
                return Err(MediaError::NotRunning);
            }

            let old = state.track.replace(track.clone());
            if let Some(watch) = state.track_watch.replace(self.inner.watch_track(&track)) {
                watch.abort();
            }
            state.volume = None;

            let mut targets: Vec<Negotiation> = state.sfu.iter().cloned().map(landed).collect();
            targets.extend(state.peers.values().map(|production| match production {
                PeerProduction::Active(producer) => landed(producer.clone()),
                PeerProduction::Negotiating { outcome, .. } => outcome.clone(),
            }));
            (old, targets)
        };

        info!(
            "Replacing track of {} source on {} producer(s)",
            self.inner.kind,
            targets.len()
        );

        let swaps = targets.into_iter().map(|target| {
            let track = track.clone();
            async move {
                let Some(producer) = target.await else {
                    return Ok(());
                };
                if producer.is_closed() {
                    return Ok(());
                }
                let clone = track.clone_track();
                let swapped = producer.replace_track(clone.clone()).await;
                if swapped.is_err() {
                    clone.stop();
                }
                swapped
            }
        });

        let mut failure = None;
        for result in join_all(swaps).await {
            if let Err(e) = result {
                warn!("Track replacement failed on {} source: {}", self.inner.kind, e);
                failure.get_or_insert(e);
            }
        }

        {
            let mut state = self.inner.state();
            if state.phase == SourcePhase::Running && state.is_current_track(&track) {
                state.volume = self.inner.volume_watcher(&track);
            }
        }

        if let Some(old) = old.filter(|old| old.id() != track.id()) {
            debug!("Stopping replaced track {}", old.id());
            old.stop();
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// No-op unless running. Emits `Stopped` for a local stop, `Closed` otherwise.
    pub async fn stop(&self, options: StopOptions) {
        self.inner.shutdown(options).await;
    }

    /// Applies a server notification to the server producer. Returns whether
    /// it concerned this source.
    pub async fn handle_notification(&self, notification: &ServerNotification) -> bool {
        match notification {
            ServerNotification::ProducerClosed(ProducerClosed { producer_id }) => {
                let Some(sfu) = self.inner.state().sfu_with_id(producer_id) else {
                    return false;
                };
                info!(
                    "Server closed producer {} of {} source",
                    producer_id, self.inner.kind
                );
                sfu.app_data().mark_remote_closed();
                self.inner.shutdown(StopOptions::remote()).await;
                true
            }

            ServerNotification::ProducerLayers(ProducerLayers {
                producer_id,
                spatial_layer,
                ..
            }) => {
                let Some(sfu) = self.inner.state().sfu_with_id(producer_id) else {
                    return false;
                };
                debug!(
                    "Server limited producer {} to spatial layer {}",
                    producer_id, spatial_layer
                );
                if let Err(e) = sfu.set_max_spatial_layer(*spatial_layer).await {
                    warn!("Failed to apply layer hint to {}: {}", producer_id, e);
                }
                true
            }

            ServerNotification::PeerJoined(_) | ServerNotification::PeerLeft(_) => false,
        }
    }

    /// Waits for every peer negotiation that is in flight right now.
    pub async fn settled(&self) {
        let outcomes: Vec<Negotiation> = self
            .inner
            .state()
            .peers
            .values()
            .filter_map(|production| match production {
                PeerProduction::Negotiating { outcome, .. } => Some(outcome.clone()),
                PeerProduction::Active(_) => None,
            })
            .collect();
        join_all(outcomes).await;
    }
}

impl SourceInner {
    fn state(&self) -> MutexGuard<'_, SourceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SourceEvent) {
        let _ = self.events.send(event);
    }

    fn begin_all_peers(self: &Arc<Self>, state: &mut SourceState) -> Vec<Negotiation> {
        let peers: Vec<PeerId> = state.peer_ids.iter().cloned().collect();
        peers
            .into_iter()
            .map(|peer| self.begin_peer(state, peer))
            .collect()
    }

    /// One negotiation per peer: a second caller gets the outcome of the first.
    fn begin_peer(self: &Arc<Self>, state: &mut SourceState, peer: PeerId) -> Negotiation {
        match state.peers.get(&peer) {
            Some(PeerProduction::Negotiating { outcome, .. }) => return outcome.clone(),
            Some(PeerProduction::Active(producer)) => return landed(producer.clone()),
            None => {}
        }

        state.next_attempt += 1;
        let attempt = state.next_attempt;
        let source = Arc::downgrade(self);
        let target = peer.clone();
        let outcome = async move {
            match source.upgrade() {
                Some(source) => source.negotiate_peer(target, attempt).await,
                None => None,
            }
        }
        .boxed()
        .shared();

        debug!(
            "Negotiating {} production toward {} (attempt {})",
            self.kind, peer, attempt
        );
        state.peers.insert(
            peer,
            PeerProduction::Negotiating {
                attempt,
                outcome: outcome.clone(),
            },
        );
        tokio::spawn(outcome.clone());
        outcome
    }

    async fn negotiate_peer(
        self: Arc<Self>,
        peer: PeerId,
        attempt: u64,
    ) -> Option<Arc<dyn Producer>> {
        let transport = match self.context.provider.peer_transport(&peer).await {
            Ok(transport) => transport,
            Err(e) => {
                warn!("No transport toward {}: {}", peer, e);
                self.forget_attempt(&peer, attempt);
                return None;
            }
        };

        let (track, codec) = {
            let state = self.state();
            if !state.is_current_attempt(&peer, attempt) {
                return None;
            }
            let track = state.track.as_ref()?.clone_track();
            (track, state.codec.clone())
        };

        let options = ProduceOptions {
            track: track.clone(),
            codec,
            app_data: ProducerAppData::new(self.kind, Some(peer.clone())),
        };
        let producer = match transport.produce(options).await {
            Ok(producer) => producer,
            Err(e) => {
                warn!("{} production toward {} failed: {}", self.kind, peer, e);
                track.stop();
                self.forget_attempt(&peer, attempt);
                return None;
            }
        };

        let mut state = self.state();
        if state.is_current_attempt(&peer, attempt) {
            set_producer_paused(&producer, state.paused);
            state
                .peers
                .insert(peer.clone(), PeerProduction::Active(producer.clone()));
            self.watch_peer(&peer, &producer);
            info!(
                "{} producing toward {} via {}{}",
                self.kind,
                peer,
                producer.id(),
                if state.paused { " (paused)" } else { "" }
            );
        } else {
            debug!("Negotiation toward {} was superseded", peer);
        }

        Some(producer)
    }

    fn forget_attempt(&self, peer: &PeerId, attempt: u64) {
        let mut state = self.state();
        if state.is_current_attempt(peer, attempt) {
            state.peers.remove(peer);
        }
    }

    async fn produce_sfu(
        &self,
        track: &Arc<dyn MediaTrack>,
        codec: Option<String>,
    ) -> Result<Arc<dyn Producer>, MediaError> {
        let transport = self
            .context
            .provider
            .sfu_transport()
            .await
            .map_err(|e| production_error("server", e))?;

        let clone = track.clone_track();
        let options = ProduceOptions {
            track: clone.clone(),
            codec,
            app_data: ProducerAppData::new(self.kind, None),
        };
        match transport.produce(options).await {
            Ok(producer) => Ok(producer),
            Err(e) => {
                clone.stop();
                Err(production_error("server", e))
            }
        }
    }

    fn volume_watcher(&self, track: &Arc<dyn MediaTrack>) -> Option<VolumeWatcher> {
        let meter = self.context.meters.as_ref()?.attach(track)?;
        Some(VolumeWatcher::spawn(
            track.id(),
            meter,
            self.context.volume.clone(),
            self.events.clone(),
        ))
    }

    /// The track ending on its own is a remote-initiated stop.
    fn watch_track(self: &Arc<Self>, track: &Arc<dyn MediaTrack>) -> JoinHandle<()> {
        let source = Arc::downgrade(self);
        let track = track.clone();
        tokio::spawn(async move {
            track.ended().await;
            let Some(source) = source.upgrade() else {
                return;
            };
            if !source.state().is_current_track(&track) {
                return;
            }
            warn!("Track {} of {} source ended", track.id(), source.kind);
            // Shutdown aborts this watcher, so it runs on its own task.
            tokio::spawn(async move {
                source
                    .shutdown(StopOptions {
                        local: false,
                        notify_server: true,
                    })
                    .await;
            });
        })
    }

    fn watch_sfu(self: &Arc<Self>, producer: &Arc<dyn Producer>) -> JoinHandle<()> {
        let source = Arc::downgrade(self);
        let producer = producer.clone();
        tokio::spawn(async move {
            producer.closed().await;
            let Some(source) = source.upgrade() else {
                return;
            };
            if source.state().sfu_with_id(producer.id()).is_none() {
                return;
            }
            warn!(
                "Server producer {} of {} source closed by its transport",
                producer.id(),
                source.kind
            );
            producer.app_data().mark_remote_closed();
            tokio::spawn(async move {
                source.shutdown(StopOptions::remote()).await;
            });
        })
    }

    fn watch_peer(self: &Arc<Self>, peer: &PeerId, producer: &Arc<dyn Producer>) {
        let source: Weak<SourceInner> = Arc::downgrade(self);
        let peer = peer.clone();
        let producer = producer.clone();
        tokio::spawn(async move {
            producer.closed().await;
            let Some(source) = source.upgrade() else {
                return;
            };
            let mut state = source.state();
            let same = matches!(
                state.peers.get(&peer),
                Some(PeerProduction::Active(p)) if p.id() == producer.id()
            );
            if same {
                info!("Producer toward {} closed by its transport", peer);
                state.peers.remove(&peer);
            }
        });
    }

    async fn shutdown(&self, options: StopOptions) {
        let (sfu, track) = {
            let mut state = self.state();
            if !state.phase.is_live() {
                return;
            }
            state.phase = SourcePhase::Stopped;

            if let Some(watch) = state.track_watch.take() {
                watch.abort();
            }
            if let Some(watch) = state.sfu_watch.take() {
                watch.abort();
            }
            state.volume = None;

            for (_, production) in state.peers.drain() {
                production.retire(!options.notify_server);
            }
            state.codec = None;
            (state.sfu.take(), state.track.take())
        };

        if let Some(sfu) = &sfu {
            if !options.notify_server {
                sfu.app_data().mark_remote_closed();
            }
            sfu.close();
        }
        if let Some(track) = track {
            track.stop();
        }

        info!(
            "{} source {}",
            self.kind,
            if options.local { "stopped" } else { "closed" }
        );
        self.emit(if options.local {
            SourceEvent::Stopped
        } else {
            SourceEvent::Closed
        });

        if let Some(sfu) = sfu {
            self.report_closed(&sfu).await;
        }
    }

    async fn close_sfu(&self, producer: &Arc<dyn Producer>) {
        producer.close();
        self.report_closed(producer).await;
    }

    async fn report_closed(&self, producer: &Arc<dyn Producer>) {
        if producer.app_data().is_remote_closed() {
            return;
        }
        let request = CloseProducer {
            producer_id: producer.id().to_owned(),
        };
        if self.context.signaling.request(&request).await.is_none() {
            warn!("Server was not told about closed producer {}", producer.id());
        }
    }

    async fn signal_paused(&self, producer: &Arc<dyn Producer>, paused: bool) {
        let producer_id = producer.id().to_owned();
        let answered = if paused {
            self.context
                .signaling
                .request(&PauseProducer { producer_id })
                .await
        } else {
            self.context
                .signaling
                .request(&ResumeProducer { producer_id })
                .await
        };
        if answered.is_none() {
            warn!(
                "Server was not told that producer {} is {}",
                producer.id(),
                if paused { "paused" } else { "resumed" }
            );
        }
    }
}

/// Returns whether the producer changed state.
fn set_producer_paused(producer: &Arc<dyn Producer>, paused: bool) -> bool {
    if producer.is_closed() || producer.is_paused() == paused {
        return false;
    }
    if paused {
        producer.pause();
    } else {
        producer.resume();
    }
    true
}

fn landed(producer: Arc<dyn Producer>) -> Negotiation {
    futures::future::ready(Some(producer)).boxed().shared()
}

fn production_error(target: &str, e: MediaError) -> MediaError {
    match e {
        MediaError::Production { .. } => e,
        other => MediaError::Production {
            target: target.to_owned(),
            reason: other.to_string(),
        },
    }
}
