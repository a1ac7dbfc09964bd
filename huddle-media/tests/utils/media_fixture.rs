use crate::utils::ServerLog;
use huddle_core::{PeerId, Request};
use huddle_media::loopback::{LoopbackMeters, LoopbackProvider, LoopbackTrack};
use huddle_media::{
    MediaConfig, MediaContext, MediaSession, MediaSource, SessionEvents, SourceEvent,
    SourceEvents, SourceKind, StartOptions, TrackKind,
};
use huddle_signaling::loopback::LoopbackSocket;
use huddle_signaling::{SignalingAggregator, SocketConfig, SocketConnection};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const SFU_DELAY: Duration = Duration::from_millis(10);
pub const PEER_DELAY: Duration = Duration::from_millis(50);

pub struct MediaFixture {
    pub provider: Arc<LoopbackProvider>,
    pub meters: LoopbackMeters,
    pub server: ServerLog,
    pub context: MediaContext,
}

/// Loopback transports plus a signaling aggregator over a served loopback socket.
pub fn create_media_fixture() -> MediaFixture {
    let server = ServerLog::default();
    let (socket, carrier_events, emitted) = LoopbackSocket::new();
    socket.connect();

    let log = server.clone();
    LoopbackSocket::serve(emitted, Arc::new(move |request: &Request| log.record(request)));

    let (aggregator, _events) = SignalingAggregator::new();
    let (connection, events) =
        SocketConnection::new(socket, carrier_events, SocketConfig::default());
    aggregator.add_connection(Arc::new(connection), events);

    let provider = LoopbackProvider::new(SFU_DELAY, PEER_DELAY);
    let meters = LoopbackMeters::new();
    let context = MediaContext {
        provider: provider.clone(),
        signaling: aggregator,
        meters: Some(Arc::new(meters.clone())),
        volume: MediaConfig::default().volume,
    };

    MediaFixture {
        provider,
        meters,
        server,
        context,
    }
}

impl MediaFixture {
    pub fn source(&self, kind: SourceKind) -> (MediaSource, SourceEvents) {
        MediaSource::new(kind, self.context.clone())
    }

    pub fn session(&self) -> (MediaSession, SessionEvents) {
        MediaSession::new(self.context.clone())
    }
}

pub fn mic_track(id: &str) -> Arc<LoopbackTrack> {
    LoopbackTrack::new(id, TrackKind::Audio)
}

pub fn cam_track(id: &str) -> Arc<LoopbackTrack> {
    LoopbackTrack::new(id, TrackKind::Video)
}

pub fn start_options(track: &Arc<LoopbackTrack>) -> StartOptions {
    StartOptions {
        track: track.clone(),
        codec: Some("opus".to_owned()),
    }
}

pub fn peer(id: &str) -> PeerId {
    PeerId::from(id)
}

/// Next lifecycle event, skipping volume reports.
pub async fn next_state_event(rx: &mut SourceEvents) -> SourceEvent {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("Timed out waiting for source event")
            .expect("Source event stream ended");
        if !matches!(event, SourceEvent::Volume(_)) {
            return event;
        }
    }
}

/// Asserts no lifecycle event is queued, ignoring volume reports.
pub async fn assert_no_state_event(rx: &mut mpsc::UnboundedReceiver<SourceEvent>) {
    tokio::time::sleep(Duration::from_millis(50)).await;
    while let Ok(event) = rx.try_recv() {
        if !matches!(event, SourceEvent::Volume(_)) {
            panic!("Unexpected source event: {:?}", event);
        }
    }
}
