use crate::config::HuddleConfig;
use crate::timeline::Timeline;
use anyhow::{Context, Result};
use huddle::PeerId;
use huddle::media::loopback::{LoopbackMeters, LoopbackProvider, LoopbackTrack};
use huddle::media::{
    MediaContext, MediaSession, SessionEvent, SessionEvents, SourceEvent, SourceKind, TrackKind,
};
use huddle::model::{Notification, PeerJoined, ProducerClosed, ProducerLayers, Request};
use huddle::signaling::loopback::{LoopbackSocket, RequestHandler, channel_link};
use huddle::signaling::{
    ChannelConnection, DisconnectReason, SignalingAggregator, SignalingEvent, SignalingEvents,
    SocketConnection,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::info;

const SFU_DELAY: Duration = Duration::from_millis(20);
const PEER_DELAY: Duration = Duration::from_millis(80);
const MIC_LEVEL_DB: f64 = -30.0;

pub struct Scenario {
    pub peers: usize,
    pub p2p: bool,
}

pub struct Report {
    /// Requests the room server answered, by method.
    pub requests: BTreeMap<String, usize>,
    pub producers: usize,
}

type RequestLog = Arc<Mutex<BTreeMap<String, usize>>>;

fn server_handler(via: &'static str, log: RequestLog, timeline: Timeline) -> RequestHandler {
    Arc::new(move |request: &Request| {
        timeline.server(&format!("{} {} via {}", request.method, request.data, via));
        *log.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(request.method.clone())
            .or_insert(0) += 1;
        Ok(json!({}))
    })
}

fn spawn_signaling_pump(
    mut events: SignalingEvents,
    session: MediaSession,
    timeline: Timeline,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SignalingEvent::Connected => timeline.signaling("connected"),
                SignalingEvent::Reconnecting => timeline.signaling("every connection dropped"),
                SignalingEvent::Closed => timeline.signaling("closed"),
                SignalingEvent::Error(reason) => timeline.failure(&reason),
                SignalingEvent::Notification(notification) => {
                    let handled = session.handle_notification(&notification).await;
                    timeline.signaling(&format!(
                        "notification {} {}",
                        notification.method,
                        if handled { "applied" } else { "ignored" }
                    ));
                }
                SignalingEvent::Request(request) => {
                    timeline.signaling(&format!("rejecting server request {}", request.method()));
                    request.reject("not supported by the simulator");
                }
            }
        }
    })
}

fn spawn_media_pump(mut events: SessionEvents, timeline: Timeline) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(SessionEvent { source, event }) = events.recv().await {
            let text = match event {
                SourceEvent::Started => "started".to_owned(),
                SourceEvent::Stopped => "stopped".to_owned(),
                SourceEvent::Closed => "closed".to_owned(),
                SourceEvent::Volume(level) => format!(
                    "volume {}/10{}",
                    level.volume,
                    if level.speaking { ", speaking" } else { "" }
                ),
            };
            timeline.media(&format!("{} {}", source, text));
        }
    })
}

async fn settle(session: &MediaSession) {
    sleep(Duration::from_millis(50)).await;
    session.settled().await;
}

/// Runs one scripted conference against an in-memory room server.
///
/// The server is reachable over a socket and a data-channel pair at once, so
/// the script can drop the socket and watch signaling fail over.
pub async fn run(config: HuddleConfig, scenario: Scenario) -> Result<Report> {
    let timeline = Timeline::start();
    let log = RequestLog::default();

    let (socket, carrier_events, emitted) = LoopbackSocket::new();
    LoopbackSocket::serve(emitted, server_handler("socket", log.clone(), timeline));
    let (link, outgoing, incoming) = channel_link(true);
    let link = Arc::new(link);
    link.clone()
        .serve(server_handler("channel", log.clone(), timeline));

    let (aggregator, signaling_events) = SignalingAggregator::new();
    let (socket_connection, socket_events) =
        SocketConnection::new(socket.clone(), carrier_events, config.signaling.socket.clone());
    aggregator.add_connection(Arc::new(socket_connection), socket_events);
    let (channel_connection, channel_events) =
        ChannelConnection::new(outgoing, incoming, config.signaling.channel.clone());
    aggregator.add_connection(Arc::new(channel_connection), channel_events);
    socket.connect();

    let provider = LoopbackProvider::new(SFU_DELAY, PEER_DELAY);
    let meters = LoopbackMeters::new();
    meters.set_level(MIC_LEVEL_DB);
    let context = MediaContext {
        provider: provider.clone(),
        signaling: aggregator.clone(),
        meters: Some(Arc::new(meters)),
        volume: config.media.volume.clone(),
    };
    let (session, session_events) = MediaSession::new(context);

    let pumps = [
        spawn_signaling_pump(signaling_events, session.clone(), timeline),
        spawn_media_pump(session_events, timeline),
    ];

    timeline.script("start microphone");
    session
        .start(
            SourceKind::Mic,
            LoopbackTrack::new("mic", TrackKind::Audio),
            Some("opus".to_owned()),
        )
        .await
        .context("Failed to start the microphone")?;
    sleep(config.media.volume.interval() * 4).await;

    timeline.script("mute");
    session.pause(SourceKind::Mic).await;
    timeline.script("unmute");
    session.resume(SourceKind::Mic).await;

    for n in 1..=scenario.peers {
        let joined = PeerJoined {
            peer_id: PeerId::from(format!("peer-{}", n)),
        };
        socket.push_notification(Notification::for_payload(&joined)?);
    }
    settle(&session).await;

    if scenario.p2p {
        timeline.script("switch to P2P");
        session.start_p2p().await;
        settle(&session).await;
    }

    timeline.script("switch to headset");
    session
        .replace_track(SourceKind::Mic, LoopbackTrack::new("headset", TrackKind::Audio))
        .await
        .context("Failed to replace the microphone track")?;

    let mic = session
        .source(SourceKind::Mic)
        .context("Microphone source is missing")?;
    let sfu = mic
        .sfu_producer()
        .context("Microphone has no server producer")?;

    timeline.script("server lowers the layer");
    link.push_notification(Notification::for_payload(&ProducerLayers {
        producer_id: sfu.id().to_owned(),
        spatial_layer: 0,
        temporal_layer: None,
    })?);
    sleep(Duration::from_millis(20)).await;

    timeline.script("socket drops");
    socket.drop_link(DisconnectReason::TransportError);
    sleep(Duration::from_millis(20)).await;

    if scenario.p2p {
        timeline.script("leave P2P");
        session.stop_p2p().await;
    } else {
        timeline.script("mute while the socket is down");
        session.pause(SourceKind::Mic).await;
        session.resume(SourceKind::Mic).await;
    }

    timeline.script("socket reconnects");
    socket.connect();
    sleep(Duration::from_millis(20)).await;

    timeline.script("server closes the producer");
    socket.push_notification(Notification::for_payload(&ProducerClosed {
        producer_id: sfu.id().to_owned(),
    })?);
    sleep(Duration::from_millis(50)).await;

    if mic.is_running() {
        timeline.failure("microphone survived the server close");
    }

    session.close().await;
    aggregator.close().await;
    sleep(Duration::from_millis(20)).await;
    for pump in pumps {
        pump.abort();
    }

    let producers = provider.sfu().producers().len()
        + (1..=scenario.peers)
            .filter_map(|n| provider.peer(&PeerId::from(format!("peer-{}", n))))
            .map(|transport| transport.producers().len())
            .sum::<usize>();
    info!("Simulation created {} producers", producers);

    let requests = std::mem::take(&mut *log.lock().unwrap_or_else(PoisonError::into_inner));

    Ok(Report {
        requests,
        producers,
    })
}
