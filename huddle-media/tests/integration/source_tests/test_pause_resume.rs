use huddle_media::{Producer, SourceKind};

use crate::integration::init_tracing;
use crate::utils::{create_media_fixture, mic_track, peer, start_options};

#[tokio::test(start_paused = true)]
async fn test_pause_and_resume_reach_server_producer() {
    init_tracing();

    let fixture = create_media_fixture();
    let (source, _events) = fixture.source(SourceKind::Mic);
    source.start(start_options(&mic_track("mic"))).await.unwrap();
    let sfu = source.sfu_producer().unwrap();

    source.pause().await;
    assert!(source.is_paused());
    assert!(sfu.is_paused());

    source.pause().await;
    source.resume().await;
    assert!(!sfu.is_paused());

    assert_eq!(fixture.server.methods(), vec!["pauseProducer", "resumeProducer"]);
    assert_eq!(fixture.server.producer_ids("pauseProducer"), vec![sfu.id().to_owned()]);
}

#[tokio::test(start_paused = true)]
async fn test_pause_before_start_starts_paused() {
    init_tracing();

    let fixture = create_media_fixture();
    let (source, _events) = fixture.source(SourceKind::Mic);

    source.pause().await;
    source.start(start_options(&mic_track("mic"))).await.unwrap();

    let sfu = source.sfu_producer().unwrap();
    assert!(sfu.is_paused());
    assert_eq!(fixture.server.producer_ids("pauseProducer"), vec![sfu.id().to_owned()]);
}

#[tokio::test(start_paused = true)]
async fn test_pause_applies_to_in_flight_negotiation() {
    init_tracing();

    let fixture = create_media_fixture();
    let (source, _events) = fixture.source(SourceKind::Mic);
    source.start(start_options(&mic_track("mic"))).await.unwrap();
    source.start_p2p().await;

    source.add_peer_id(peer("alice"));
    assert!(source.is_negotiating(&peer("alice")));

    source.pause().await;
    source.settled().await;

    let alice = source.peer_producer(&peer("alice")).unwrap();
    assert!(alice.is_paused());
}

#[tokio::test(start_paused = true)]
async fn test_last_toggle_wins_for_in_flight_negotiation() {
    init_tracing();

    let fixture = create_media_fixture();
    let (source, _events) = fixture.source(SourceKind::Mic);
    source.start(start_options(&mic_track("mic"))).await.unwrap();
    source.start_p2p().await;

    source.pause().await;
    source.add_peer_id(peer("alice"));
    source.resume().await;
    source.pause().await;
    source.resume().await;
    source.settled().await;

    let alice = source.peer_producer(&peer("alice")).unwrap();
    assert!(!alice.is_paused());
}

#[tokio::test(start_paused = true)]
async fn test_resume_keeps_server_producer_paused_in_p2p() {
    init_tracing();

    let fixture = create_media_fixture();
    let (source, _events) = fixture.source(SourceKind::Mic);
    source.add_peer_id(peer("alice"));
    source.start(start_options(&mic_track("mic"))).await.unwrap();
    source.start_p2p().await;
    let sfu = source.sfu_producer().unwrap();
    assert!(sfu.is_paused());

    source.pause().await;
    source.resume().await;

    assert!(sfu.is_paused());
    assert!(!source.peer_producer(&peer("alice")).unwrap().is_paused());
    assert_eq!(fixture.server.count("resumeProducer"), 0);
}
