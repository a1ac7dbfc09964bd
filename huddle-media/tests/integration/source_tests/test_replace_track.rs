use huddle_media::{MediaError, MediaTrack, Producer, SourceEvent, SourceKind, VolumeLevel};
use std::sync::Arc;
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{create_media_fixture, mic_track, peer, start_options};

fn assert_sends(producer: &Arc<dyn Producer>, track: &str) {
    let sent = producer.track().unwrap();
    assert!(!sent.is_stopped(), "{} sends a stopped track", producer.id());
    assert!(
        sent.id().starts_with(&format!("{}#", track)),
        "{} sends {} instead of a clone of {}",
        producer.id(),
        sent.id(),
        track
    );
}

#[tokio::test(start_paused = true)]
async fn test_replace_reaches_every_producer_before_old_track_stops() {
    init_tracing();

    let fixture = create_media_fixture();
    let (source, _events) = fixture.source(SourceKind::Mic);
    source.add_peer_id(peer("alice"));
    let old = mic_track("old");
    source.start(start_options(&old)).await.unwrap();
    source.start_p2p().await;

    source.add_peer_id(peer("bob"));
    tokio::task::yield_now().await;
    assert!(source.is_negotiating(&peer("bob")));

    let new = mic_track("new");
    source.replace_track(new.clone()).await.unwrap();

    assert!(old.is_stopped());
    assert!(!new.is_stopped());
    assert_eq!(source.track().unwrap().id(), "new");

    assert_sends(&source.sfu_producer().unwrap(), "new");
    assert_sends(&source.peer_producer(&peer("alice")).unwrap(), "new");
    assert_sends(&source.peer_producer(&peer("bob")).unwrap(), "new");

    // Every transport got its own clone.
    assert!(new.clone_count() >= 3);
}

#[tokio::test(start_paused = true)]
async fn test_replace_requires_running_source() {
    init_tracing();

    let fixture = create_media_fixture();
    let (source, _events) = fixture.source(SourceKind::Mic);

    let result = source.replace_track(mic_track("new")).await;

    assert!(matches!(result, Err(MediaError::NotRunning)));
}

#[tokio::test(start_paused = true)]
async fn test_old_track_ending_after_replace_is_ignored() {
    init_tracing();

    let fixture = create_media_fixture();
    let (source, mut events) = fixture.source(SourceKind::Mic);
    let old = mic_track("old");
    source.start(start_options(&old)).await.unwrap();
    assert_eq!(events.recv().await, Some(SourceEvent::Started));

    source.replace_track(mic_track("new")).await.unwrap();
    old.end();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(source.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_volume_watcher_follows_the_new_track() {
    init_tracing();

    let fixture = create_media_fixture();
    fixture.meters.set_level(-30.0);
    let (source, mut events) = fixture.source(SourceKind::Mic);
    source.start(start_options(&mic_track("old"))).await.unwrap();
    assert_eq!(events.recv().await, Some(SourceEvent::Started));
    tokio::time::sleep(Duration::from_millis(250)).await;

    source.replace_track(mic_track("new")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    let mut levels = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let SourceEvent::Volume(level) = event {
            levels.push(level);
        }
    }

    // The new watcher starts from scratch, so the quiet onset shows up twice.
    let quiet = VolumeLevel {
        volume: 4,
        speaking: false,
    };
    assert_eq!(levels.iter().filter(|l| **l == quiet).count(), 2);
    assert_eq!(
        levels.last(),
        Some(&VolumeLevel {
            volume: 4,
            speaking: true
        })
    );
}
