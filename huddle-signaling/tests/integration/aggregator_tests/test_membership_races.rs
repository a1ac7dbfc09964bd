use huddle_signaling::{Connection, SignalingAggregator, SignalingEvent};
use serde_json::Value;
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{MockConnection, assert_no_event};

/// Polls until the aggregate has no members and reports itself disconnected.
async fn wait_until_empty(aggregator: &SignalingAggregator) -> bool {
    for _ in 0..2_000 {
        if aggregator.connection_count() == 0 && !aggregator.is_connected() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    false
}

#[tokio::test(start_paused = true)]
async fn test_already_closed_connection_is_ignored() {
    init_tracing();

    let (aggregator, mut events) = SignalingAggregator::new();
    let (a, a_events) = MockConnection::new(Value::Null);
    a.connect();
    a.close_remotely();
    assert!(a.is_closed());

    aggregator.add_connection(a.clone(), a_events);

    assert_eq!(aggregator.connection_count(), 0);
    assert!(!aggregator.is_connected());
    assert_no_event(&mut events).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_member_closing_while_added_never_lingers() {
    init_tracing();

    for round in 0..200 {
        let (aggregator, _events) = SignalingAggregator::new();
        let (a, a_events) = MockConnection::new(Value::Null);
        a.connect();

        let closer = {
            let a = a.clone();
            tokio::spawn(async move { a.close_remotely() })
        };
        aggregator.add_connection(a.clone(), a_events);
        closer.await.unwrap();

        assert!(
            wait_until_empty(&aggregator).await,
            "round {}: {} member(s) left, connected = {}",
            round,
            aggregator.connection_count(),
            aggregator.is_connected()
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_closed_member_leaves_survivor_connected() {
    init_tracing();

    for round in 0..200 {
        let (aggregator, mut events) = SignalingAggregator::new();
        let (a, a_events) = MockConnection::new(Value::Null);
        let (b, b_events) = MockConnection::new(Value::Null);
        b.connect();
        aggregator.add_connection(b.clone(), b_events);
        assert!(matches!(events.recv().await, Some(SignalingEvent::Connected)));

        a.connect();
        let closer = {
            let a = a.clone();
            tokio::spawn(async move { a.close_remotely() })
        };
        aggregator.add_connection(a.clone(), a_events);
        closer.await.unwrap();

        let mut settled = false;
        for _ in 0..2_000 {
            if aggregator.connection_count() == 1 {
                settled = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(settled, "round {}: closed member still in the set", round);
        assert!(aggregator.is_connected());
    }
}
