use huddle_signaling::{Connection, SignalingAggregator, SignalingEvent};
use serde_json::Value;

use crate::integration::init_tracing;
use crate::utils::{MockConnection, assert_no_event, next_event};

#[tokio::test(start_paused = true)]
async fn test_connected_fires_once_for_first_member() {
    init_tracing();

    let (aggregator, mut events) = SignalingAggregator::new();
    let (a, a_events) = MockConnection::new(Value::Null);
    let (b, b_events) = MockConnection::new(Value::Null);
    assert!(!aggregator.is_connected());

    a.connect();
    aggregator.add_connection(a.clone(), a_events);
    assert!(matches!(
        next_event(&mut events).await,
        SignalingEvent::Connected
    ));

    b.connect();
    aggregator.add_connection(b.clone(), b_events);
    assert_no_event(&mut events).await;

    assert!(aggregator.is_connected());
    assert_eq!(aggregator.connection_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_losing_last_member_flips_connected_off() {
    init_tracing();

    let (aggregator, mut events) = SignalingAggregator::new();
    let (a, a_events) = MockConnection::new(Value::Null);
    let (b, b_events) = MockConnection::new(Value::Null);
    a.connect();
    b.connect();
    aggregator.add_connection(a.clone(), a_events);
    aggregator.add_connection(b.clone(), b_events);
    let _ = next_event(&mut events).await;

    a.close_remotely();
    assert_no_event(&mut events).await;
    assert!(aggregator.is_connected());
    assert_eq!(aggregator.connection_count(), 1);

    b.close_remotely();
    assert!(matches!(next_event(&mut events).await, SignalingEvent::Closed));
    assert!(!aggregator.is_connected());
    assert_eq!(aggregator.connection_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_all_members_reconnecting_and_back() {
    init_tracing();

    let (aggregator, mut events) = SignalingAggregator::new();
    let (a, a_events) = MockConnection::new(Value::Null);
    a.connect();
    aggregator.add_connection(a.clone(), a_events);
    let _ = next_event(&mut events).await;

    a.drop_link();
    assert!(matches!(
        next_event(&mut events).await,
        SignalingEvent::Reconnecting
    ));
    assert!(!aggregator.is_connected());

    a.connect();
    assert!(matches!(
        next_event(&mut events).await,
        SignalingEvent::Connected
    ));
    assert!(aggregator.is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_close_tears_down_members_and_is_final() {
    init_tracing();

    let (aggregator, mut events) = SignalingAggregator::new();
    let (a, a_events) = MockConnection::new(Value::Null);
    a.connect();
    aggregator.add_connection(a.clone(), a_events);
    let _ = next_event(&mut events).await;

    aggregator.close().await;
    aggregator.close().await;

    assert!(a.is_closed());
    assert!(aggregator.is_closed());
    assert!(matches!(next_event(&mut events).await, SignalingEvent::Closed));
    assert_no_event(&mut events).await;

    let (b, b_events) = MockConnection::new(Value::Null);
    b.connect();
    aggregator.add_connection(b.clone(), b_events);
    assert_eq!(aggregator.connection_count(), 0);
    assert_eq!(aggregator.send_request("join", Value::Null).await, None);
    assert!(b.requests().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_keeps_aggregate_usable() {
    init_tracing();

    let (aggregator, mut events) = SignalingAggregator::new();
    let (a, a_events) = MockConnection::new(Value::Null);
    a.connect();
    aggregator.add_connection(a.clone(), a_events);
    let _ = next_event(&mut events).await;

    aggregator.disconnect().await;
    assert!(matches!(next_event(&mut events).await, SignalingEvent::Closed));
    assert!(a.is_closed());
    assert!(!aggregator.is_closed());

    let (b, b_events) = MockConnection::new(Value::Null);
    b.connect();
    aggregator.add_connection(b.clone(), b_events);
    assert!(matches!(
        next_event(&mut events).await,
        SignalingEvent::Connected
    ));
}
