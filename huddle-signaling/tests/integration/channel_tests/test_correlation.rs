use huddle_core::{MessageId, Notification, Request, Response, WireMessage};
use huddle_signaling::{Connection, ConnectionEvent, SignalingError};
use serde_json::{Value, json};
use std::time::Duration;

use crate::integration::{create_channel_connection, init_tracing};
use crate::utils::next_event;

fn expect_request(frame: Option<WireMessage>) -> Request {
    match frame {
        Some(WireMessage::Request(request)) => request,
        other => panic!("Expected request frame, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_responses_match_requests_by_id_not_order() {
    init_tracing();

    let fixture = create_channel_connection(true);

    let first = tokio::spawn({
        let connection = fixture.connection.clone();
        async move { connection.request(Request::new("first", Value::Null)).await }
    });
    let a = expect_request(fixture.link.next_frame().await);

    let second = tokio::spawn({
        let connection = fixture.connection.clone();
        async move { connection.request(Request::new("second", Value::Null)).await }
    });
    let b = expect_request(fixture.link.next_frame().await);

    fixture
        .link
        .push(Response::success(&b, json!(b.method)).into());
    fixture
        .link
        .push(Response::success(&a, json!(a.method)).into());

    assert_eq!(first.await.unwrap().unwrap(), json!("first"));
    assert_eq!(second.await.unwrap().unwrap(), json!("second"));
    assert_eq!(fixture.connection.pending_requests(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_error_response_is_a_remote_error() {
    init_tracing();

    let fixture = create_channel_connection(true);

    let pending = tokio::spawn({
        let connection = fixture.connection.clone();
        async move { connection.request(Request::new("produce", Value::Null)).await }
    });
    let request = expect_request(fixture.link.next_frame().await);
    fixture
        .link
        .push(Response::error(&request, "transport not found").into());

    let result = pending.await.unwrap();
    assert!(matches!(result, Err(SignalingError::Remote(ref r)) if r == "transport not found"));
}

#[tokio::test(start_paused = true)]
async fn test_unknown_response_and_garbage_are_dropped() {
    init_tracing();

    let mut fixture = create_channel_connection(true);
    let _ = next_event(&mut fixture.events).await;

    fixture.link.push(WireMessage::Response(Response {
        id: MessageId::from("never-sent"),
        data: json!(1),
        error_reason: None,
    }));
    fixture.link.incoming.deliver("[1, 2, 3]");
    fixture.link.incoming.deliver("{ definitely not json");
    fixture.link.incoming.deliver(r#"{"id":"x","request":true,"response":true,"method":"m"}"#);

    let notification = Notification::new("roomReady", json!({}));
    fixture.link.push_notification(notification.clone());

    match next_event(&mut fixture.events).await {
        ConnectionEvent::Notification(n) => assert_eq!(n, notification),
        other => panic!("Expected notification, got {:?}", other),
    }
    assert!(!fixture.connection.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_request_uses_adaptive_timeout() {
    init_tracing();

    let fixture = create_channel_connection(true);
    let started = tokio::time::Instant::now();

    let result = fixture
        .connection
        .request(Request::new("join", Value::Null))
        .await;

    assert!(matches!(result, Err(SignalingError::Timeout { .. })));
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(22_500));
    assert!(elapsed < Duration::from_millis(23_000));
    assert_eq!(fixture.connection.pending_requests(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_server_request_is_answered_over_the_channel() {
    init_tracing();

    let mut fixture = create_channel_connection(true);
    let _ = next_event(&mut fixture.events).await;

    let request = Request::new("newConsumer", json!({ "id": "c1" }));
    fixture.link.push(request.clone().into());

    match next_event(&mut fixture.events).await {
        ConnectionEvent::Request(inbound) => inbound.reject("no room for it"),
        other => panic!("Expected request, got {:?}", other),
    }

    match fixture.link.next_frame().await {
        Some(WireMessage::Response(response)) => {
            assert_eq!(response.id, request.id);
            assert_eq!(response.error_reason.as_deref(), Some("no room for it"));
        }
        other => panic!("Expected response frame, got {:?}", other),
    }
}
