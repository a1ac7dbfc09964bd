use huddle_core::{Notification, Request};
use huddle_signaling::ConnectionEvent;
use serde_json::json;

use crate::integration::{create_socket_connection, init_tracing};
use crate::utils::next_event;

#[tokio::test(start_paused = true)]
async fn test_server_notification_is_emitted() {
    init_tracing();

    let mut fixture = create_socket_connection();
    let _ = next_event(&mut fixture.events).await;

    let notification = Notification::new("activeSpeaker", json!({ "peerId": "bob" }));
    fixture.socket.push_notification(notification.clone());

    match next_event(&mut fixture.events).await {
        ConnectionEvent::Notification(n) => assert_eq!(n, notification),
        other => panic!("Expected notification, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_server_request_is_answered_through_the_ack() {
    init_tracing();

    let mut fixture = create_socket_connection();
    let _ = next_event(&mut fixture.events).await;

    let answer = fixture
        .socket
        .push_request(Request::new("newConsumer", json!({ "id": "c1" })));

    match next_event(&mut fixture.events).await {
        ConnectionEvent::Request(inbound) => {
            assert_eq!(inbound.method(), "newConsumer");
            inbound.respond(json!({ "accepted": true }));
        }
        other => panic!("Expected request, got {:?}", other),
    }

    assert_eq!(answer.await.unwrap(), Ok(json!({ "accepted": true })));
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_server_request_is_rejected() {
    init_tracing();

    let mut fixture = create_socket_connection();
    let _ = next_event(&mut fixture.events).await;

    let answer = fixture
        .socket
        .push_request(Request::new("newConsumer", json!({})));

    match next_event(&mut fixture.events).await {
        ConnectionEvent::Request(inbound) => drop(inbound),
        other => panic!("Expected request, got {:?}", other),
    }

    assert!(answer.await.unwrap().is_err());
}
