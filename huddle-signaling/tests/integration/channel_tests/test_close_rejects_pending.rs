use huddle_core::Request;
use huddle_signaling::{Connection, ConnectionEvent, SignalingError};
use serde_json::Value;

use crate::integration::{create_channel_connection, init_tracing};
use crate::utils::{assert_no_event, next_event};

#[tokio::test(start_paused = true)]
async fn test_close_rejects_every_outstanding_request() {
    init_tracing();

    let mut fixture = create_channel_connection(true);
    assert!(matches!(
        next_event(&mut fixture.events).await,
        ConnectionEvent::Connected
    ));

    let mut waiting = Vec::new();
    for i in 0..3 {
        let connection = fixture.connection.clone();
        waiting.push(tokio::spawn(async move {
            connection
                .request(Request::new(format!("req-{i}"), Value::Null))
                .await
        }));
        let _ = fixture.link.next_frame().await;
    }
    assert_eq!(fixture.connection.pending_requests(), 3);

    fixture.connection.close().await;

    for handle in waiting {
        assert!(matches!(
            handle.await.unwrap(),
            Err(SignalingError::TransportClosed)
        ));
    }
    assert_eq!(fixture.connection.pending_requests(), 0);

    assert!(matches!(
        next_event(&mut fixture.events).await,
        ConnectionEvent::Closed
    ));

    fixture.link.incoming.deliver(r#"{"id":"n","notification":true,"method":"late"}"#);
    fixture.connection.close().await;
    assert_no_event(&mut fixture.events).await;
}

#[tokio::test(start_paused = true)]
async fn test_requests_after_close_are_refused() {
    init_tracing();

    let fixture = create_channel_connection(true);
    fixture.connection.close().await;

    let result = fixture
        .connection
        .request(Request::new("join", Value::Null))
        .await;

    assert!(matches!(result, Err(SignalingError::TransportClosed)));
}
