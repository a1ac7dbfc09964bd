use std::time::Duration;
use tokio::sync::mpsc;

/// Waits for the next event, failing the test if none shows up within 5s.
pub async fn next_event<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("Timed out waiting for event")
        .expect("Event stream ended")
}

/// Lets spawned tasks drain their queues, then asserts nothing else arrived.
pub async fn assert_no_event<T: std::fmt::Debug>(rx: &mut mpsc::UnboundedReceiver<T>) {
    tokio::time::sleep(Duration::from_millis(50)).await;
    if let Ok(event) = rx.try_recv() {
        panic!("Unexpected event: {:?}", event);
    }
}
