use crate::error::MediaError;
use crate::model::ProducerAppData;
use crate::transport::{MediaTrack, Producer};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use uuid::Uuid;

/// Producer that records what was done to it.
pub struct LoopbackProducer {
    id: String,
    app_data: ProducerAppData,
    paused: AtomicBool,
    closed: watch::Sender<bool>,
    track: Mutex<Option<Arc<dyn MediaTrack>>>,
    spatial_layer: Mutex<Option<u8>>,
}

impl LoopbackProducer {
    pub fn new(track: Arc<dyn MediaTrack>, app_data: ProducerAppData) -> Arc<Self> {
        let (closed, _) = watch::channel(false);
        Arc::new(Self {
            id: Uuid::new_v4().to_string(),
            app_data,
            paused: AtomicBool::new(false),
            closed,
            track: Mutex::new(Some(track)),
            spatial_layer: Mutex::new(None),
        })
    }

    pub fn spatial_layer(&self) -> Option<u8> {
        *self.spatial_layer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Simulates the transport closing underneath the producer.
    pub fn close_from_transport(&self) {
        self.close();
    }
}

#[async_trait]
impl Producer for LoopbackProducer {
    fn id(&self) -> &str {
        &self.id
    }

    fn app_data(&self) -> &ProducerAppData {
        &self.app_data
    }

    fn track(&self) -> Option<Arc<dyn MediaTrack>> {
        self.track
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    fn resume(&self) {
        self.paused.store(false, Ordering::Release);
    }

    async fn replace_track(&self, track: Arc<dyn MediaTrack>) -> Result<(), MediaError> {
        if self.is_closed() {
            return Err(MediaError::Transport(format!("producer {} is closed", self.id)));
        }
        let previous = self
            .track
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(track);
        if let Some(previous) = previous {
            previous.stop();
        }
        Ok(())
    }

    async fn set_max_spatial_layer(&self, layer: u8) -> Result<(), MediaError> {
        if self.is_closed() {
            return Err(MediaError::Transport(format!("producer {} is closed", self.id)));
        }
        *self
            .spatial_layer
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(layer);
        Ok(())
    }

    fn close(&self) {
        if self.closed.send_replace(true) {
            return;
        }
        if let Some(track) = self.track() {
            track.stop();
        }
    }

    async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }
}
