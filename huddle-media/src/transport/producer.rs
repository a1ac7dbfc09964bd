use crate::error::MediaError;
use crate::model::ProducerAppData;
use crate::transport::MediaTrack;
use async_trait::async_trait;
use std::sync::Arc;

/// Handle to one track being sent over one transport.
#[async_trait]
pub trait Producer: Send + Sync + 'static {
    fn id(&self) -> &str;

    fn app_data(&self) -> &ProducerAppData;

    fn track(&self) -> Option<Arc<dyn MediaTrack>>;

    fn is_paused(&self) -> bool;

    fn is_closed(&self) -> bool;

    fn pause(&self);

    fn resume(&self);

    /// Sends `track` from now on. The producer owns the clone it is given.
    async fn replace_track(&self, track: Arc<dyn MediaTrack>) -> Result<(), MediaError>;

    async fn set_max_spatial_layer(&self, layer: u8) -> Result<(), MediaError>;

    /// Idempotent.
    fn close(&self);

    /// Resolves once the producer is closed, by us or by its transport.
    async fn closed(&self);
}
