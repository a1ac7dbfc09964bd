use crate::error::MediaError;
use crate::model::ProducerAppData;
use crate::transport::{MediaTrack, Producer};
use async_trait::async_trait;
use huddle_core::PeerId;
use std::sync::Arc;

pub struct ProduceOptions {
    /// A clone dedicated to this transport.
    pub track: Arc<dyn MediaTrack>,
    pub codec: Option<String>,
    pub app_data: ProducerAppData,
}

/// Something that can send tracks: the forwarding-server transport or a peer link.
#[async_trait]
pub trait MediaTransport: Send + Sync + 'static {
    fn id(&self) -> &str;

    async fn produce(&self, options: ProduceOptions) -> Result<Arc<dyn Producer>, MediaError>;
}

/// Hands out transports once they are ready to produce.
#[async_trait]
pub trait TransportProvider: Send + Sync + 'static {
    async fn sfu_transport(&self) -> Result<Arc<dyn MediaTransport>, MediaError>;

    async fn peer_transport(&self, peer: &PeerId) -> Result<Arc<dyn MediaTransport>, MediaError>;
}
