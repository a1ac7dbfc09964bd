use crate::model::peer::PeerId;
use crate::model::wire::Notification;
use crate::traits::Payload;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseProducer {
    pub producer_id: String,
}

impl Payload for PauseProducer {
    const METHOD: &'static str = "pauseProducer";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeProducer {
    pub producer_id: String,
}

impl Payload for ResumeProducer {
    const METHOD: &'static str = "resumeProducer";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseProducer {
    pub producer_id: String,
}

impl Payload for CloseProducer {
    const METHOD: &'static str = "closeProducer";
}

/// Server closed one of our producers on its side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProducerClosed {
    pub producer_id: String,
}

impl Payload for ProducerClosed {
    const METHOD: &'static str = "producerClosed";
}

/// Server hint about which simulcast layers are worth sending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProducerLayers {
    pub producer_id: String,
    pub spatial_layer: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporal_layer: Option<u8>,
}

impl Payload for ProducerLayers {
    const METHOD: &'static str = "producerLayers";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerJoined {
    pub peer_id: PeerId,
}

impl Payload for PeerJoined {
    const METHOD: &'static str = "peerJoined";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerLeft {
    pub peer_id: PeerId,
}

impl Payload for PeerLeft {
    const METHOD: &'static str = "peerLeft";
}

/// Server-pushed notifications the media layer reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerNotification {
    ProducerClosed(ProducerClosed),
    ProducerLayers(ProducerLayers),
    PeerJoined(PeerJoined),
    PeerLeft(PeerLeft),
}

impl ServerNotification {
    /// Classifies a notification. Unknown methods and bad payloads yield `None`.
    pub fn from_notification(notification: &Notification) -> Option<Self> {
        let method = notification.method.as_str();

        let parsed = if method == ProducerClosed::METHOD {
            notification.decode().map(Self::ProducerClosed)
        } else if method == ProducerLayers::METHOD {
            notification.decode().map(Self::ProducerLayers)
        } else if method == PeerJoined::METHOD {
            notification.decode().map(Self::PeerJoined)
        } else if method == PeerLeft::METHOD {
            notification.decode().map(Self::PeerLeft)
        } else {
            return None;
        };

        match parsed {
            Ok(n) => Some(n),
            Err(e) => {
                warn!("Ignoring malformed '{}' notification: {}", method, e);
                None
            }
        }
    }
}
