mod peer;
mod request;
mod signaling;
mod wire;

pub use peer::PeerId;
pub use request::{ConnectionId, MessageId};
pub use signaling::{
    CloseProducer, PauseProducer, PeerJoined, PeerLeft, ProducerClosed, ProducerLayers,
    ResumeProducer, ServerNotification,
};
pub use wire::{Notification, Request, Response, WireMessage};
