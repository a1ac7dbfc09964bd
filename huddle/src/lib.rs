pub use huddle_core::model::{PeerId, WireMessage};

pub mod model {
    pub use huddle_core::*;
}

#[cfg(feature = "signaling")]
pub mod signaling {
    pub use huddle_signaling::*;
}

#[cfg(feature = "media")]
pub mod media {
    pub use huddle_media::*;
}
