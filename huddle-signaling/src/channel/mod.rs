mod channel_connection;
mod channel_endpoint;
#[cfg(feature = "webrtc")]
mod data_channel;
mod pending;

pub use channel_connection::*;
pub use channel_endpoint::*;
#[cfg(feature = "webrtc")]
pub use data_channel::*;
