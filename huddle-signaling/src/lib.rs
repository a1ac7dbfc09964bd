//! Signaling connections to the room server and the aggregate that hides them.

pub mod aggregator;
pub mod channel;
pub mod config;
pub mod connection;
pub mod error;
pub mod loopback;
pub mod socket;

pub use aggregator::*;
pub use channel::*;
pub use config::*;
pub use connection::*;
pub use error::SignalingError;
pub use socket::*;
