//! Per-source media production toward the forwarding server and direct peers.

pub mod config;
pub mod error;
pub mod loopback;
pub mod model;
pub mod session;
pub mod source;
pub mod transport;

pub use config::*;
pub use error::MediaError;
pub use model::*;
pub use session::*;
pub use source::*;
pub use transport::*;
