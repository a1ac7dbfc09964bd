mod connection;
mod connection_event;
mod inbound_request;
mod lifecycle;

pub use connection::*;
pub use connection_event::*;
pub use inbound_request::*;
pub(crate) use lifecycle::Lifecycle;
