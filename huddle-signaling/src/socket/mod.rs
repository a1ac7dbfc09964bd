mod socket_carrier;
mod socket_connection;

pub use socket_carrier::*;
pub use socket_connection::*;
