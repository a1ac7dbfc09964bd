//! In-memory media collaborators for the simulator and the test suites.

mod loopback_meter;
mod loopback_producer;
mod loopback_track;
mod loopback_transport;

pub use loopback_meter::*;
pub use loopback_producer::*;
pub use loopback_track::*;
pub use loopback_transport::*;
