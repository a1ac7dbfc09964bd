mod signaling_aggregator;
mod signaling_event;

pub use signaling_aggregator::*;
pub use signaling_event::*;
