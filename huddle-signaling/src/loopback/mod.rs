//! In-memory carriers with a scriptable server side.
//!
//! Used by the CLI simulation and by tests; nothing here touches the network.

mod loopback_channel;
mod loopback_socket;

use huddle_core::Request;
use serde_json::Value;
use std::sync::Arc;

pub use loopback_channel::*;
pub use loopback_socket::*;

/// Server-side answer to a request: response data or an error reason.
pub type RequestHandler = Arc<dyn Fn(&Request) -> Result<Value, String> + Send + Sync>;
