mod event_helpers;
mod mock_connection;

pub use event_helpers::*;
pub use mock_connection::*;
