mod app_data;
mod source_event;
mod source_kind;
mod stop_options;

pub use app_data::*;
pub use source_event::*;
pub use source_kind::*;
pub use stop_options::*;
