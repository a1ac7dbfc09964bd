mod level_meter;
mod media_track;
mod media_transport;
mod producer;

pub use level_meter::*;
pub use media_track::*;
pub use media_transport::*;
pub use producer::*;
