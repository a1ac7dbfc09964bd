mod media_source;
mod peer_production;
mod volume_watcher;

pub use media_source::*;
pub use volume_watcher::*;
