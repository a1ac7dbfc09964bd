mod media_session;

pub use media_session::*;
