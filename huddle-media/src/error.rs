use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("source is already running")]
    AlreadyRunning,

    /// A stopped source cannot be restarted.
    #[error("source was stopped, create a new one")]
    Terminated,

    #[error("source is not running")]
    NotRunning,

    /// Producing toward `target` failed.
    #[error("production toward {target} failed: {reason}")]
    Production { target: String, reason: String },

    /// `stop` was called while `start` was still negotiating.
    #[error("start aborted by stop")]
    Aborted,

    #[error("transport error: {0}")]
    Transport(String),
}
