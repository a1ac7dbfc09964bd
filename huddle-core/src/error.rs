use thiserror::Error;

/// Reasons a frame could not be decoded or a payload could not be mapped.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("frame is not a JSON object")]
    NotAnObject,

    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("payload for '{expected}' decoded from a '{actual}' message")]
    MethodMismatch { expected: &'static str, actual: String },

    #[error("payload error: {0}")]
    Payload(#[from] serde_json::Error),
}
