use huddle_core::CodecError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalingError {
    /// No answer within the carrier's budget, after every allowed attempt.
    #[error("request '{method}' timed out after {attempts} attempt(s)")]
    Timeout { method: String, attempts: u32 },

    /// The connection was closed while the request was pending, or before it was sent.
    #[error("transport closed")]
    TransportClosed,

    /// The remote side answered with an error.
    #[error("remote error: {0}")]
    Remote(String),

    /// The underlying send primitive failed.
    #[error("carrier error: {0}")]
    Carrier(String),

    #[error("carrier is not connected")]
    NotConnected,

    #[error(transparent)]
    Codec(#[from] CodecError),

    /// An inbound request was dropped without an answer.
    #[error("request dropped without a reply")]
    RequestDropped,
}

impl SignalingError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SignalingError::Timeout { .. })
    }
}
