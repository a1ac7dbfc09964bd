use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning for the acknowledged socket carrier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketConfig {
    /// How long one attempt waits for the server acknowledgement.
    pub request_timeout_ms: u64,
    /// Total attempts per request. Only timeouts are retried.
    pub request_attempts: u32,
}

impl SocketConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 3_000,
            request_attempts: 3,
        }
    }
}

/// Tuning for the unacknowledged data-channel carrier.
///
/// A request waits `base * (offset + load_factor * pending)` where `pending` is
/// the number of requests already in flight on the same connection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub timeout_base_ms: u64,
    pub timeout_offset: f64,
    pub timeout_load_factor: f64,
}

impl ChannelConfig {
    pub fn request_timeout(&self, pending: usize) -> Duration {
        let factor = self.timeout_offset + self.timeout_load_factor * pending as f64;
        Duration::from_secs_f64(self.timeout_base_ms as f64 * factor.max(0.0) / 1_000.0)
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            timeout_base_ms: 1_500,
            timeout_offset: 15.0,
            timeout_load_factor: 0.1,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingConfig {
    pub socket: SocketConfig,
    pub channel: ChannelConfig,
}
