use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sampling and speaking detection for the volume watcher.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    pub interval_ms: u64,
    /// Level in dBFS above which a sample counts as speech.
    pub threshold_db: f64,
    /// Consecutive samples needed to flip the speaking state.
    pub speaking_history: usize,
}

impl VolumeConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            threshold_db: -50.0,
            speaking_history: 3,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub volume: VolumeConfig,
}
