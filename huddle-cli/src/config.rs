use anyhow::{Context, Result};
use huddle::media::MediaConfig;
use huddle::signaling::SignalingConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Everything the simulator can be tuned with. Missing keys keep their defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HuddleConfig {
    pub signaling: SignalingConfig,
    pub media: MediaConfig,
}

impl HuddleConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}
