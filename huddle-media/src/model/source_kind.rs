use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

/// One logical capture source. Each gets its own production state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceKind {
    Mic,
    Webcam,
    Screen,
    ExtraAudio,
    ExtraVideo,
}

impl SourceKind {
    pub fn track_kind(&self) -> TrackKind {
        match self {
            SourceKind::Mic | SourceKind::ExtraAudio => TrackKind::Audio,
            SourceKind::Webcam | SourceKind::Screen | SourceKind::ExtraVideo => TrackKind::Video,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Mic => "mic",
            SourceKind::Webcam => "webcam",
            SourceKind::Screen => "screen",
            SourceKind::ExtraAudio => "extraAudio",
            SourceKind::ExtraVideo => "extraVideo",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
