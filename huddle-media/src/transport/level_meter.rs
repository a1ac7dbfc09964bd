use crate::transport::MediaTrack;
use std::sync::Arc;

/// Reads the current level of one audio track.
pub trait LevelMeter: Send + 'static {
    /// Current level in dBFS.
    fn sample(&mut self) -> f64;
}

pub trait MeterFactory: Send + Sync + 'static {
    /// `None` when the track cannot be metered, e.g. video.
    fn attach(&self, track: &Arc<dyn MediaTrack>) -> Option<Box<dyn LevelMeter>>;
}
