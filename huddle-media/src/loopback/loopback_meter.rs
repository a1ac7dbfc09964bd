use crate::model::TrackKind;
use crate::transport::{LevelMeter, MediaTrack, MeterFactory};
use std::sync::{Arc, Mutex, PoisonError};

/// Meters that all read one level the test or simulator sets.
#[derive(Clone)]
pub struct LoopbackMeters {
    level: Arc<Mutex<f64>>,
}

impl LoopbackMeters {
    pub fn new() -> Self {
        Self {
            level: Arc::new(Mutex::new(f64::NEG_INFINITY)),
        }
    }

    pub fn set_level(&self, db: f64) {
        *self.level.lock().unwrap_or_else(PoisonError::into_inner) = db;
    }
}

impl Default for LoopbackMeters {
    fn default() -> Self {
        Self::new()
    }
}

struct LoopbackMeter {
    level: Arc<Mutex<f64>>,
}

impl LevelMeter for LoopbackMeter {
    fn sample(&mut self) -> f64 {
        *self.level.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MeterFactory for LoopbackMeters {
    fn attach(&self, track: &Arc<dyn MediaTrack>) -> Option<Box<dyn LevelMeter>> {
        if track.kind() != TrackKind::Audio {
            return None;
        }
        Some(Box::new(LoopbackMeter {
            level: self.level.clone(),
        }))
    }
}
