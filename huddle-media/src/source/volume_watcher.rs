use crate::config::VolumeConfig;
use crate::model::{SourceEvent, VolumeLevel};
use crate::transport::LevelMeter;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Samples one track's level and reports changes as [`SourceEvent::Volume`].
///
/// Bound to a single track for its whole life. Replacing the track means
/// dropping this watcher and spawning a new one.
pub struct VolumeWatcher {
    track_id: String,
    task: JoinHandle<()>,
}

impl VolumeWatcher {
    pub fn spawn(
        track_id: impl Into<String>,
        mut meter: Box<dyn LevelMeter>,
        config: VolumeConfig,
        events: mpsc::UnboundedSender<SourceEvent>,
    ) -> Self {
        let track_id = track_id.into();
        debug!("Watching volume of track {}", track_id);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut detector = SpeakingDetector::new(config.threshold_db, config.speaking_history);
            let mut last = None;

            loop {
                ticker.tick().await;
                let db = meter.sample();
                let level = VolumeLevel {
                    volume: scale_volume(db),
                    speaking: detector.push(db),
                };
                if last == Some(level) {
                    continue;
                }
                last = Some(level);
                if events.send(SourceEvent::Volume(level)).is_err() {
                    break;
                }
            }
        });

        Self { track_id, task }
    }

    pub fn track_id(&self) -> &str {
        &self.track_id
    }
}

impl Drop for VolumeWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Maps dBFS onto 0..=10. The lowest audible step is folded into silence.
pub fn scale_volume(db: f64) -> u8 {
    if !db.is_finite() {
        return 0;
    }
    let scaled = (10f64.powf(db / 85.0) * 10.0).round().clamp(0.0, 10.0) as u8;
    if scaled == 1 { 0 } else { scaled }
}

/// Flips only after `history` consecutive samples on the other side of the threshold.
struct SpeakingDetector {
    threshold_db: f64,
    history: usize,
    speaking: bool,
    above: usize,
    below: usize,
}

impl SpeakingDetector {
    fn new(threshold_db: f64, history: usize) -> Self {
        Self {
            threshold_db,
            history: history.max(1),
            speaking: false,
            above: 0,
            below: 0,
        }
    }

    fn push(&mut self, db: f64) -> bool {
        if db > self.threshold_db {
            self.above += 1;
            self.below = 0;
            if !self.speaking && self.above >= self.history {
                self.speaking = true;
            }
        } else {
            self.below += 1;
            self.above = 0;
            if self.speaking && self.below >= self.history {
                self.speaking = false;
            }
        }
        self.speaking
    }
}
