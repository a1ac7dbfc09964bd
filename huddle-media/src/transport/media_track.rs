use crate::model::TrackKind;
use async_trait::async_trait;
use std::sync::Arc;

/// A captured media track.
///
/// Every transport gets its own clone and may stop it independently. The
/// canonical track is only ever stopped by the source that owns it.
#[async_trait]
pub trait MediaTrack: Send + Sync + 'static {
    fn id(&self) -> &str;

    fn kind(&self) -> TrackKind;

    fn clone_track(&self) -> Arc<dyn MediaTrack>;

    fn stop(&self);

    fn is_stopped(&self) -> bool;

    /// Resolves when the track ends on its own, e.g. the device went away.
    /// Calling [`stop`](Self::stop) does not resolve it.
    async fn ended(&self);
}
