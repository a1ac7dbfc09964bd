use tokio::sync::mpsc;

/// Audio level snapshot. `volume` is on a 0 to 10 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeLevel {
    pub volume: u8,
    pub speaking: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    Started,
    /// Stopped on request of the local user.
    Stopped,
    /// Stopped by the server, the device or a failure. The UI may retry.
    Closed,
    Volume(VolumeLevel),
}

pub type SourceEvents = mpsc::UnboundedReceiver<SourceEvent>;
