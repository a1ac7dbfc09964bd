/// How a source is being stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopOptions {
    /// `true` when the local user asked for it. Decides between `Stopped` and `Closed`.
    pub local: bool,
    /// Report producer closure to the server. When `false`, every producer is
    /// marked remote-closed before it is closed.
    pub notify_server: bool,
}

impl StopOptions {
    pub fn remote() -> Self {
        Self {
            local: false,
            notify_server: false,
        }
    }
}

impl Default for StopOptions {
    fn default() -> Self {
        Self {
            local: true,
            notify_server: false,
        }
    }
}
