//! Shutdown coordination.

use tokio::sync::broadcast;

/// Broadcasts a single "stop now" to every long-running task.
///
/// The server subscribes alongside OS signals; tests trigger it directly.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Notify every current subscriber. Returns how many were listening.
    pub fn trigger(&self) -> usize {
        let listening = self.tx.send(()).unwrap_or(0);
        tracing::info!(subscribers = listening, "Shutdown triggered");
        listening
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
