//! Central notification broadcasting

use bridge_core::models::InternalNotification;
use tokio::sync::broadcast;

/// Fans internal notifications out to every connected port
pub struct EventManager {
    event_tx: broadcast::Sender<InternalNotification>,
}

impl EventManager {
    /// Create a new event manager with a broadcast channel
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(1000);
        Self { event_tx }
    }

    /// Subscribe to all notifications
    pub fn subscribe(&self) -> broadcast::Receiver<InternalNotification> {
        self.event_tx.subscribe()
    }

    /// Emit a notification to all current subscribers
    pub fn emit(&self, notification: InternalNotification) {
        match self.event_tx.send(notification) {
            Ok(count) => tracing::debug!("EventManager: notification sent to {} receivers", count),
            Err(e) => tracing::debug!("EventManager: no receivers for {}", e.0.method()),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.event_tx.receiver_count()
    }
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}
