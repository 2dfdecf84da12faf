use tokio::sync::broadcast;

use crate::event::MarketEvent;

const DEFAULT_CAPACITY: usize = 1024;

/// Fan-out of JSON frames to every connected WebSocket client.
///
/// Publishing never blocks the signal workers. A client that falls more than
/// `capacity` frames behind is cut off by its connection task.
#[derive(Debug, Clone)]
pub struct Hub {
    tx: broadcast::Sender<String>,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Hub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Returns the number of clients the frame was queued for.
    pub fn publish_json(&self, frame: String) -> usize {
        self.tx.send(frame).unwrap_or(0)
    }

    pub fn publish_event(&self, event: &MarketEvent) -> usize {
        match event.to_json() {
            Ok(frame) => self.publish_json(frame),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize market event");
                0
            }
        }
    }
}
