use tokio::sync::broadcast;

use crate::events::{Event, ProgressUpdate};

/// Broadcast channel the pipeline reports on. Subscribers (CLI progress
/// display, tests) can come and go; publishing with no subscribers is fine.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: Event) -> Result<usize, broadcast::error::SendError<Event>> {
        self.tx.send(event)
    }

    /// Publish a progress checkpoint, ignoring the no-subscriber case.
    pub fn publish_progress(&self, percent: f64, step: impl Into<String>) {
        let _ = self.publish(Event::Progress(ProgressUpdate {
            percent,
            step: step.into(),
        }));
    }
}
