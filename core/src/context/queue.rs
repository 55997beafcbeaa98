//! Ordered hand-off between the parsing worker and the handling worker.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::SendError};

use crate::client_log::TrackingEvent;

/// Producer side. Cheap to clone, never blocks.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: UnboundedSender<TrackingEvent>,
}

/// Consumer side
#[derive(Debug)]
pub struct EventReceiver {
    rx: UnboundedReceiver<TrackingEvent>,
}

pub fn event_queue() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, EventReceiver { rx })
}

impl EventSender {
    /// Fails only once the receiver is gone.
    pub fn push(&self, event: TrackingEvent) -> Result<(), SendError<TrackingEvent>> {
        self.tx.send(event)
    }
}

impl EventReceiver {
    /// Wait for the next event, then take everything already queued behind it.
    /// Returns an empty batch once all senders are dropped and the queue is empty.
    pub async fn recv_batch(&mut self) -> Vec<TrackingEvent> {
        let Some(first) = self.rx.recv().await else {
            return Vec::new();
        };
        let mut batch = vec![first];
        while let Ok(event) = self.rx.try_recv() {
            batch.push(event);
        }
        batch
    }
}
