//! Single dispatch boundary between the queue core and whatever renders it.

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::warn;

use crate::error::QueueError;
use crate::model::{JobId, JobUpdate, VideoMetadata};

/// Everything the presentation layer needs to draw the queue
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    /// A new job card should appear
    JobAdded {
        job_id: JobId,
        metadata: VideoMetadata,
    },
    /// State/progress changed for one job
    JobChanged(JobUpdate),
    /// The card was removed from the visible queue
    JobRemoved(JobId),
    /// Message for the modal error channel
    Alert(String),
}

/// Cloneable sending half; every execution context pushes through one of these.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: UnboundedSender<QueueEvent>,
}

/// Creates the sink and the receiver the UI drains each frame.
pub fn channel() -> (EventSink, UnboundedReceiver<QueueEvent>) {
    let (tx, rx) = unbounded_channel();
    (EventSink { tx }, rx)
}

impl EventSink {
    pub fn send(&self, event: QueueEvent) {
        // A closed receiver means the window is gone; nothing left to draw.
        let _ = self.tx.send(event);
    }

    pub fn publish(&self, update: JobUpdate) {
        self.send(QueueEvent::JobChanged(update));
    }

    pub fn alert(&self, err: &QueueError) {
        warn!(error = %err, "surfacing error to user");
        self.send(QueueEvent::Alert(err.to_string()));
    }
}
