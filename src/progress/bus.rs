//! In-process event bus for progress events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::trace;

use crate::progress::event::{timestamp_now, GenerationProgress, ProgressEvent, ProgressSource};

#[derive(Clone)]
pub struct ProgressBus {
    sender: UnboundedSender<ProgressEvent>,
    seq: Arc<AtomicU64>,
}

impl ProgressBus {
    pub fn new_pair() -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = unbounded_channel();
        (
            Self {
                sender,
                seq: Arc::new(AtomicU64::new(1)),
            },
            receiver,
        )
    }

    /// Publish an event. A dropped receiver is not an error for the producer.
    pub fn emit(&self, source: ProgressSource, progress: Option<GenerationProgress>) {
        let event = ProgressEvent {
            ts: timestamp_now(),
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            source,
            progress,
        };
        if self.sender.send(event).is_err() {
            trace!(?source, "Progress receiver dropped; event discarded");
        }
    }
}
