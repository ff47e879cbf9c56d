//! Single-flight cancellation.
//!
//! The slot holds the token of the one request currently in flight. Beginning
//! a new request cancels the previous token before handing out a fresh one.

use crate::progress::RequestId;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Default)]
pub struct CancellationSlot {
    current: Mutex<Option<(RequestId, CancellationToken)>>,
}

impl CancellationSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel whatever is in flight and install a token for `request_id`
    pub fn begin(&self, request_id: RequestId) -> CancellationToken {
        let token = CancellationToken::new();
        let previous = self.current.lock().replace((request_id, token.clone()));
        if let Some((previous_id, previous_token)) = previous {
            debug!(
                previous = %previous_id,
                next = %request_id,
                "Superseding in-flight request"
            );
            previous_token.cancel();
        }
        token
    }

    /// Cancel the in-flight request, if any. Returns its id.
    pub fn cancel(&self) -> Option<RequestId> {
        let current = self.current.lock().take();
        current.map(|(request_id, token)| {
            token.cancel();
            request_id
        })
    }

    /// Release the slot once `request_id` has reached a terminal outcome.
    /// A newer request's token is left in place.
    pub fn finish(&self, request_id: RequestId) {
        let mut current = self.current.lock();
        if matches!(current.as_ref(), Some((id, _)) if *id == request_id) {
            *current = None;
        }
    }

    pub fn current(&self) -> Option<RequestId> {
        self.current.lock().as_ref().map(|(id, _)| *id)
    }

    pub fn is_active(&self) -> bool {
        self.current.lock().is_some()
    }
}
