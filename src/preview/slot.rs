// Cancel-and-supersede slot: at most one live request per slot

use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;

struct LiveRequest {
    token: CancellationToken,
    finished: oneshot::Receiver<()>,
}

/// Held by a request for its whole lifetime. Dropping it tells the slot the request's
/// process is gone.
pub struct RequestGuard {
    token: CancellationToken,
    _finished: oneshot::Sender<()>,
}

impl RequestGuard {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

pub struct RequestSlot {
    parent: CancellationToken,
    current: Mutex<Option<LiveRequest>>,
}

impl RequestSlot {
    pub fn new(parent: CancellationToken) -> Self {
        Self {
            parent,
            current: Mutex::new(None),
        }
    }

    /// Cancels the previous request, waits until it has finished, then registers a new one.
    pub async fn supersede(&self) -> RequestGuard {
        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            previous.token.cancel();
            let _ = previous.finished.await;
        }

        let token = self.parent.child_token();
        let (tx, rx) = oneshot::channel();
        *current = Some(LiveRequest {
            token: token.clone(),
            finished: rx,
        });

        RequestGuard {
            token,
            _finished: tx,
        }
    }

    pub async fn cancel_current(&self) {
        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            previous.token.cancel();
            let _ = previous.finished.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_new_request_waits_for_previous_to_finish() {
        let slot = Arc::new(RequestSlot::new(CancellationToken::new()));
        let first = slot.supersede().await;
        let first_done = Arc::new(AtomicBool::new(false));

        let done = first_done.clone();
        let worker = tokio::spawn(async move {
            first.token().cancelled().await;
            tokio::time::sleep(Duration::from_millis(50)).await;
            done.store(true, Ordering::SeqCst);
            drop(first);
        });

        let second = slot.supersede().await;
        assert!(first_done.load(Ordering::SeqCst));
        assert!(!second.is_cancelled());
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn test_parent_cancel_reaches_request() {
        let parent = CancellationToken::new();
        let slot = RequestSlot::new(parent.clone());
        let guard = slot.supersede().await;

        parent.cancel();
        assert!(guard.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_current_after_finish_is_noop() {
        let slot = RequestSlot::new(CancellationToken::new());
        let guard = slot.supersede().await;
        drop(guard);
        slot.cancel_current().await;
        slot.cancel_current().await;
    }
}
