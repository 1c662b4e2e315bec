use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tracing::info;

use crate::tournament::CancelCheck;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelState {
    AwaitingCancelOrTimeout,
    Cancelled,
    TimedOut,
}

impl CancelState {
    pub fn is_cancelled(self) -> bool {
        self == CancelState::Cancelled
    }
}

/// User-abort signal shared between whoever can cancel (a button, Ctrl+C)
/// and the session waiting between rounds. Once cancelled it stays
/// cancelled until [`CancelGate::reset`].
#[derive(Clone)]
pub struct CancelGate {
    tx: Arc<watch::Sender<bool>>,
    state: Arc<Mutex<CancelState>>,
}

impl Default for CancelGate {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelGate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        CancelGate {
            tx: Arc::new(tx),
            state: Arc::new(Mutex::new(CancelState::TimedOut)),
        }
    }

    pub fn cancel(&self) {
        if !self.tx.send_replace(true) {
            info!("cancel requested");
        }
    }

    pub fn reset(&self) {
        self.tx.send_replace(false);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// State of the most recent wait.
    pub fn state(&self) -> CancelState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: CancelState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Wait up to `timeout` for a cancel. Returns immediately if one is
    /// already pending.
    pub async fn await_cancellation(&self, timeout: Duration) -> CancelState {
        self.set_state(CancelState::AwaitingCancelOrTimeout);
        let mut rx = self.tx.subscribe();
        let outcome = if *rx.borrow_and_update() {
            CancelState::Cancelled
        } else {
            match tokio::time::timeout(timeout, rx.wait_for(|cancelled| *cancelled)).await {
                Ok(Ok(_)) => CancelState::Cancelled,
                Ok(Err(_)) | Err(_) => CancelState::TimedOut,
            }
        };
        self.set_state(outcome);
        outcome
    }

    pub async fn await_cancellation_ms(&self, timeout_ms: u64) -> bool {
        self.await_cancellation(Duration::from_millis(timeout_ms))
            .await
            .is_cancelled()
    }
}

impl CancelCheck for CancelGate {
    fn should_cancel(&mut self) -> bool {
        self.is_cancelled()
    }
}
