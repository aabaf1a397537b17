//! Cooperative cancellation
//!
//! The host keeps a [`CancelHandle`]; the orchestrator races every gateway
//! call against the matching [`Cancellation`]. Once cancelled, a pair stays
//! cancelled.

use tokio::sync::watch;

/// Create a connected handle/signal pair
pub fn cancellation() -> (CancelHandle, Cancellation) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, Cancellation { rx })
}

/// Host side of the pair
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Orchestrator side of the pair. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Cancellation {
    rx: watch::Receiver<bool>,
}

impl Cancellation {
    /// A signal that never fires
    pub fn never() -> Self {
        let (_, cancellation) = cancellation();
        cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the host cancels. Pends forever if the host dropped its
    /// handle without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::never()
    }
}
