//! Cooperative cancellation shared between the caller and a running fetch.

use tokio::sync::watch;

/// Creates a connected [`CancelHandle`] and [`CancelSignal`].
pub fn channel() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(tx), CancelSignal(rx))
}

/// Raises the cancellation signal.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    /// Marks every subscribed signal as cancelled. Calling it twice is a no-op.
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    pub fn subscribe(&self) -> CancelSignal {
        CancelSignal(self.0.subscribe())
    }
}

/// Observes cancellation. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CancelSignal(watch::Receiver<bool>);

impl CancelSignal {
    /// A signal that is never raised.
    pub fn never() -> Self {
        let (_, signal) = channel();
        signal
    }

    pub fn is_signaled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once the signal is raised.
    ///
    /// If the handle is dropped without cancelling, this never resolves.
    pub async fn cancelled(&self) {
        let mut rx = self.0.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
