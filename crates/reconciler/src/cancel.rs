//! Cancellation passed down from the invoking context.
//!
//! Every store call the reconciler makes is raced against the cancellation.
//! Store calls are all-or-nothing, so a cancelled reconcile leaves no
//! partially applied write behind.

use std::future::Future;

use tokio::sync::watch;

use crate::error::{Error, Result};

/// Owning side of a cancellation signal.
#[derive(Debug)]
pub struct CancellationSource {
    tx: watch::Sender<bool>,
}

impl CancellationSource {
    /// Create a source that has not been cancelled.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Get a cancellation handle to pass into reconciles.
    pub fn token(&self) -> Cancellation {
        Cancellation {
            rx: Some(self.tx.subscribe()),
        }
    }

    /// Signal cancellation to every handle.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for CancellationSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of a cancellation signal.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    rx: Option<watch::Receiver<bool>>,
}

impl Cancellation {
    /// A handle that is never cancelled.
    pub const fn never() -> Self {
        Self { rx: None }
    }

    /// Whether cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolve once cancellation is signalled. Never resolves for
    /// [`Cancellation::never`] or when the source is dropped uncancelled.
    pub async fn cancelled(&self) {
        if let Some(rx) = &self.rx {
            let mut rx = rx.clone();
            if rx.wait_for(|cancelled| *cancelled).await.is_ok() {
                return;
            }
        }
        std::future::pending::<()>().await;
    }

    /// Run a store call unless cancellation wins the race.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if cancelled before or during the call,
    /// otherwise the store error converted into [`Error::Store`].
    pub async fn guard<T, F>(&self, operation: &str, call: F) -> Result<T>
    where
        F: Future<Output = splitter_store::Result<T>>,
    {
        if self.is_cancelled() {
            return Err(Error::cancelled(operation));
        }

        tokio::select! {
            biased;
            () = self.cancelled() => Err(Error::cancelled(operation)),
            result = call => result.map_err(Error::from),
        }
    }
}
