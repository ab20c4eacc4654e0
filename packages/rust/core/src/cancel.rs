//! Cooperative cancellation for long-running builds and exports.

use tokio::sync::watch;

use mdpress_shared::{MdPressError, Result};

/// Receiver side of a cancellation channel.
///
/// The sender flips the value to `true` to request cancellation. A signal
/// built with [`CancelSignal::none`] never fires.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl CancelSignal {
    /// Create a connected sender/signal pair.
    pub fn channel() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self { rx: Some(rx) })
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// `Err(Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(MdPressError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolve when cancellation is requested. Pends forever otherwise,
    /// including after the sender is dropped without firing.
    pub async fn cancelled(&self) {
        let Some(rx) = &self.rx else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
