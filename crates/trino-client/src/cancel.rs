//! Caller-side cancellation.

use tokio_util::sync::CancellationToken;

/// Handle used to cancel a running query from another task.
///
/// Cloning shares the underlying signal. Canceling interrupts the query at
/// its next wait point; the client then asks the coordinator to drop the
/// query and the stream reports [`Error::Canceled`](crate::Error::Canceled).
///
/// # Example
///
/// ```rust
/// use trino_client::{CancelHandle, Query};
///
/// let cancel = CancelHandle::new();
/// let query = Query::new("SELECT * FROM tpch.sf1.lineitem").with_cancel(cancel.clone());
/// // ... hand `cancel` to another task
/// cancel.cancel();
/// assert!(cancel.is_canceled());
/// # drop(query);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    /// Create a new, untriggered handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing token, e.g. one shared with a server shutdown path.
    #[must_use]
    pub fn from_token(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether cancellation was signaled.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A handle canceled whenever this one is, but cancelable on its own.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    /// The underlying token.
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub(crate) async fn canceled(&self) {
        self.token.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_follows_parent() {
        let parent = CancelHandle::new();
        let child = parent.child();
        child.cancel();
        assert!(!parent.is_canceled());

        let other = parent.child();
        parent.cancel();
        assert!(other.is_canceled());
    }

    #[tokio::test]
    async fn test_canceled_resolves() {
        let handle = CancelHandle::new();
        let waiter = handle.clone();
        let task = tokio::spawn(async move { waiter.canceled().await });
        handle.cancel();
        task.await.unwrap_or_default();
        assert!(handle.is_canceled());
    }

    #[test]
    fn test_already_canceled_resolves_immediately() {
        let handle = CancelHandle::new();
        handle.cancel();
        tokio_test::block_on(handle.canceled());
        assert!(handle.child().is_canceled());
    }
}
