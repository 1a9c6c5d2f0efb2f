//! Per-request cancellation and deadline.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::error::{FulfillmentError, Result};

/// Carries the caller's cancellation signal and optional deadline into a
/// service operation.
///
/// Cloning shares the same token: cancelling any clone cancels them all.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context that is never cancelled and has no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().deadline_at(Instant::now() + timeout)
    }

    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancels the context and every clone of it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns a guard that cancels the context when dropped.
    pub fn drop_guard(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_expired(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Fails with `Cancelled` if the caller gave up or the deadline passed.
    pub fn check(&self, operation: &'static str) -> Result<()> {
        if self.is_cancelled() {
            return Err(FulfillmentError::Cancelled {
                operation,
                reason: "request cancelled",
            });
        }
        if self.is_expired() {
            return Err(FulfillmentError::Cancelled {
                operation,
                reason: "deadline exceeded",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_fresh_context_passes() {
        let ctx = RequestContext::new();
        assert!(ctx.check("get_order_by_id").is_ok());
        assert!(ctx.deadline().is_none());
    }

    #[test]
    fn test_cancelled_context_fails() {
        let ctx = RequestContext::new();
        let clone = ctx.clone();
        clone.cancel();

        let err = ctx.check("create_order").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(err.to_string(), "create_order aborted: request cancelled");
    }

    #[tokio::test]
    async fn test_expired_deadline_fails() {
        let ctx = RequestContext::with_timeout(Duration::ZERO);

        let err = ctx.check("list_orders").unwrap_err();
        assert!(matches!(
            err,
            FulfillmentError::Cancelled {
                reason: "deadline exceeded",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_drop_guard_cancels() {
        let ctx = RequestContext::with_timeout(Duration::from_secs(60));
        {
            let _guard = ctx.drop_guard();
            assert!(!ctx.is_cancelled());
        }
        assert!(ctx.is_cancelled());
    }
}
