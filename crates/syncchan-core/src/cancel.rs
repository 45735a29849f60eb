//! Cancellation token for interrupting blocked callers
//!
//! A producer blocked on a full queue or on a pending response re-checks
//! its token every park interval. Cancelling the token makes the blocked
//! call return `ChannelError::Interrupted`.
//! Tokens can be linked to form parent-child relationships.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use crate::error::{ChannelError, ChannelResult};

#[derive(Clone)]
pub struct CancellationToken {
    inner: Option<Arc<TokenInner>>,
}

struct TokenInner {
    cancelled: AtomicBool,
    parent: Option<CancellationToken>,
}

impl CancellationToken {
    /// Create a new independent token
    pub fn new() -> Self {
        Self {
            inner: Some(Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                parent: None,
            })),
        }
    }

    /// Token that is never cancelled; does not allocate
    pub const fn never() -> Self {
        Self { inner: None }
    }

    /// Create a child token
    ///
    /// Cancelling this token cancels the child; not the other way round.
    pub fn child(&self) -> Self {
        Self {
            inner: Some(Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                parent: Some(self.clone()),
            })),
        }
    }

    /// Check if cancellation was requested here or on any ancestor
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        let mut current = self;
        while let Some(inner) = &current.inner {
            if inner.cancelled.load(Ordering::Acquire) {
                return true;
            }
            match &inner.parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        false
    }

    /// Request cancellation; no-op on a `never()` token
    pub fn cancel(&self) {
        if let Some(inner) = &self.inner {
            inner.cancelled.store(true, Ordering::Release);
        }
    }

    /// `Err(Interrupted)` once cancelled
    #[inline]
    pub fn check(&self) -> ChannelResult<()> {
        if self.is_cancelled() {
            Err(ChannelError::Interrupted)
        } else {
            Ok(())
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
