//! One-shot response handle
//!
//! Every request carries a fresh `Responder` / `ResponseHandle` pair. The
//! worker resolves the responder exactly once; the producer blocks on the
//! handle until that happens.
//!
//! `Responder::resolve` consumes the responder, so a second resolution
//! cannot be expressed. A responder dropped without resolving (worker
//! gone, envelope discarded) resolves the handle with
//! `ChannelError::Unavailable` instead of leaving the producer hanging.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cancel::CancellationToken;
use crate::constants::DEFAULT_PARK_INTERVAL;
use crate::error::{ChannelError, ChannelResult};
use crate::parking::{Parking, PlatformParking};
use crate::spinlock::SpinLock;

/// Create a linked responder / handle pair
pub fn pair<T>() -> (Responder<T>, ResponseHandle<T>) {
    let slot = Arc::new(Slot {
        value: SpinLock::new(None),
        resolved: AtomicBool::new(false),
        parking: PlatformParking::new(),
    });

    (
        Responder { slot: Some(Arc::clone(&slot)) },
        ResponseHandle { slot },
    )
}

struct Slot<T> {
    value: SpinLock<Option<ChannelResult<T>>>,
    resolved: AtomicBool,
    parking: PlatformParking,
}

impl<T> Slot<T> {
    fn fill(&self, result: ChannelResult<T>) {
        *self.value.lock() = Some(result);
        self.resolved.store(true, Ordering::Release);
        self.parking.wake_all();
    }

    fn take(&self) -> ChannelResult<T> {
        // Only reachable once `resolved` is set, which happens after the store
        self.value.lock().take().unwrap_or(Err(ChannelError::Unavailable))
    }
}

/// Writing side, owned by the worker
pub struct Responder<T> {
    slot: Option<Arc<Slot<T>>>,
}

impl<T> Responder<T> {
    /// Deliver the outcome and wake the waiting producer
    pub fn resolve(mut self, result: ChannelResult<T>) {
        if let Some(slot) = self.slot.take() {
            slot.fill(result);
        }
    }

    /// Check if the producer still holds its handle
    ///
    /// `false` once the producer gave up (timeout, interrupt).
    pub fn is_awaited(&self) -> bool {
        self.slot
            .as_ref()
            .map(|slot| Arc::strong_count(slot) > 1)
            .unwrap_or(false)
    }
}

impl<T> Drop for Responder<T> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.fill(Err(ChannelError::Unavailable));
        }
    }
}

/// Reading side, owned by the producer
pub struct ResponseHandle<T> {
    slot: Arc<Slot<T>>,
}

impl<T> ResponseHandle<T> {
    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.slot.resolved.load(Ordering::Acquire)
    }

    /// Take the outcome if resolved, otherwise hand the handle back
    pub fn try_take(self) -> Result<ChannelResult<T>, Self> {
        if self.is_resolved() {
            Ok(self.slot.take())
        } else {
            Err(self)
        }
    }

    /// Block until resolved
    pub fn wait(self) -> ChannelResult<T> {
        let parking = &self.slot.parking;
        loop {
            let seen = parking.generation();
            if self.is_resolved() {
                return self.slot.take();
            }
            parking.park(seen, None);
        }
    }

    /// Block until resolved or `timeout` elapses
    pub fn wait_timeout(self, timeout: Duration) -> ChannelResult<T> {
        self.wait_cancellable(&CancellationToken::never(), crate::deadline_after(timeout))
    }

    /// Block until resolved, `deadline` passes, or `token` fires
    pub fn wait_cancellable(
        self,
        token: &CancellationToken,
        deadline: Option<Instant>,
    ) -> ChannelResult<T> {
        let parking = &self.slot.parking;
        loop {
            let seen = parking.generation();
            if self.is_resolved() {
                return self.slot.take();
            }
            token.check()?;

            let slice = match deadline {
                None => DEFAULT_PARK_INTERVAL,
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(ChannelError::Timeout);
                    }
                    (deadline - now).min(DEFAULT_PARK_INTERVAL)
                }
            };
            parking.park(seen, Some(slice));
        }
    }
}

impl<T> std::fmt::Debug for ResponseHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseHandle")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use std::thread;

    #[test]
    fn test_resolve_then_wait() {
        let (tx, rx) = pair();
        tx.resolve(Ok(5));
        assert!(rx.is_resolved());
        assert_eq!(rx.wait().unwrap(), 5);
    }

    #[test]
    fn test_cross_thread_delivery() {
        let (tx, rx) = pair::<String>();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            tx.resolve(Ok("done".to_string()));
        });

        assert_eq!(rx.wait().unwrap(), "done");
        handle.join().unwrap();
    }

    #[test]
    fn test_error_delivery() {
        let (tx, rx) = pair::<()>();
        tx.resolve(Err(HandlerError::msg("boom").into()));

        let err = rx.wait().unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_dropped_responder_unblocks() {
        let (tx, rx) = pair::<u32>();
        drop(tx);
        assert!(rx.wait().unwrap_err().is_unavailable());
    }

    #[test]
    fn test_try_take_pending_returns_handle() {
        let (tx, rx) = pair();
        let rx = rx.try_take().unwrap_err();
        assert!(!rx.is_resolved());

        tx.resolve(Ok('x'));
        assert_eq!(rx.try_take().unwrap().unwrap(), 'x');
    }

    #[test]
    fn test_wait_timeout() {
        let (tx, rx) = pair::<u8>();
        let start = Instant::now();
        assert!(rx.wait_timeout(Duration::from_millis(30)).unwrap_err().is_timeout());
        assert!(start.elapsed() >= Duration::from_millis(25));
        assert!(!tx.is_awaited());
    }

    #[test]
    fn test_wait_timeout_max_duration() {
        let (tx, rx) = pair::<u8>();
        let handle = thread::spawn(move || rx.wait_timeout(Duration::MAX));
        thread::sleep(Duration::from_millis(20));
        tx.resolve(Ok(3));
        assert_eq!(handle.join().unwrap().unwrap(), 3);
    }

    #[test]
    fn test_wait_interrupted() {
        let (_tx, rx) = pair::<u8>();
        let token = CancellationToken::new();
        let token2 = token.clone();

        let handle = thread::spawn(move || rx.wait_cancellable(&token2, None));
        thread::sleep(Duration::from_millis(20));
        token.cancel();

        assert!(matches!(handle.join().unwrap(), Err(ChannelError::Interrupted)));
    }
}
