//! Bounded blocking FIFO queue
//!
//! Many producers, one consumer. Storage is a lock-free `ArrayQueue`;
//! blocking is layered on top with two parking objects, one for "space
//! freed" and one for "item pushed". A full queue blocks senders, which is
//! the only flow control between producers and the consumer.
//!
//! Closing is race-free: `close()` returns only once no sender is
//! mid-push, so after `close()` + `drain()` nothing can appear in the
//! queue any more.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_queue::ArrayQueue;

use crate::cancel::CancellationToken;
use crate::constants::DEFAULT_PARK_INTERVAL;
use crate::error::{RecvError, SendError};
use crate::parking::{Parking, PlatformParking};

/// Create a bounded queue with the default park interval
///
/// A capacity of zero is raised to one.
pub fn bounded<T>(capacity: usize) -> (Sender<T>, Receiver<T>) {
    bounded_with(capacity, DEFAULT_PARK_INTERVAL)
}

/// Create a bounded queue
///
/// `park_interval` caps how long a blocked sender or receiver sleeps
/// before re-checking its deadline and cancellation token.
pub fn bounded_with<T>(capacity: usize, park_interval: Duration) -> (Sender<T>, Receiver<T>) {
    let shared = Arc::new(Shared {
        items: ArrayQueue::new(capacity.max(1)),
        not_full: PlatformParking::new(),
        not_empty: PlatformParking::new(),
        closed: AtomicBool::new(false),
        pushing: AtomicUsize::new(0),
        park_interval,
    });

    (
        Sender { shared: Arc::clone(&shared) },
        Receiver { shared },
    )
}

/// Sending half; clone freely
pub struct Sender<T> {
    shared: Arc<Shared<T>>,
}

/// Receiving half; there is exactly one
pub struct Receiver<T> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    /// FIFO storage
    items: ArrayQueue<T>,

    /// Senders waiting for space
    not_full: PlatformParking,

    /// Receiver waiting for an item
    not_empty: PlatformParking,

    closed: AtomicBool,

    /// Senders currently between the closed check and the push
    pushing: AtomicUsize,

    park_interval: Duration,
}

impl<T> Shared<T> {
    fn try_push(&self, value: T) -> Result<(), SendError<T>> {
        self.pushing.fetch_add(1, Ordering::SeqCst);
        let result = if self.closed.load(Ordering::SeqCst) {
            Err(SendError::Closed(value))
        } else {
            self.items.push(value).map_err(SendError::Full)
        };
        self.pushing.fetch_sub(1, Ordering::SeqCst);

        if result.is_ok() {
            self.not_empty.wake_one();
        }
        result
    }

    fn try_pop(&self) -> Option<T> {
        let value = self.items.pop();
        if value.is_some() {
            self.not_full.wake_one();
        }
        value
    }

    /// How long the next park may last, or `None` once the deadline passed
    fn park_slice(&self, deadline: Option<Instant>) -> Option<Duration> {
        match deadline {
            None => Some(self.park_interval),
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    None
                } else {
                    Some((deadline - now).min(self.park_interval))
                }
            }
        }
    }

    /// Wait out senders that passed the closed check before it was set
    fn settle(&self) {
        while self.pushing.load(Ordering::SeqCst) != 0 {
            std::thread::yield_now();
        }
    }

    fn close(&self) -> bool {
        let first = !self.closed.swap(true, Ordering::SeqCst);
        self.settle();

        self.not_full.wake_all();
        self.not_empty.wake_all();
        first
    }
}

impl<T> Sender<T> {
    /// Send, blocking while the queue is full
    ///
    /// Fails only if the queue is closed.
    pub fn send(&self, value: T) -> Result<(), SendError<T>> {
        self.send_deadline(value, None, &CancellationToken::never())
    }

    /// Send, blocking while full until `deadline` passes or `token` fires
    pub fn send_deadline(
        &self,
        value: T,
        deadline: Option<Instant>,
        token: &CancellationToken,
    ) -> Result<(), SendError<T>> {
        let shared = &*self.shared;
        let mut value = value;

        loop {
            let seen = shared.not_full.generation();
            match shared.try_push(value) {
                Ok(()) => return Ok(()),
                Err(SendError::Full(v)) => value = v,
                Err(e) => return Err(e),
            }

            // Giving up may have swallowed a wake meant for a slot; pass it on
            if token.is_cancelled() {
                shared.not_full.wake_one();
                return Err(SendError::Cancelled(value));
            }
            let slice = match shared.park_slice(deadline) {
                Some(slice) => slice,
                None => {
                    shared.not_full.wake_one();
                    return Err(SendError::Timeout(value));
                }
            };

            shared.not_full.park(seen, Some(slice));
        }
    }

    /// Send without blocking
    pub fn try_send(&self, value: T) -> Result<(), SendError<T>> {
        self.shared.try_push(value)
    }

    /// Close the queue; see `Receiver::close`
    pub fn close(&self) -> bool {
        self.shared.close()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.shared.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.shared.items.capacity()
    }
}

impl<T> Receiver<T> {
    /// Receive, blocking while the queue is empty
    ///
    /// Returns `Err(Closed)` once the queue is closed and drained.
    pub fn recv(&self) -> Result<T, RecvError> {
        self.recv_deadline(None)
    }

    /// Receive, giving up with `Err(Timeout)` after `timeout`
    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvError> {
        self.recv_deadline(crate::deadline_after(timeout))
    }

    pub fn recv_deadline(&self, deadline: Option<Instant>) -> Result<T, RecvError> {
        let shared = &*self.shared;

        loop {
            let seen = shared.not_empty.generation();
            if let Some(value) = shared.try_pop() {
                return Ok(value);
            }
            if shared.closed.load(Ordering::SeqCst) {
                shared.settle();
                return shared.try_pop().ok_or(RecvError::Closed);
            }

            match shared.park_slice(deadline) {
                Some(slice) => {
                    shared.not_empty.park(seen, Some(slice));
                }
                None => return Err(RecvError::Timeout),
            }
        }
    }

    /// Receive without blocking
    pub fn try_recv(&self) -> Result<T, RecvError> {
        match self.shared.try_pop() {
            Some(value) => Ok(value),
            None if self.shared.closed.load(Ordering::SeqCst) => Err(RecvError::Closed),
            None => Err(RecvError::Empty),
        }
    }

    /// Reject all further sends
    ///
    /// Returns after any sender that already passed the closed check has
    /// finished its push. Blocked senders wake up and fail with `Closed`.
    /// Items already queued stay receivable. Returns `true` for the call
    /// that actually closed the queue.
    pub fn close(&self) -> bool {
        self.shared.close()
    }

    /// Pop everything currently queued, in order
    pub fn drain(&self) -> impl Iterator<Item = T> + '_ {
        std::iter::from_fn(move || self.shared.try_pop())
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.shared.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.shared.items.capacity()
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Sender { shared: Arc::clone(&self.shared) }
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        // Nobody will consume any more; unblock senders and drop leftovers
        self.shared.close();
        while self.shared.items.pop().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let (tx, rx) = bounded(10);

        for i in 0..10 {
            tx.try_send(i).unwrap();
        }
        for i in 0..10 {
            assert_eq!(rx.recv().unwrap(), i);
        }
    }

    #[test]
    fn test_try_send_full() {
        let (tx, rx) = bounded(2);

        tx.try_send(1).unwrap();
        tx.try_send(2).unwrap();
        assert!(tx.try_send(3).unwrap_err().is_full());

        rx.try_recv().unwrap();
        tx.try_send(3).unwrap();
        assert_eq!(tx.len(), 2);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let (tx, _rx) = bounded::<u8>(0);
        assert_eq!(tx.capacity(), 1);
    }

    #[test]
    fn test_blocked_sender_resumes_after_recv() {
        let (tx, rx) = bounded(1);
        tx.send(1).unwrap();

        let done = Arc::new(AtomicBool::new(false));
        let done2 = Arc::clone(&done);
        let tx2 = tx.clone();
        let handle = thread::spawn(move || {
            tx2.send(2).unwrap();
            done2.store(true, Ordering::SeqCst);
        });

        thread::sleep(Duration::from_millis(100));
        assert!(!done.load(Ordering::SeqCst), "send must block while full");

        assert_eq!(rx.recv().unwrap(), 1);
        handle.join().unwrap();
        assert!(done.load(Ordering::SeqCst));
        assert_eq!(rx.recv().unwrap(), 2);
    }

    #[test]
    fn test_send_timeout_returns_value() {
        let (tx, _rx) = bounded(1);
        tx.send("a").unwrap();

        let start = Instant::now();
        let deadline = Some(start + Duration::from_millis(50));
        let err = tx
            .send_deadline("b", deadline, &CancellationToken::never())
            .unwrap_err();

        assert!(matches!(err, SendError::Timeout("b")));
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn test_send_cancelled_while_blocked() {
        let (tx, _rx) = bounded(1);
        tx.send(0).unwrap();

        let token = CancellationToken::new();
        let token2 = token.clone();
        let handle = thread::spawn(move || tx.send_deadline(1, None, &token2));

        thread::sleep(Duration::from_millis(30));
        token.cancel();

        assert!(matches!(handle.join().unwrap(), Err(SendError::Cancelled(1))));
    }

    #[test]
    fn test_recv_timeout_on_empty() {
        let (_tx, rx) = bounded::<i32>(4);
        assert_eq!(rx.try_recv(), Err(RecvError::Empty));
        assert_eq!(rx.recv_timeout(Duration::from_millis(20)), Err(RecvError::Timeout));
    }

    #[test]
    fn test_recv_timeout_max_duration() {
        let (tx, rx) = bounded(1);
        tx.send(5).unwrap();
        assert_eq!(rx.recv_timeout(Duration::MAX), Ok(5));
    }

    #[test]
    fn test_close_rejects_and_keeps_queued() {
        let (tx, rx) = bounded(4);
        tx.send(1).unwrap();
        tx.send(2).unwrap();

        assert!(rx.close());
        assert!(!rx.close());
        assert!(tx.send(3).unwrap_err().is_closed());

        assert_eq!(rx.recv().unwrap(), 1);
        assert_eq!(rx.drain().collect::<Vec<_>>(), vec![2]);
        assert_eq!(rx.recv(), Err(RecvError::Closed));
    }

    #[test]
    fn test_close_wakes_blocked_sender() {
        let (tx, rx) = bounded(1);
        tx.send(0).unwrap();

        let tx2 = tx.clone();
        let handle = thread::spawn(move || tx2.send(1));

        thread::sleep(Duration::from_millis(30));
        rx.close();

        assert!(matches!(handle.join().unwrap(), Err(SendError::Closed(1))));
    }

    #[test]
    fn test_receiver_drop_closes() {
        let (tx, rx) = bounded(4);
        tx.send(1).unwrap();
        drop(rx);

        assert!(tx.is_closed());
        assert!(tx.is_empty());
        assert!(tx.send(2).unwrap_err().is_closed());
    }

    #[test]
    fn test_many_producers_nothing_lost() {
        let (tx, rx) = bounded(8);
        let producers: Vec<_> = (0..4)
            .map(|p: usize| {
                let tx = tx.clone();
                thread::spawn(move || {
                    for i in 0..250i32 {
                        tx.send((p, i)).unwrap();
                    }
                })
            })
            .collect();

        let mut last = [None::<i32>; 4];
        for _ in 0..1000 {
            let (p, i) = rx.recv().unwrap();
            // Per-producer order survives interleaving
            if let Some(prev) = last[p] {
                assert!(i > prev);
            }
            last[p] = Some(i);
        }

        for h in producers {
            h.join().unwrap();
        }
        assert!(rx.is_empty());
    }
}
