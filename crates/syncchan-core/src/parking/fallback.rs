//! Fallback parking using std::sync::Condvar
//!
//! Used on platforms without futex support.

use super::Parking;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Condvar-based parking
pub struct FallbackParking {
    /// Wake generation, guarded for the condvar
    generation: Mutex<u32>,

    condvar: Condvar,

    parked: AtomicUsize,
}

impl FallbackParking {
    pub fn new() -> Self {
        Self {
            generation: Mutex::new(0),
            condvar: Condvar::new(),
            parked: AtomicUsize::new(0),
        }
    }

    // The guarded value is a plain counter, so a poisoned lock is still usable
    fn lock(&self) -> MutexGuard<'_, u32> {
        self.generation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        let mut generation = self.lock();
        *generation = generation.wrapping_add(1);
    }
}

impl Default for FallbackParking {
    fn default() -> Self {
        Self::new()
    }
}

impl Parking for FallbackParking {
    fn generation(&self) -> u32 {
        *self.lock()
    }

    fn park(&self, seen: u32, timeout: Option<Duration>) -> bool {
        self.parked.fetch_add(1, Ordering::SeqCst);

        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let mut guard = self.lock();
        while *guard == seen {
            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    let (g, _) = self
                        .condvar
                        .wait_timeout(guard, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner);
                    guard = g;
                }
                None => {
                    guard = self.condvar.wait(guard).unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
        let woken = *guard != seen;
        drop(guard);

        self.parked.fetch_sub(1, Ordering::SeqCst);
        woken
    }

    fn wake_one(&self) {
        self.bump();
        self.condvar.notify_one();
    }

    fn wake_all(&self) {
        self.bump();
        self.condvar.notify_all();
    }

    fn parked_count(&self) -> usize {
        self.parked.load(Ordering::Relaxed)
    }
}
