//! Linux futex-based parking
//!
//! The futex word is the wake generation itself. FUTEX_WAIT only sleeps
//! while the word still holds the generation the caller observed, so the
//! kernel performs the "check and sleep" step atomically.

use super::Parking;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

pub struct FutexParking {
    /// Futex word: wake generation (wraps)
    futex: AtomicU32,

    /// Count of parked threads, lets wakers skip the syscall
    parked: AtomicUsize,
}

impl FutexParking {
    pub fn new() -> Self {
        Self {
            futex: AtomicU32::new(0),
            parked: AtomicUsize::new(0),
        }
    }

    fn futex_wake(&self, count: i32) {
        // Safety: the futex word lives as long as `self`
        unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.futex.as_ptr(),
                libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
                count,
                std::ptr::null::<libc::timespec>(),
                std::ptr::null::<u32>(),
                0u32,
            );
        }
    }

    fn bump_and_wake(&self, count: i32) {
        self.futex.fetch_add(1, Ordering::SeqCst);
        if self.parked.load(Ordering::SeqCst) != 0 {
            self.futex_wake(count);
        }
    }
}

impl Default for FutexParking {
    fn default() -> Self {
        Self::new()
    }
}

impl Parking for FutexParking {
    #[inline]
    fn generation(&self) -> u32 {
        self.futex.load(Ordering::SeqCst)
    }

    fn park(&self, seen: u32, timeout: Option<Duration>) -> bool {
        self.parked.fetch_add(1, Ordering::SeqCst);

        if self.futex.load(Ordering::SeqCst) != seen {
            self.parked.fetch_sub(1, Ordering::SeqCst);
            return true;
        }

        let timespec = timeout.map(|d| libc::timespec {
            tv_sec: d.as_secs().min(libc::time_t::MAX as u64) as libc::time_t,
            tv_nsec: d.subsec_nanos() as libc::c_long,
        });
        let timespec_ptr = match &timespec {
            Some(ts) => ts as *const libc::timespec,
            None => std::ptr::null(),
        };

        // FUTEX_WAIT: sleep only while futex == seen. ETIMEDOUT, EAGAIN and
        // EINTR all fall through to the generation check below.
        unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.futex.as_ptr(),
                libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
                seen,
                timespec_ptr,
                std::ptr::null::<u32>(),
                0u32,
            );
        }

        self.parked.fetch_sub(1, Ordering::SeqCst);
        self.futex.load(Ordering::SeqCst) != seen
    }

    fn wake_one(&self) {
        self.bump_and_wake(1);
    }

    fn wake_all(&self) {
        self.bump_and_wake(i32::MAX);
    }

    fn parked_count(&self) -> usize {
        self.parked.load(Ordering::Relaxed)
    }
}
