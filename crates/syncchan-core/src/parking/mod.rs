//! Thread parking
//!
//! Blocking in the queue and the response handle is built on a parking
//! object carrying a wake generation:
//!
//! 1. Snapshot `generation()`
//! 2. Re-check the condition (queue has space, response resolved, ...)
//! 3. `park(seen, timeout)` - returns at once if the generation moved
//!
//! Wakers change the condition first, then call `wake_one()` /
//! `wake_all()`, which bump the generation. A wake that lands between
//! steps 1 and 3 is therefore never lost.

use std::time::Duration;

pub trait Parking: Send + Sync {
    /// Current wake generation
    fn generation(&self) -> u32;

    /// Park the current thread while the generation still equals `seen`
    ///
    /// Returns `true` if the generation moved (woken), `false` on timeout.
    /// Callers re-check their condition after returning either way.
    fn park(&self, seen: u32, timeout: Option<Duration>) -> bool;

    /// Bump the generation and wake one parked thread
    fn wake_one(&self);

    /// Bump the generation and wake every parked thread
    fn wake_all(&self);

    /// Number of currently parked threads (hint, may be stale)
    fn parked_count(&self) -> usize;
}

// Condvar parking is portable and always built; Linux prefers the futex
pub mod fallback;

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod futex_linux;
        pub use futex_linux::FutexParking as PlatformParking;
    } else {
        pub use fallback::FallbackParking as PlatformParking;
    }
}

/// Create a new platform-appropriate parking instance
pub fn new_parking() -> Box<dyn Parking> {
    Box::new(PlatformParking::new())
}

#[cfg(test)]
mod tests {
    use super::fallback::FallbackParking;
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    fn check_timeout(parking: &dyn Parking) {
        let seen = parking.generation();
        let start = Instant::now();
        let woken = parking.park(seen, Some(Duration::from_millis(50)));
        let elapsed = start.elapsed();

        assert!(!woken);
        assert!(elapsed >= Duration::from_millis(40)); // Allow some slack
    }

    fn check_stale_generation(parking: &dyn Parking) {
        let seen = parking.generation();
        parking.wake_one();

        // Wake happened after the snapshot: must not sleep
        let start = Instant::now();
        assert!(parking.park(seen, Some(Duration::from_secs(5))));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    fn check_wake_one<P: Parking + 'static>(parking: Arc<P>) {
        let parking2 = Arc::clone(&parking);
        let seen = parking.generation();

        let handle = thread::spawn(move || parking2.park(seen, Some(Duration::from_secs(10))));

        // Give thread time to park
        thread::sleep(Duration::from_millis(50));
        parking.wake_one();

        assert!(handle.join().unwrap());
        assert_eq!(parking.parked_count(), 0);
    }

    #[test]
    fn test_platform_parking() {
        let parking = PlatformParking::new();
        check_timeout(&parking);
        check_stale_generation(&parking);
        check_wake_one(Arc::new(PlatformParking::new()));
    }

    #[test]
    fn test_fallback_parking() {
        let parking = FallbackParking::new();
        check_timeout(&parking);
        check_stale_generation(&parking);
        check_wake_one(Arc::new(FallbackParking::new()));
    }

    #[test]
    fn test_wake_all_releases_everyone() {
        let parking = Arc::new(PlatformParking::new());
        let seen = parking.generation();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let p = Arc::clone(&parking);
                thread::spawn(move || p.park(seen, Some(Duration::from_secs(10))))
            })
            .collect();

        thread::sleep(Duration::from_millis(50));
        parking.wake_all();

        for h in handles {
            assert!(h.join().unwrap());
        }
    }

    #[test]
    fn test_max_timeout_parks_until_woken() {
        for parking in [
            Arc::new(FallbackParking::new()) as Arc<dyn Parking>,
            Arc::new(PlatformParking::new()) as Arc<dyn Parking>,
        ] {
            let seen = parking.generation();
            let p = Arc::clone(&parking);
            let handle = thread::spawn(move || p.park(seen, Some(Duration::MAX)));

            thread::sleep(Duration::from_millis(30));
            parking.wake_all();
            assert!(handle.join().unwrap());
        }
    }

    #[test]
    fn test_boxed_parking() {
        let parking = new_parking();
        check_stale_generation(&*parking);
    }
}
