//! # syncchan-core
//!
//! Platform-agnostic building blocks for syncchan request channels.
//!
//! Nothing in here knows about endpoints, handlers or registries; those
//! live in the `syncchan` crate. This crate only provides the pieces a
//! single-consumer request channel is assembled from.
//!
//! ## Modules
//!
//! - `id` - Channel identifier type
//! - `state` - Channel lifecycle state
//! - `queue` - Bounded blocking FIFO queue (backpressure)
//! - `response` - One-shot response handle
//! - `parking` - Generation-based thread parking (futex / condvar)
//! - `cancel` - Cancellation token for interrupting blocked callers
//! - `error` - Error types
//! - `spinlock` - Spinlock for short critical sections
//! - `env` - Environment variable helpers
//! - `kprint` - Leveled stderr logging macros

pub mod id;
pub mod state;
pub mod queue;
pub mod response;
pub mod parking;
pub mod cancel;
pub mod error;
pub mod spinlock;
pub mod env;
pub mod kprint;

// Re-exports for convenience
pub use id::ChannelId;
pub use state::{AtomicChannelState, ChannelState};
pub use queue::{bounded, bounded_with, Receiver, Sender};
pub use response::{pair as response_pair, Responder, ResponseHandle};
pub use parking::{new_parking, Parking, PlatformParking};
pub use cancel::CancellationToken;
pub use error::{BoxError, ChannelError, ChannelResult, HandlerError, RecvError, SendError};
pub use spinlock::SpinLock;
pub use kprint::LogLevel;

use std::time::{Duration, Instant};

/// Deadline `timeout` from now; `None` (wait forever) if not representable
#[inline]
pub fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

/// Shared defaults
pub mod constants {
    use std::time::Duration;

    /// Default queue capacity of a channel
    pub const DEFAULT_CAPACITY: usize = 200;

    /// Longest a blocked caller sleeps before re-checking its deadline
    /// and cancellation token
    pub const DEFAULT_PARK_INTERVAL: Duration = Duration::from_millis(10);
}
