//! Library defaults, overridable at runtime through `ChannelConfig::from_env`

use syncchan_core::constants;

/// Queue capacity per channel
pub const CAPACITY: usize = constants::DEFAULT_CAPACITY;

/// Longest a blocked producer sleeps before re-checking deadline and token
pub const PARK_INTERVAL_MS: u64 = 10;

/// Default per-request timeout; 0 means wait forever
pub const REQUEST_TIMEOUT_MS: u64 = 0;

/// Worker thread names are `<prefix>-<channel name>`
pub const THREAD_PREFIX: &str = "syncchan";

/// Worker stack size in bytes; 0 means the platform default
pub const STACK_SIZE: usize = 0;

/// Smallest explicit worker stack accepted by `validate()`
pub const MIN_STACK_SIZE: usize = 64 * 1024;
