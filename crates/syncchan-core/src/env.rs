//! Environment variable helpers
//!
//! ```ignore
//! use syncchan_core::env::{env_get, env_get_opt};
//!
//! let capacity: usize = env_get("SYNCCHAN_CAPACITY", 200);
//! let prefix: Option<String> = env_get_opt("SYNCCHAN_THREAD_PREFIX");
//! ```

use std::str::FromStr;

/// Variable `key` parsed as `T`, or `default` if unset or unparsable
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Variable `key` as a boolean
///
/// "1", "true", "yes" and "on" (any case) are true, any other set value is
/// false. Unset returns `default`.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

/// `Some(T)` if `key` is set and parses
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
