//! Leveled stderr logging for syncchan
//!
//! Each line is written under the stderr lock, so lines from concurrent
//! workers and producers never interleave.
//!
//! # Environment Variables
//!
//! - `SYNCCHAN_LOG_LEVEL=<level>` - off/error/warn/info/debug/trace or 0-5 (default: warn)
//! - `SYNCCHAN_FLUSH_LOG=1` - Flush stderr after each line
//! - `SYNCCHAN_LOG_TIME=1` - Prefix lines with seconds since first log
//!
//! # Usage
//!
//! ```ignore
//! use syncchan_core::{cinfo, cwarn};
//!
//! cinfo!("channel {} started", name);
//! cwarn!("channel {} stopping", name);
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => LogLevel::Off,
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    /// Parse a level name or digit; `None` if unrecognised
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "1" => Some(LogLevel::Error),
            "warn" | "warning" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LogLevel::Off => "",
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN ",
            LogLevel::Info => "INFO ",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }
}

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Warn as u8);
static FLUSH_ENABLED: AtomicBool = AtomicBool::new(false);
static TIME_ENABLED: AtomicBool = AtomicBool::new(false);
static INITIALIZED: AtomicBool = AtomicBool::new(false);
static EPOCH: OnceLock<Instant> = OnceLock::new();

fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

/// Read configuration from the environment
///
/// Runs once; later calls are no-ops. Called lazily by the first log line.
pub fn init() {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }
    EPOCH.get_or_init(Instant::now);

    if let Some(level) = std::env::var("SYNCCHAN_LOG_LEVEL")
        .ok()
        .and_then(|v| LogLevel::parse(&v))
    {
        LOG_LEVEL.store(level as u8, Ordering::Relaxed);
    }
    if let Some(flush) = env_flag("SYNCCHAN_FLUSH_LOG") {
        FLUSH_ENABLED.store(flush, Ordering::Relaxed);
    }
    if let Some(time) = env_flag("SYNCCHAN_LOG_TIME") {
        TIME_ENABLED.store(time, Ordering::Relaxed);
    }
}

#[inline]
fn ensure_init() {
    if !INITIALIZED.load(Ordering::Relaxed) {
        init();
    }
}

#[inline]
pub fn log_level() -> LogLevel {
    ensure_init();
    LogLevel::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

/// Set log level programmatically; overrides the environment
pub fn set_log_level(level: LogLevel) {
    ensure_init();
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn set_flush_enabled(enabled: bool) {
    ensure_init();
    FLUSH_ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn set_time_enabled(enabled: bool) {
    ensure_init();
    TIME_ENABLED.store(enabled, Ordering::Relaxed);
}

#[inline]
pub fn level_enabled(level: LogLevel) -> bool {
    level != LogLevel::Off && level <= log_level()
}

fn format_line(level: LogLevel, target: &str, elapsed: Option<f64>, args: std::fmt::Arguments<'_>) -> String {
    match elapsed {
        Some(secs) => format!("[{}] {:>10.6} {}: {}\n", level.label(), secs, target, args),
        None => format!("[{}] {}: {}\n", level.label(), target, args),
    }
}

#[doc(hidden)]
pub fn _log_impl(level: LogLevel, target: &str, args: std::fmt::Arguments<'_>) {
    if !level_enabled(level) {
        return;
    }
    let elapsed = if TIME_ENABLED.load(Ordering::Relaxed) {
        EPOCH.get().map(|epoch| epoch.elapsed().as_secs_f64())
    } else {
        None
    };
    let line = format_line(level, target, elapsed, args);

    let stderr = std::io::stderr();
    let mut handle = stderr.lock();
    let _ = handle.write_all(line.as_bytes());
    if FLUSH_ENABLED.load(Ordering::Relaxed) {
        let _ = handle.flush();
    }
}

// ============================================================================
// Public Macros
// ============================================================================

#[macro_export]
macro_rules! cerror {
    ($($arg:tt)*) => {{
        $crate::kprint::_log_impl(
            $crate::kprint::LogLevel::Error,
            module_path!(),
            format_args!($($arg)*)
        );
    }};
}

#[macro_export]
macro_rules! cwarn {
    ($($arg:tt)*) => {{
        $crate::kprint::_log_impl(
            $crate::kprint::LogLevel::Warn,
            module_path!(),
            format_args!($($arg)*)
        );
    }};
}

#[macro_export]
macro_rules! cinfo {
    ($($arg:tt)*) => {{
        $crate::kprint::_log_impl(
            $crate::kprint::LogLevel::Info,
            module_path!(),
            format_args!($($arg)*)
        );
    }};
}

#[macro_export]
macro_rules! cdebug {
    ($($arg:tt)*) => {{
        $crate::kprint::_log_impl(
            $crate::kprint::LogLevel::Debug,
            module_path!(),
            format_args!($($arg)*)
        );
    }};
}

/// Trace level (per-request chatter)
#[macro_export]
macro_rules! ctrace {
    ($($arg:tt)*) => {{
        $crate::kprint::_log_impl(
            $crate::kprint::LogLevel::Trace,
            module_path!(),
            format_args!($($arg)*)
        );
    }};
}
