//! # syncchan
//!
//! Synchronous request-serialization channels.
//!
//! A channel turns concurrent calls from many threads into ordered,
//! single-threaded execution of one handler. Producers call
//! `Channel::request` and block until their result comes back; a single
//! worker thread per channel dequeues requests in arrival order and runs
//! them through the handler, which therefore needs no locking of its own.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use syncchan::{args, arg, EndpointRouter, Registry, Value};
//!
//! let registry = Registry::new();
//! let counter = EndpointRouter::new(0i64)
//!     .route("inc", |total, args| {
//!         *total += arg(args, 0)?.as_i64().unwrap_or(1);
//!         Ok(Value::Int(*total))
//!     });
//!
//! let channel = registry.create("counter", counter)?;
//! let total = channel.request("inc", args![5])?;
//! channel.stop();
//! ```
//!
//! ## Guarantees
//!
//! - Per channel, the handler runs on one thread, one request at a time,
//!   in enqueue order
//! - Every accepted request resolves exactly once: with the handler's
//!   result, the handler's error, or `ChannelError::Unavailable`
//! - A full queue blocks producers; nothing is dropped
//! - A failing or panicking request affects only its own caller
//! - At most one live channel per name in a registry
//!
//! ## Logging
//!
//! Leveled stderr logging via `cerror!` .. `ctrace!`, configured with
//! `SYNCCHAN_LOG_LEVEL` (default `warn`).

pub mod value;
pub mod handler;
pub mod config;
mod request;
mod worker;
pub mod channel;
pub mod registry;

pub use value::Value;
pub use handler::{arg, handler_fn, EndpointRouter, FnHandler, RequestHandler, UnknownEndpoint};
pub use config::{ChannelConfig, ConfigError};
pub use worker::ChannelStats;
pub use channel::Channel;
pub use registry::Registry;

// Re-export core types users need
pub use syncchan_core::{
    CancellationToken, ChannelError, ChannelId, ChannelResult, ChannelState, HandlerError,
    LogLevel, ResponseHandle,
};
pub use syncchan_core::env::{env_get, env_get_bool};
pub use syncchan_core::kprint::{log_level, set_log_level};
pub use syncchan_core::{cdebug, cerror, cinfo, ctrace, cwarn};
