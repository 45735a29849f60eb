//! Error types for syncchan channels

use core::fmt;
use std::any::Any;

/// Boxed error produced by a request handler
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for channel operations
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Errors a producer can observe from a channel
#[derive(Debug)]
pub enum ChannelError {
    /// The request handler failed while processing this request
    Handler(HandlerError),

    /// Channel is stopping, stopped, or its worker is gone
    Unavailable,

    /// Deadline passed while enqueueing or awaiting the response
    Timeout,

    /// Caller was interrupted (cancelled) while blocked
    Interrupted,

    /// Worker thread could not be spawned
    Spawn(String),

    /// Channel configuration was rejected
    InvalidConfig(&'static str),
}

impl ChannelError {
    /// The handler failure, if this is one
    pub fn handler_error(&self) -> Option<&HandlerError> {
        match self {
            ChannelError::Handler(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ChannelError::Unavailable)
    }

    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, ChannelError::Timeout)
    }
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Surface the handler's own message untouched
            ChannelError::Handler(e) => write!(f, "{}", e),
            ChannelError::Unavailable => write!(f, "channel unavailable"),
            ChannelError::Timeout => write!(f, "request timed out"),
            ChannelError::Interrupted => write!(f, "submission interrupted"),
            ChannelError::Spawn(msg) => write!(f, "failed to spawn channel worker: {}", msg),
            ChannelError::InvalidConfig(msg) => write!(f, "invalid channel config: {}", msg),
        }
    }
}

impl std::error::Error for ChannelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChannelError::Handler(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HandlerError> for ChannelError {
    fn from(e: HandlerError) -> Self {
        ChannelError::Handler(e)
    }
}

/// Failure raised by a request handler
///
/// Wraps whatever error type the handler produced. Delivered only to the
/// producer whose request failed.
pub struct HandlerError {
    inner: BoxError,
}

impl HandlerError {
    /// Wrap an arbitrary error
    pub fn new<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self { inner: error.into() }
    }

    /// Error carrying only a message
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(message.into())
    }

    /// Convert a caught panic payload
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let detail = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::msg(format!("handler panicked: {}", detail))
    }

    /// Message of the wrapped error
    pub fn message(&self) -> String {
        self.inner.to_string()
    }

    pub fn get_ref(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        &*self.inner
    }

    /// Downcast to the concrete error the handler raised
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.inner.downcast_ref::<E>()
    }

    pub fn into_inner(self) -> BoxError {
        self.inner
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HandlerError").field(&self.inner).finish()
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e)
    }
}

impl From<String> for HandlerError {
    fn from(s: String) -> Self {
        Self::msg(s)
    }
}

impl From<&str> for HandlerError {
    fn from(s: &str) -> Self {
        Self::msg(s)
    }
}

/// Error returned by queue sends; always hands the value back
pub enum SendError<T> {
    /// Queue at capacity (non-blocking send only)
    Full(T),

    /// Queue closed, nothing more is accepted
    Closed(T),

    /// Deadline passed while waiting for space
    Timeout(T),

    /// Cancellation token fired while waiting for space
    Cancelled(T),
}

impl<T> SendError<T> {
    /// Recover the value that could not be sent
    pub fn into_inner(self) -> T {
        match self {
            SendError::Full(v)
            | SendError::Closed(v)
            | SendError::Timeout(v)
            | SendError::Cancelled(v) => v,
        }
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        matches!(self, SendError::Full(_))
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self, SendError::Closed(_))
    }

    fn label(&self) -> &'static str {
        match self {
            SendError::Full(_) => "Full",
            SendError::Closed(_) => "Closed",
            SendError::Timeout(_) => "Timeout",
            SendError::Cancelled(_) => "Cancelled",
        }
    }
}

impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(..)", self.label())
    }
}

impl<T> fmt::Display for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Full(_) => write!(f, "queue full"),
            SendError::Closed(_) => write!(f, "queue closed"),
            SendError::Timeout(_) => write!(f, "send timed out"),
            SendError::Cancelled(_) => write!(f, "send cancelled"),
        }
    }
}

impl<T> std::error::Error for SendError<T> {}

/// Error returned by queue receives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvError {
    /// Nothing queued (non-blocking receive only)
    Empty,

    /// Queue closed and fully drained
    Closed,

    /// Deadline passed while waiting for a value
    Timeout,
}

impl fmt::Display for RecvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecvError::Empty => write!(f, "queue empty"),
            RecvError::Closed => write!(f, "queue closed"),
            RecvError::Timeout => write!(f, "receive timed out"),
        }
    }
}

impl std::error::Error for RecvError {}
