//! Request handler contract
//!
//! A handler is the business logic behind a channel. The channel calls it
//! from exactly one worker thread, one request at a time, in queue order;
//! that is why `handle` takes `&mut self` and handler state needs no
//! locking.
//!
//! # Implementors
//!
//! - Any type implementing `RequestHandler` directly
//! - `FnHandler`: a closure, via `handler_fn`
//! - `EndpointRouter`: owned state plus a per-endpoint dispatch table
//!
//! A handler must not block indefinitely: a stalled call stalls every
//! producer on the channel.

use std::collections::HashMap;
use std::fmt;

use crate::value::Value;
use syncchan_core::HandlerError;

pub trait RequestHandler: Send + 'static {
    /// Process one request
    ///
    /// An `Err` is delivered to the caller that submitted this request and
    /// to nobody else. The channel keeps running either way.
    fn handle(&mut self, endpoint: &str, args: &[Value]) -> Result<Value, HandlerError>;

    /// Called once by the worker after the channel stopped
    fn on_stop(&mut self) {}
}

impl RequestHandler for Box<dyn RequestHandler> {
    fn handle(&mut self, endpoint: &str, args: &[Value]) -> Result<Value, HandlerError> {
        (**self).handle(endpoint, args)
    }

    fn on_stop(&mut self) {
        (**self).on_stop()
    }
}

/// Handler backed by a closure
pub struct FnHandler<F> {
    f: F,
}

/// Turn a closure into a `RequestHandler`
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: FnMut(&str, &[Value]) -> Result<Value, HandlerError> + Send + 'static,
{
    FnHandler { f }
}

impl<F> RequestHandler for FnHandler<F>
where
    F: FnMut(&str, &[Value]) -> Result<Value, HandlerError> + Send + 'static,
{
    #[inline]
    fn handle(&mut self, endpoint: &str, args: &[Value]) -> Result<Value, HandlerError> {
        (self.f)(endpoint, args)
    }
}

/// Argument at `index`, or a handler error naming the missing position
pub fn arg(args: &[Value], index: usize) -> Result<&Value, HandlerError> {
    args.get(index)
        .ok_or_else(|| HandlerError::msg(format!("missing argument {}", index)))
}

/// Raised by `EndpointRouter` for endpoints it has no route for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEndpoint(pub String);

impl fmt::Display for UnknownEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown endpoint: {}", self.0)
    }
}

impl std::error::Error for UnknownEndpoint {}

type Route<S> = Box<dyn FnMut(&mut S, &[Value]) -> Result<Value, HandlerError> + Send>;

/// Handler owning state `S` and dispatching by endpoint name
///
/// ```ignore
/// let router = EndpointRouter::new(0i64)
///     .route("inc", |total, args| {
///         *total += arg(args, 0)?.as_i64().unwrap_or(1);
///         Ok(Value::Int(*total))
///     })
///     .route("get", |total, _| Ok(Value::Int(*total)));
/// ```
pub struct EndpointRouter<S> {
    state: S,
    routes: HashMap<String, Route<S>>,
    stop_hook: Option<Box<dyn FnMut(&mut S) + Send>>,
}

impl<S: Send + 'static> EndpointRouter<S> {
    pub fn new(state: S) -> Self {
        Self {
            state,
            routes: HashMap::new(),
            stop_hook: None,
        }
    }

    /// Register `f` for `endpoint`, replacing any earlier route
    pub fn route<F>(mut self, endpoint: impl Into<String>, f: F) -> Self
    where
        F: FnMut(&mut S, &[Value]) -> Result<Value, HandlerError> + Send + 'static,
    {
        self.routes.insert(endpoint.into(), Box::new(f));
        self
    }

    /// Run `f` against the state when the channel stops
    pub fn with_stop_hook<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut S) + Send + 'static,
    {
        self.stop_hook = Some(Box::new(f));
        self
    }

    /// Registered endpoint names, sorted
    pub fn endpoints(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn state(&self) -> &S {
        &self.state
    }
}

impl<S: Send + 'static> RequestHandler for EndpointRouter<S> {
    fn handle(&mut self, endpoint: &str, args: &[Value]) -> Result<Value, HandlerError> {
        match self.routes.get_mut(endpoint) {
            Some(route) => route(&mut self.state, args),
            None => Err(HandlerError::new(UnknownEndpoint(endpoint.to_string()))),
        }
    }

    fn on_stop(&mut self) {
        if let Some(f) = self.stop_hook.as_mut() {
            f(&mut self.state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> EndpointRouter<i64> {
        EndpointRouter::new(0)
            .route("inc", |total, args| {
                *total += arg(args, 0)?.as_i64().unwrap_or(1);
                Ok(Value::Int(*total))
            })
            .route("get", |total, _| Ok(Value::Int(*total)))
    }

    #[test]
    fn test_router_dispatch() {
        let mut router = counter();
        router.handle("inc", &[Value::Int(2)]).unwrap();
        router.handle("inc", &[Value::Int(3)]).unwrap();

        assert_eq!(router.handle("get", &[]).unwrap(), Value::Int(5));
        assert_eq!(*router.state(), 5);
        assert_eq!(router.endpoints(), vec!["get", "inc"]);
    }

    #[test]
    fn test_router_unknown_endpoint() {
        let mut router = counter();
        let err = router.handle("reset", &[]).unwrap_err();

        assert_eq!(err.to_string(), "unknown endpoint: reset");
        assert_eq!(
            err.downcast_ref::<UnknownEndpoint>(),
            Some(&UnknownEndpoint("reset".into()))
        );
    }

    #[test]
    fn test_missing_argument() {
        let mut router = counter();
        let err = router.handle("inc", &[]).unwrap_err();
        assert_eq!(err.to_string(), "missing argument 0");
    }

    #[test]
    fn test_handler_fn() {
        let mut calls = 0;
        let mut h = handler_fn(move |endpoint, args| {
            calls += 1;
            Ok(Value::from(format!("{}:{}:{}", endpoint, args.len(), calls)))
        });

        assert_eq!(h.handle("a", &[]).unwrap().as_str(), Some("a:0:1"));
        assert_eq!(h.handle("b", &[Value::Null]).unwrap().as_str(), Some("b:1:2"));
    }

    #[test]
    fn test_on_stop_hook() {
        let mut router = counter().with_stop_hook(|total| *total = -1);
        router.on_stop();
        assert_eq!(*router.state(), -1);
    }
}
