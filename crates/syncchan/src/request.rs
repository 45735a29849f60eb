//! Queue items
//!
//! A channel's queue carries `Envelope`s: either one request with its
//! responder, or the stop sentinel. The sentinel is a distinct variant, so
//! no endpoint name can be mistaken for it.

use std::fmt;

use syncchan_core::{response_pair, Responder, ResponseHandle};

use crate::value::Value;

/// One pending request and the responder its result goes to
pub(crate) struct Request {
    pub endpoint: String,
    pub args: Vec<Value>,
    pub responder: Responder<Value>,
}

impl Request {
    /// Build a request and the handle its caller waits on
    pub fn new(endpoint: impl Into<String>, args: Vec<Value>) -> (Self, ResponseHandle<Value>) {
        let (responder, handle) = response_pair();
        let request = Self {
            endpoint: endpoint.into(),
            args,
            responder,
        };
        (request, handle)
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("endpoint", &self.endpoint)
            .field("args", &self.args.len())
            .finish()
    }
}

#[derive(Debug)]
pub(crate) enum Envelope {
    Request(Request),
    /// Worker stops after dequeuing this
    Stop,
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncchan_core::ChannelError;

    #[test]
    fn test_request_resolves_handle() {
        let (req, handle) = Request::new("echo", vec![Value::Int(1)]);
        assert_eq!(req.endpoint, "echo");

        req.responder.resolve(Ok(Value::Int(2)));
        assert_eq!(handle.wait().unwrap(), Value::Int(2));
    }

    #[test]
    fn test_discarded_envelope_resolves_unavailable() {
        let (req, handle) = Request::new("echo", Vec::new());
        drop(Envelope::Request(req));
        assert!(matches!(handle.wait(), Err(ChannelError::Unavailable)));
    }
}
