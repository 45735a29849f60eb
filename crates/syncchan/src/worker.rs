//! Channel worker thread
//!
//! Each channel owns exactly one worker. The worker dequeues envelopes in
//! FIFO order and runs the handler on each request, so a handler is never
//! entered by two threads at once.
//!
//! Shutdown, after dequeuing the stop sentinel (or seeing the queue closed):
//!
//! 1. Close the queue; producers still blocked on a full queue fail
//! 2. Resolve every envelope left behind with `Unavailable`
//! 3. Run the handler's `on_stop`
//! 4. Mark the lifecycle `Stopped` and wake joiners

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use syncchan_core::{
    cdebug, cinfo, ctrace, cwarn, AtomicChannelState, ChannelError, ChannelState, HandlerError,
    Parking, PlatformParking, Receiver,
};

use crate::config::ChannelConfig;
use crate::handler::RequestHandler;
use crate::request::{Envelope, Request};

/// Snapshot of a channel's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Requests the handler ran, successful or not
    pub processed: u64,
    /// Subset of `processed` whose handler returned an error or panicked
    pub failed: u64,
    /// Requests turned away with `Unavailable` without reaching the handler
    pub rejected: u64,
}

/// State shared by a channel's handles and its worker
pub(crate) struct Lifecycle {
    pub state: AtomicChannelState,
    processed: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
    exited: PlatformParking,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: AtomicChannelState::new(ChannelState::Created),
            processed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            exited: PlatformParking::new(),
        }
    }

    #[inline]
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }

    /// Block until the worker exited or `deadline` passes
    ///
    /// Returns `true` if the worker exited.
    pub fn wait_exited(&self, deadline: Option<Instant>) -> bool {
        loop {
            let seen = self.exited.generation();
            if self.state.load().is_terminated() {
                return true;
            }
            let timeout = match deadline {
                None => None,
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    Some(deadline - now)
                }
            };
            self.exited.park(seen, timeout);
        }
    }
}

pub(crate) struct Worker {
    name: String,
    rx: Receiver<Envelope>,
    handler: Box<dyn RequestHandler>,
    lifecycle: Arc<Lifecycle>,
}

impl Worker {
    pub fn new(
        name: &str,
        rx: Receiver<Envelope>,
        handler: Box<dyn RequestHandler>,
        lifecycle: Arc<Lifecycle>,
    ) -> Self {
        Self {
            name: name.to_string(),
            rx,
            handler,
            lifecycle,
        }
    }

    /// Start the worker on its own OS thread
    ///
    /// The thread is detached; joining goes through `Lifecycle`. If the
    /// spawn fails the worker is dropped, which marks the lifecycle
    /// `Stopped`.
    pub fn spawn(self, config: &ChannelConfig) -> std::io::Result<()> {
        let thread_name = format!("{}-{}", config.thread_prefix, self.name).replace('\0', "");
        let mut builder = thread::Builder::new().name(thread_name);
        if let Some(size) = config.stack_size {
            builder = builder.stack_size(size);
        }
        builder.spawn(move || self.run()).map(drop)
    }

    fn run(mut self) {
        cinfo!("channel {} worker started", self.name);

        loop {
            match self.rx.recv() {
                Ok(Envelope::Request(request)) => self.serve(request),
                Ok(Envelope::Stop) => {
                    cdebug!("channel {} dequeued stop", self.name);
                    break;
                }
                Err(e) => {
                    cdebug!("channel {} queue {:?}, exiting", self.name, e);
                    break;
                }
            }
        }

        self.shutdown();
    }

    fn serve(&mut self, request: Request) {
        let Request { endpoint, args, responder } = request;
        ctrace!("channel {} serving {} ({} args)", self.name, endpoint, args.len());

        let handler = &mut self.handler;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(&endpoint, &args)))
            .unwrap_or_else(|payload| Err(HandlerError::from_panic(payload)));

        self.lifecycle.processed.fetch_add(1, Ordering::Relaxed);
        if let Err(e) = &outcome {
            self.lifecycle.failed.fetch_add(1, Ordering::Relaxed);
            cdebug!("channel {} endpoint {} failed: {}", self.name, endpoint, e);
        }

        if !responder.is_awaited() {
            ctrace!("channel {} caller of {} gave up, result dropped", self.name, endpoint);
        }
        responder.resolve(outcome.map_err(ChannelError::Handler));
    }

    fn shutdown(&mut self) {
        self.lifecycle.state.transition(ChannelState::Running, ChannelState::Stopping);
        self.rx.close();

        let mut rejected = 0usize;
        for envelope in self.rx.drain() {
            if let Envelope::Request(request) = envelope {
                self.lifecycle.record_rejected();
                request.responder.resolve(Err(ChannelError::Unavailable));
                rejected += 1;
            }
        }
        if rejected > 0 {
            cwarn!("channel {} stopped with {} pending requests", self.name, rejected);
        }

        let handler = &mut self.handler;
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler.on_stop())) {
            cwarn!(
                "channel {} on_stop: {}",
                self.name,
                HandlerError::from_panic(payload)
            );
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.lifecycle.state.terminate();
        self.lifecycle.exited.wake_all();
        cinfo!("channel {} worker exited", self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use crate::value::Value;
    use std::time::Duration;
    use syncchan_core::bounded;

    fn start(
        handler: impl RequestHandler,
    ) -> (syncchan_core::Sender<Envelope>, Arc<Lifecycle>) {
        let (tx, rx) = bounded(8);
        let lifecycle = Arc::new(Lifecycle::new());
        lifecycle.state.transition(ChannelState::Created, ChannelState::Running);

        Worker::new("test", rx, Box::new(handler), Arc::clone(&lifecycle))
            .spawn(&ChannelConfig::new())
            .unwrap();
        (tx, lifecycle)
    }

    #[test]
    fn test_serves_then_stops() {
        let (tx, lifecycle) = start(handler_fn(|ep, _| Ok(Value::from(ep))));

        let (req, handle) = Request::new("ping", Vec::new());
        tx.send(Envelope::Request(req)).unwrap();
        assert_eq!(handle.wait().unwrap(), Value::from("ping"));

        tx.send(Envelope::Stop).unwrap();
        assert!(lifecycle.wait_exited(Some(Instant::now() + Duration::from_secs(5))));
        assert_eq!(lifecycle.state.load(), ChannelState::Stopped);
        assert_eq!(lifecycle.stats().processed, 1);
    }

    #[test]
    fn test_requests_after_stop_are_rejected() {
        let (tx, lifecycle) = start(handler_fn(|_, _| {
            thread::sleep(Duration::from_millis(20));
            Ok(Value::Null)
        }));

        let (first, first_handle) = Request::new("a", Vec::new());
        let (late, late_handle) = Request::new("b", Vec::new());
        tx.send(Envelope::Request(first)).unwrap();
        tx.send(Envelope::Stop).unwrap();
        let _ = tx.send(Envelope::Request(late));

        assert!(first_handle.wait().is_ok());
        assert!(late_handle.wait().unwrap_err().is_unavailable());
        assert!(lifecycle.wait_exited(Some(Instant::now() + Duration::from_secs(5))));
    }

    #[test]
    fn test_panic_is_contained() {
        let (tx, lifecycle) = start(handler_fn(|ep, _| {
            if ep == "bad" {
                panic!("kaput");
            }
            Ok(Value::Bool(true))
        }));

        let (bad, bad_handle) = Request::new("bad", Vec::new());
        let (good, good_handle) = Request::new("good", Vec::new());
        tx.send(Envelope::Request(bad)).unwrap();
        tx.send(Envelope::Request(good)).unwrap();

        let err = bad_handle.wait().unwrap_err();
        assert_eq!(err.to_string(), "handler panicked: kaput");
        assert_eq!(good_handle.wait().unwrap(), Value::Bool(true));

        let stats = lifecycle.stats();
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.failed, 1);
        tx.send(Envelope::Stop).unwrap();
    }

    #[test]
    fn test_closed_queue_ends_worker() {
        let (tx, lifecycle) = start(handler_fn(|_, _| Ok(Value::Null)));
        tx.close();
        assert!(lifecycle.wait_exited(Some(Instant::now() + Duration::from_secs(5))));
    }

    #[test]
    fn test_wait_exited_times_out() {
        let lifecycle = Lifecycle::new();
        let start = Instant::now();
        assert!(!lifecycle.wait_exited(Some(start + Duration::from_millis(20))));
        assert!(start.elapsed() >= Duration::from_millis(15));
    }
}
