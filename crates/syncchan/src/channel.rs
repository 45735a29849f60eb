//! Request channel
//!
//! A `Channel` is a cheap, clonable handle to one named request queue and
//! the worker serving it. Any number of threads may call `request`
//! concurrently; the handler behind the channel still sees one request at
//! a time, in enqueue order.
//!
//! # Lifecycle
//!
//! ```text
//! Created -> Running -> Stopping -> Stopped
//! ```
//!
//! `stop()` first drops the channel from its registry, then moves
//! `Running -> Stopping`, after which every new request
//! fails with `ChannelError::Unavailable`. Requests enqueued before the
//! stop sentinel are still served. The worker marks `Stopped` once it has
//! drained its queue and run the handler's `on_stop`.

use std::fmt;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use syncchan_core::{
    bounded_with, cdebug, cinfo, cwarn, deadline_after, CancellationToken, ChannelError,
    ChannelId, ChannelResult, ChannelState, ResponseHandle, SendError, Sender,
};

use crate::config::ChannelConfig;
use crate::handler::RequestHandler;
use crate::registry::RegistryInner;
use crate::request::{Envelope, Request};
use crate::value::Value;
use crate::worker::{ChannelStats, Lifecycle, Worker};

/// Handle to a running request channel
#[derive(Clone)]
pub struct Channel {
    shared: Arc<ChannelShared>,
}

struct ChannelShared {
    id: ChannelId,
    name: String,
    config: ChannelConfig,
    sender: Sender<Envelope>,
    /// Registry this channel was created in, if any
    registry: Weak<RegistryInner>,
    lifecycle: Arc<Lifecycle>,
}

impl Drop for ChannelShared {
    fn drop(&mut self) {
        // Last handle gone: let the worker finish what is queued and exit
        self.sender.close();
    }
}

impl Channel {
    /// Create the queue and start the worker
    pub(crate) fn start(
        name: &str,
        handler: Box<dyn RequestHandler>,
        config: ChannelConfig,
        registry: Weak<RegistryInner>,
    ) -> ChannelResult<Self> {
        let (sender, receiver) = bounded_with(config.capacity, config.park_interval);
        let lifecycle = Arc::new(Lifecycle::new());
        lifecycle.state.transition(ChannelState::Created, ChannelState::Running);

        let worker = Worker::new(name, receiver, handler, Arc::clone(&lifecycle));
        worker
            .spawn(&config)
            .map_err(|e| ChannelError::Spawn(e.to_string()))?;

        let channel = Channel {
            shared: Arc::new(ChannelShared {
                id: ChannelId::next(),
                name: name.to_string(),
                config,
                sender,
                registry,
                lifecycle,
            }),
        };
        cinfo!("channel {} ({}) created", channel.name(), channel.id());
        Ok(channel)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    #[inline]
    pub fn id(&self) -> ChannelId {
        self.shared.id
    }

    #[inline]
    pub fn state(&self) -> ChannelState {
        self.shared.lifecycle.state.load()
    }

    /// Check if new requests are accepted
    #[inline]
    pub fn is_accepting(&self) -> bool {
        self.state().is_accepting()
    }

    /// Requests currently queued (hint, may be stale)
    pub fn queue_len(&self) -> usize {
        self.shared.sender.len()
    }

    pub fn capacity(&self) -> usize {
        self.shared.sender.capacity()
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.shared.config
    }

    pub fn stats(&self) -> ChannelStats {
        self.shared.lifecycle.stats()
    }

    /// Submit a request and block until the handler's result arrives
    ///
    /// Blocks while the queue is full. Waits at most the configured
    /// `request_timeout`, forever if none is set. A handler failure comes
    /// back as `ChannelError::Handler` carrying the handler's message.
    pub fn request(&self, endpoint: &str, args: Vec<Value>) -> ChannelResult<Value> {
        self.request_with(
            endpoint,
            args,
            self.shared.config.request_timeout,
            &CancellationToken::never(),
        )
    }

    /// Like `request`, with an explicit deadline covering enqueue and wait
    ///
    /// On `Timeout` a request that already made it into the queue is still
    /// served; its result is discarded.
    pub fn request_timeout(
        &self,
        endpoint: &str,
        args: Vec<Value>,
        timeout: Duration,
    ) -> ChannelResult<Value> {
        self.request_with(endpoint, args, Some(timeout), &CancellationToken::never())
    }

    /// Like `request`, failing with `Interrupted` once `token` is cancelled
    pub fn request_cancellable(
        &self,
        endpoint: &str,
        args: Vec<Value>,
        token: &CancellationToken,
    ) -> ChannelResult<Value> {
        self.request_with(endpoint, args, self.shared.config.request_timeout, token)
    }

    /// Enqueue a request without waiting for its result
    ///
    /// Still blocks while the queue is full, up to the configured
    /// `request_timeout`.
    pub fn submit(&self, endpoint: &str, args: Vec<Value>) -> ChannelResult<ResponseHandle<Value>> {
        let deadline = self.shared.config.request_timeout.and_then(deadline_after);
        self.enqueue(endpoint, args, deadline, &CancellationToken::never())
    }

    fn request_with(
        &self,
        endpoint: &str,
        args: Vec<Value>,
        timeout: Option<Duration>,
        token: &CancellationToken,
    ) -> ChannelResult<Value> {
        let deadline = timeout.and_then(deadline_after);
        let handle = self.enqueue(endpoint, args, deadline, token)?;
        handle.wait_cancellable(token, deadline).map_err(|e| {
            if let ChannelError::Interrupted = e {
                cwarn!("channel {}: wait for {} interrupted", self.name(), endpoint);
            }
            e
        })
    }

    fn enqueue(
        &self,
        endpoint: &str,
        args: Vec<Value>,
        deadline: Option<Instant>,
        token: &CancellationToken,
    ) -> ChannelResult<ResponseHandle<Value>> {
        let shared = &*self.shared;
        if !shared.lifecycle.state.load().is_accepting() {
            shared.lifecycle.record_rejected();
            return Err(ChannelError::Unavailable);
        }

        let (request, handle) = Request::new(endpoint, args);
        match shared.sender.send_deadline(Envelope::Request(request), deadline, token) {
            Ok(()) => Ok(handle),
            Err(SendError::Timeout(_)) => Err(ChannelError::Timeout),
            Err(SendError::Cancelled(_)) => {
                cwarn!("channel {}: enqueue of {} interrupted", self.name(), endpoint);
                Err(ChannelError::Interrupted)
            }
            Err(SendError::Full(_)) | Err(SendError::Closed(_)) => {
                shared.lifecycle.record_rejected();
                Err(ChannelError::Unavailable)
            }
        }
    }

    /// Stop the channel
    ///
    /// Never blocks and never fails; calling it again, or on a stopped
    /// channel, does nothing beyond the registry removal. The channel is
    /// removed from its registry before it stops accepting, and only while
    /// the registry still maps its name to this channel.
    pub fn stop(&self) {
        let shared = &*self.shared;
        if let Some(registry) = shared.registry.upgrade() {
            let _removed = registry.remove_if(&shared.name, shared.id);
        }

        if !shared
            .lifecycle
            .state
            .transition(ChannelState::Running, ChannelState::Stopping)
        {
            return;
        }
        cinfo!("channel {} ({}) stopping", shared.name, shared.id);

        match shared.sender.try_send(Envelope::Stop) {
            Ok(()) => {}
            Err(SendError::Full(stop)) => self.send_stop_later(stop),
            // Worker already gone
            Err(_) => {}
        }
    }

    /// Queue is full: enqueue the sentinel from a helper thread
    fn send_stop_later(&self, stop: Envelope) {
        let sender = self.shared.sender.clone();
        let spawned = thread::Builder::new()
            .name(format!("{}-stop", self.shared.config.thread_prefix))
            .spawn(move || {
                let _ = sender.send(stop);
            });

        if let Err(e) = spawned {
            // Closing ends the worker after the queued requests as well
            cwarn!(
                "channel {}: stop helper not spawned ({}), closing queue",
                self.shared.name,
                e
            );
            self.shared.sender.close();
        } else {
            cdebug!("channel {}: queue full, stop deferred", self.shared.name);
        }
    }

    /// Block until the worker has exited
    pub fn join(&self) {
        self.shared.lifecycle.wait_exited(None);
    }

    /// Block until the worker has exited or `timeout` elapses
    ///
    /// Returns `true` if the worker exited.
    pub fn join_timeout(&self, timeout: Duration) -> bool {
        self.shared.lifecycle.wait_exited(deadline_after(timeout))
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.shared.name)
            .field("id", &self.shared.id)
            .field("state", &self.state())
            .field("queued", &self.queue_len())
            .finish()
    }
}
