//! Named channel registry
//!
//! Maps names to live channels, at most one per name. Creating a channel
//! under a name that is already taken swaps the new channel in and stops
//! the old one; the swap happens under a single lock acquisition, so a
//! lookup never returns the replaced channel once `create` returned.
//!
//! Lookups take the same short spinlock as writers; they are not lock-free,
//! but never wait on a channel or its worker.
//!
//! Registries are plain values; pass one to whatever needs it. A
//! process-wide instance is available through `Registry::global()`.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use syncchan_core::{cdebug, cinfo, ChannelError, ChannelId, ChannelResult, SpinLock};

use crate::channel::Channel;
use crate::config::{ChannelConfig, ConfigError};
use crate::handler::RequestHandler;

#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

pub(crate) struct RegistryInner {
    channels: SpinLock<HashMap<String, Channel>>,
    config: ChannelConfig,
}

impl RegistryInner {
    /// Remove `name` only while it still maps to channel `id`
    ///
    /// The removed handle is returned so the caller drops it outside the
    /// lock.
    pub(crate) fn remove_if(&self, name: &str, id: ChannelId) -> Option<Channel> {
        let mut channels = self.channels.lock();
        match channels.get(name) {
            Some(current) if current.id() == id => channels.remove(name),
            _ => None,
        }
    }
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

impl Registry {
    /// Empty registry using `ChannelConfig::default()` for new channels
    pub fn new() -> Self {
        Self::with_config(ChannelConfig::default())
    }

    pub fn with_config(config: ChannelConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                channels: SpinLock::new(HashMap::new()),
                config,
            }),
        }
    }

    /// Process-wide registry, created on first use
    pub fn global() -> &'static Registry {
        GLOBAL.get_or_init(Registry::new)
    }

    /// Configuration applied by `create`
    pub fn config(&self) -> &ChannelConfig {
        &self.inner.config
    }

    /// Start a channel bound to `handler` and register it under `name`
    ///
    /// A channel previously registered under `name` is stopped; `create`
    /// does not wait for it to finish. Fails only if the worker thread
    /// cannot be spawned.
    pub fn create(&self, name: &str, handler: impl RequestHandler) -> ChannelResult<Channel> {
        self.create_with_config(name, handler, self.inner.config.clone())
    }

    /// Like `create`, with a per-channel configuration
    pub fn create_with_config(
        &self,
        name: &str,
        handler: impl RequestHandler,
        config: ChannelConfig,
    ) -> ChannelResult<Channel> {
        config.validate().map_err(|e| match e {
            ConfigError::InvalidValue(msg) => ChannelError::InvalidConfig(msg),
        })?;

        let channel = Channel::start(name, Box::new(handler), config, Arc::downgrade(&self.inner))?;
        let previous = self
            .inner
            .channels
            .lock()
            .insert(name.to_string(), channel.clone());

        if let Some(previous) = previous {
            cinfo!(
                "channel {}: {} replaced by {}",
                name,
                previous.id(),
                channel.id()
            );
            previous.stop();
        }
        Ok(channel)
    }

    /// The live channel registered under `name`
    ///
    /// Holds the map lock only for the clone.
    pub fn get(&self, name: &str) -> Option<Channel> {
        self.inner.channels.lock().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.channels.lock().contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.channels.lock().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.inner.channels.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.channels.lock().is_empty()
    }

    /// Stop the channel registered under `name`
    ///
    /// Returns `false` if no channel was registered under it.
    pub fn stop(&self, name: &str) -> bool {
        match self.get(name) {
            Some(channel) => {
                channel.stop();
                true
            }
            None => false,
        }
    }

    /// Stop every registered channel; returns how many were stopped
    pub fn stop_all(&self) -> usize {
        let channels: Vec<Channel> = self.inner.channels.lock().values().cloned().collect();
        for channel in &channels {
            channel.stop();
        }
        cdebug!("stopped {} channels", channels.len());
        channels.len()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("channels", &self.names())
            .finish()
    }
}
