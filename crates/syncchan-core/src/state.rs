//! Channel lifecycle state

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a channel
///
/// `Created -> Running -> Stopping -> Stopped`. Stopped is terminal; a
/// channel is never restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChannelState {
    /// Constructed, worker not launched yet
    Created = 0,

    /// Worker running, new requests accepted
    Running = 1,

    /// `stop()` called; queued work drains, new work is rejected
    Stopping = 2,

    /// Worker exited
    Stopped = 3,
}

impl ChannelState {
    /// Check if new requests may be submitted
    #[inline]
    pub const fn is_accepting(&self) -> bool {
        matches!(self, ChannelState::Running)
    }

    /// Check if the worker has exited
    #[inline]
    pub const fn is_terminated(&self) -> bool {
        matches!(self, ChannelState::Stopped)
    }
}

impl From<u8> for ChannelState {
    fn from(v: u8) -> Self {
        match v {
            0 => ChannelState::Created,
            1 => ChannelState::Running,
            2 => ChannelState::Stopping,
            _ => ChannelState::Stopped,
        }
    }
}

impl From<ChannelState> for u8 {
    fn from(state: ChannelState) -> u8 {
        state as u8
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelState::Created => write!(f, "CREATED"),
            ChannelState::Running => write!(f, "RUNNING"),
            ChannelState::Stopping => write!(f, "STOPPING"),
            ChannelState::Stopped => write!(f, "STOPPED"),
        }
    }
}

/// Lifecycle state shared between a channel handle and its worker
#[derive(Debug)]
pub struct AtomicChannelState(AtomicU8);

impl AtomicChannelState {
    pub const fn new(state: ChannelState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    #[inline]
    pub fn load(&self) -> ChannelState {
        ChannelState::from(self.0.load(Ordering::Acquire))
    }

    /// Move `from -> to`; false if the current state was not `from`
    ///
    /// Exactly one caller wins a contended transition.
    #[inline]
    pub fn transition(&self, from: ChannelState, to: ChannelState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Force the terminal state, returning the previous one
    #[inline]
    pub fn terminate(&self) -> ChannelState {
        ChannelState::from(self.0.swap(ChannelState::Stopped as u8, Ordering::AcqRel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        assert!(ChannelState::Running.is_accepting());
        assert!(!ChannelState::Created.is_accepting());
        assert!(!ChannelState::Stopping.is_accepting());
        assert!(!ChannelState::Stopped.is_accepting());

        assert!(ChannelState::Stopped.is_terminated());
        assert!(!ChannelState::Stopping.is_terminated());
    }

    #[test]
    fn test_transition_single_winner() {
        let state = AtomicChannelState::new(ChannelState::Running);

        assert!(state.transition(ChannelState::Running, ChannelState::Stopping));
        assert!(!state.transition(ChannelState::Running, ChannelState::Stopping));
        assert_eq!(state.load(), ChannelState::Stopping);

        assert_eq!(state.terminate(), ChannelState::Stopping);
        assert_eq!(state.load(), ChannelState::Stopped);
    }

    #[test]
    fn test_u8_roundtrip() {
        for s in [
            ChannelState::Created,
            ChannelState::Running,
            ChannelState::Stopping,
            ChannelState::Stopped,
        ] {
            assert_eq!(ChannelState::from(u8::from(s)), s);
        }
    }
}
