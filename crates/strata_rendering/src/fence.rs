//! GPU fences as opaque poll-only handles.
//!
//! The orchestrator only ever asks "has this finished?" and never waits.
//! Each backend supplies its own fence type.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// A marker that signals once all work submitted before it has completed.
pub trait Fence {
    /// Zero-timeout status query.
    fn is_signaled(&self) -> bool;

    /// Destroys the fence without waiting for it.
    fn dispose(self)
    where
        Self: Sized,
    {
    }
}

const PENDING: u8 = 0;
const SIGNALED: u8 = 1;
const FAILED: u8 = 2;

/// Fence backed by an atomic flag set from a device callback.
///
/// Failure counts as signaled: the work is over, it just did not succeed.
#[derive(Debug, Clone, Default)]
pub struct SignalFence {
    state: Arc<AtomicU8>,
}

impl SignalFence {
    /// Creates an unsignaled fence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the fenced work as completed.
    pub fn signal(&self) {
        self.state.store(SIGNALED, Ordering::Release);
    }

    /// Marks the fenced work as completed unsuccessfully.
    pub fn fail(&self) {
        self.state.store(FAILED, Ordering::Release);
    }

    /// Whether the fenced work failed.
    #[must_use]
    pub fn has_failed(&self) -> bool {
        self.state.load(Ordering::Acquire) == FAILED
    }
}

impl Fence for SignalFence {
    fn is_signaled(&self) -> bool {
        self.state.load(Ordering::Acquire) != PENDING
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_shared_between_clones() {
        let fence = SignalFence::new();
        let callback_side = fence.clone();
        assert!(!fence.is_signaled());
        callback_side.signal();
        assert!(fence.is_signaled());
        assert!(!fence.has_failed());
    }

    #[test]
    fn test_failure_is_signaled() {
        let fence = SignalFence::new();
        fence.clone().fail();
        assert!(fence.is_signaled());
        assert!(fence.has_failed());
        fence.dispose();
    }
}
