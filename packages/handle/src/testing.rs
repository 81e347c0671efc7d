//! Probes for asserting release discipline in tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::handle::Release;

/// Shared view of how often a probe was touched and released.
#[derive(Debug, Clone, Default)]
pub struct ReleaseCounter {
    released: Arc<AtomicUsize>,
}

impl ReleaseCounter {
    /// Number of times the probe was released.
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

/// A stand-in engine object that records its release.
#[derive(Debug)]
pub struct ReleaseProbe {
    counter: ReleaseCounter,
    touches: usize,
}

impl ReleaseProbe {
    /// Create a probe and the counter observing it.
    pub fn new() -> (Self, ReleaseCounter) {
        let counter = ReleaseCounter::default();
        let probe = Self {
            counter: counter.clone(),
            touches: 0,
        };
        (probe, counter)
    }

    /// Record a use of the probe.
    pub fn touch(&mut self) {
        self.touches += 1;
    }

    /// Number of recorded uses.
    pub fn touches(&self) -> usize {
        self.touches
    }
}

impl Release for ReleaseProbe {
    fn release(self) {
        self.counter.released.fetch_add(1, Ordering::SeqCst);
    }
}
