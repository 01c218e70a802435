//! Monotonic time sources.
//!
//! Every reading that ends up in a descriptor must come from the same clock
//! instance, otherwise orderings and deadlines are meaningless.
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use crate::types::time::{offset, Nanos};

pub trait Clock: Send + Sync {
    /// Current monotonic reading in nanoseconds.
    fn nano_time(&self) -> Nanos;
}

/// Wall-independent clock backed by [`Instant`].
#[derive(Debug)]
pub struct MonotonicClock {
    started: Instant,
    origin: Nanos,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// A clock whose first reading is `origin`. Lets a fresh process continue
    /// a timeline that was persisted by an earlier one.
    pub fn starting_at(origin: Nanos) -> Self {
        Self {
            started: Instant::now(),
            origin,
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn nano_time(&self) -> Nanos {
        offset(self.origin, self.started.elapsed())
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now: Nanos) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: Nanos) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Moves the clock forward, saturating at `Nanos::MAX`, and returns the
    /// new reading.
    pub fn advance(&self, by: Duration) -> Nanos {
        let previous = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| {
                Some(offset(now, by))
            })
            .unwrap_or_else(|previous| previous);
        offset(previous, by)
    }
}

impl Clock for ManualClock {
    fn nano_time(&self) -> Nanos {
        self.now.load(Ordering::SeqCst)
    }
}
