use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::states::JobState;
use crate::builder::BuildError;

#[derive(Debug, Default)]
struct Flags {
    cancelled: AtomicBool,
    cancelled_single_id: AtomicBool,
    successful: RwLock<bool>,
}

/// The part of a descriptor other threads may touch while a run is in flight.
///
/// Cloning yields another handle onto the same flags. The cancel flags are
/// set-once: nothing ever clears them. The success flag sits behind a lock as
/// it is both written after the run and polled by maintenance paths.
#[derive(Clone, Debug, Default)]
pub struct JobStatus {
    flags: Arc<Flags>,
}

impl JobStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds flags from storage. A job can't have been both cancelled and
    /// successful, so such a combination is refused.
    pub(crate) fn restore(
        cancelled: bool,
        cancelled_single_id: bool,
        successful: bool,
    ) -> Result<Self, BuildError> {
        let cancelled = cancelled || cancelled_single_id;
        if cancelled && successful {
            return Err(BuildError::ConflictingState);
        }
        Ok(Self {
            flags: Arc::new(Flags {
                cancelled: AtomicBool::new(cancelled),
                cancelled_single_id: AtomicBool::new(cancelled_single_id),
                successful: RwLock::new(successful),
            }),
        })
    }

    /// Requests cancellation. Returns true if this call flipped the flag.
    ///
    /// Has no effect once the job has succeeded.
    pub fn mark_cancelled(&self) -> bool {
        // Holding the read side keeps mark_successful from landing in between.
        let successful = self.flags.successful.read();
        if *successful {
            return false;
        }
        !self.flags.cancelled.swap(true, Ordering::AcqRel)
    }

    /// Cancels because another descriptor with the same single-instance key
    /// won. Implies [`JobStatus::mark_cancelled`].
    pub fn mark_cancelled_single_id(&self) -> bool {
        let successful = self.flags.successful.read();
        if *successful {
            return false;
        }
        // Set cancelled first so single-id never shows without it.
        let flipped = !self.flags.cancelled.swap(true, Ordering::AcqRel);
        self.flags.cancelled_single_id.store(true, Ordering::Release);
        flipped
    }

    pub fn is_cancelled(&self) -> bool {
        self.flags.cancelled.load(Ordering::Acquire)
    }

    pub fn is_cancelled_single_id(&self) -> bool {
        self.flags.cancelled_single_id.load(Ordering::Acquire)
    }

    /// Records terminal success. Refused (returns false) for a cancelled job.
    pub fn mark_successful(&self) -> bool {
        let mut successful = self.flags.successful.write();
        if self.is_cancelled() {
            return false;
        }
        *successful = true;
        true
    }

    pub fn is_successful(&self) -> bool {
        *self.flags.successful.read()
    }

    pub fn state(&self) -> JobState {
        if self.is_successful() {
            JobState::Successful
        } else if self.is_cancelled() {
            JobState::Cancelled {
                single_id: self.is_cancelled_single_id(),
            }
        } else {
            JobState::Pending
        }
    }
}
