//! Retry decisions handed back by a failing work item.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::time::{serde_millis, Timeout};

/// Replacement network requirements applied on retry. Both windows are
/// re-sealed against the clock at the time the retry is applied.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NetworkRequirement {
    pub network: Timeout,
    pub unmetered: Timeout,
}

/// Attached by a work item's failure path to tell the dispatcher whether and
/// how to try again. The dispatcher consumes it right after the attempt.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct RetryConstraint {
    pub retry: bool,
    /// Delay from the moment the retry is applied.
    #[serde(default, with = "serde_millis::option")]
    pub new_delay: Option<Duration>,
    #[serde(default)]
    pub new_priority: Option<i32>,
    #[serde(default)]
    pub new_network: Option<NetworkRequirement>,
}

impl RetryConstraint {
    /// Retry immediately with the current settings.
    pub const RETRY: RetryConstraint = RetryConstraint {
        retry: true,
        new_delay: None,
        new_priority: None,
        new_network: None,
    };

    /// Give up on the job.
    pub const CANCEL: RetryConstraint = RetryConstraint {
        retry: false,
        new_delay: None,
        new_priority: None,
        new_network: None,
    };

    /// Retries after `initial * 2^(run_count - 1)`, saturating.
    pub fn exponential_backoff(run_count: u32, initial: Duration) -> Self {
        let exp = run_count.saturating_sub(1);
        let factor = 2u32.checked_pow(exp).unwrap_or(u32::MAX);
        Self {
            new_delay: Some(initial.saturating_mul(factor)),
            ..Self::RETRY
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.new_delay = Some(delay);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.new_priority = Some(priority);
        self
    }

    pub fn with_network(mut self, requirement: NetworkRequirement) -> Self {
        self.new_network = Some(requirement);
        self
    }
}
