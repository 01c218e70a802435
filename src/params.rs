//! Producer-facing job parameters.
//!
//! A producer describes what it wants in relative terms (delays, timeouts);
//! [`JobParams::into_builder`] anchors everything to one clock reading.
use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::builder::JobBuilder;
use crate::clock::Clock;
use crate::types::job::single_instance_tag;
use crate::types::time::{offset, serde_millis, SessionId, TimeBound, Timeout};

/// What happens when a job has been waiting too long.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DeadlinePolicy {
    #[serde(with = "serde_millis")]
    pub after: Duration,
    /// Cancel instead of forcing a run.
    #[serde(default)]
    pub cancel: bool,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobParams {
    pub priority: i32,
    pub group_id: Option<String>,
    /// At most one pending job per single id. Also serves as the group when
    /// none is given, so instances never run concurrently.
    pub single_id: Option<String>,
    pub persistent: bool,
    pub tags: BTreeSet<String>,
    #[serde(with = "serde_millis")]
    pub delay: Duration,
    pub requires_network: Timeout,
    pub requires_unmetered_network: Timeout,
    pub deadline: Option<DeadlinePolicy>,
}

impl JobParams {
    pub fn new(priority: i32) -> Self {
        Self {
            priority,
            ..Default::default()
        }
    }

    pub fn group_by(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    pub fn single_instance_by(mut self, single_id: impl Into<String>) -> Self {
        self.single_id = Some(single_id.into());
        self
    }

    pub fn persist(mut self) -> Self {
        self.persistent = true;
        self
    }

    pub fn add_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn delay_in(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Requires any network, for `timeout` or forever.
    pub fn require_network(mut self, timeout: Timeout) -> Self {
        self.requires_network = timeout;
        self
    }

    pub fn require_unmetered_network(mut self, timeout: Timeout) -> Self {
        self.requires_unmetered_network = timeout;
        self
    }

    pub fn override_deadline_to_run_in(mut self, after: Duration) -> Self {
        self.deadline = Some(DeadlinePolicy {
            after,
            cancel: false,
        });
        self
    }

    pub fn override_deadline_to_cancel_in(mut self, after: Duration) -> Self {
        self.deadline = Some(DeadlinePolicy {
            after,
            cancel: true,
        });
        self
    }

    /// A builder with everything but the work item filled in and sealed
    /// against a single reading of `clock`.
    pub fn into_builder(
        self,
        id: impl Into<String>,
        clock: &dyn Clock,
        session: SessionId,
    ) -> JobBuilder {
        let now = clock.nano_time();

        let mut tags = self.tags;
        if let Some(single_id) = &self.single_id {
            tags.insert(single_instance_tag(single_id));
        }
        let group_id = self.group_id.or(self.single_id);
        let delay_until = if self.delay.is_zero() {
            TimeBound::Never
        } else {
            TimeBound::At(offset(now, self.delay))
        };
        let (deadline, cancel_on_deadline) = match self.deadline {
            Some(policy) => {
                (TimeBound::At(offset(now, policy.after)), policy.cancel)
            },
            None => (TimeBound::Forever, false),
        };

        JobBuilder::new()
            .id(id)
            .persistent(self.persistent)
            .priority(self.priority)
            .group_id(group_id)
            .created_at(now)
            .delay_until(delay_until)
            .running_session(session)
            .deadline(deadline, cancel_on_deadline)
            .tags((!tags.is_empty()).then_some(tags))
            .seal_times(
                clock,
                self.requires_network,
                self.requires_unmetered_network,
            )
    }
}
