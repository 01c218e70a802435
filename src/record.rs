//! Serializable snapshot of a descriptor, for the persistence layer.
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::builder::BuildError;
use crate::constraints::Constraints;
use crate::types::job::JobDescriptor;
use crate::types::retry::RetryConstraint;
use crate::types::states::JobState;
use crate::types::status::JobStatus;
use crate::types::time::{Nanos, SessionId, TimeBound};
use crate::work::Work;

/// Every descriptor field except the work item and the last error, which are
/// in-memory only.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub persistent: bool,
    pub priority: i32,
    pub group_id: Option<String>,
    pub run_count: u32,
    pub created_at: Nanos,
    pub delay_until: TimeBound,
    pub insertion_order: Option<i64>,
    pub running_session: SessionId,
    pub requires_network_until: TimeBound,
    pub requires_unmetered_network_until: TimeBound,
    pub deadline: TimeBound,
    pub cancel_on_deadline: bool,
    pub tags: Option<BTreeSet<String>>,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub cancelled_single_id: bool,
    #[serde(default)]
    pub successful: bool,
    #[serde(default)]
    pub retry_constraint: Option<RetryConstraint>,
}

impl JobRecord {
    /// Scheduling constraints as a restored descriptor would see them: the
    /// network window always covers the unmetered one.
    pub fn constraints(&self) -> Constraints {
        Constraints {
            delay_until: self.delay_until,
            requires_network_until: self
                .requires_network_until
                .max(self.requires_unmetered_network_until),
            requires_unmetered_network_until: self
                .requires_unmetered_network_until,
            deadline: self.deadline,
            cancel_on_deadline: self.cancel_on_deadline,
        }
    }

    pub fn state(&self) -> JobState {
        if self.successful {
            JobState::Successful
        } else if self.cancelled || self.cancelled_single_id {
            JobState::Cancelled {
                single_id: self.cancelled_single_id,
            }
        } else {
            JobState::Pending
        }
    }
}

impl JobDescriptor {
    pub fn to_record(&self) -> JobRecord {
        JobRecord {
            id: self.id.clone(),
            persistent: self.persistent,
            priority: self.priority,
            group_id: self.group_id.clone(),
            run_count: self.run_count,
            created_at: self.created_at,
            delay_until: self.delay_until,
            insertion_order: self.insertion_order,
            running_session: self.running_session,
            requires_network_until: self.requires_network_until,
            requires_unmetered_network_until: self
                .requires_unmetered_network_until,
            deadline: self.deadline,
            cancel_on_deadline: self.cancel_on_deadline,
            tags: self.tags.clone(),
            cancelled: self.status.is_cancelled(),
            cancelled_single_id: self.status.is_cancelled_single_id(),
            successful: self.status.is_successful(),
            retry_constraint: self.retry_constraint.clone(),
        }
    }

    /// Rebuilds a descriptor from storage. Goes through the builder, so a
    /// damaged record fails the same way a bad construction would.
    #[instrument(skip_all, fields(id = %record.id))]
    pub fn restore(
        record: JobRecord,
        work: Box<dyn Work>,
    ) -> Result<JobDescriptor, BuildError> {
        let mut builder = JobDescriptor::builder()
            .id(record.id)
            .persistent(record.persistent)
            .priority(record.priority)
            .group_id(record.group_id)
            .run_count(record.run_count)
            .boxed_work(work)
            .created_at(record.created_at)
            .delay_until(record.delay_until)
            .running_session(record.running_session)
            .requires_network_until(record.requires_network_until)
            .requires_unmetered_network_until(
                record.requires_unmetered_network_until,
            )
            .deadline(record.deadline, record.cancel_on_deadline)
            .tags(record.tags);
        if let Some(order) = record.insertion_order {
            builder = builder.insertion_order(order);
        }

        let status = JobStatus::restore(
            record.cancelled,
            record.cancelled_single_id,
            record.successful,
        )?;
        builder.restored(status, record.retry_constraint).build()
    }
}
