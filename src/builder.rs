//! Validated construction of [`JobDescriptor`]s.
use std::collections::BTreeSet;
use std::fmt;

use itertools::Itertools;
use tracing::{debug, instrument, trace};

use crate::clock::Clock;
use crate::constraints::seal_network_windows;
use crate::types::job::JobDescriptor;
use crate::types::retry::RetryConstraint;
use crate::types::status::JobStatus;
use crate::types::time::{Nanos, SessionId, TimeBound, Timeout};
use crate::work::Work;

/// Fields a builder refuses to default.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum RequiredField {
    Id,
    Persistent,
    Priority,
    GroupId,
    Work,
    CreatedAt,
    DelayUntil,
    RunningSession,
    RequiresNetworkUntil,
    RequiresUnmeteredNetworkUntil,
}

impl RequiredField {
    pub const ALL: [RequiredField; 10] = [
        RequiredField::Id,
        RequiredField::Persistent,
        RequiredField::Priority,
        RequiredField::GroupId,
        RequiredField::Work,
        RequiredField::CreatedAt,
        RequiredField::DelayUntil,
        RequiredField::RunningSession,
        RequiredField::RequiresNetworkUntil,
        RequiredField::RequiresUnmeteredNetworkUntil,
    ];
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use RequiredField::*;

        f.write_str(match self {
            Id => "id",
            Persistent => "persistent",
            Priority => "priority",
            GroupId => "group id",
            Work => "work",
            CreatedAt => "created at",
            DelayUntil => "delay until",
            RunningSession => "running session",
            RequiresNetworkUntil => "requires network until",
            RequiresUnmeteredNetworkUntil => "requires unmetered network until",
        })
    }
}

/// Why a builder refused to produce a descriptor. Always a programming
/// error on the caller's side.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BuildError {
    /// At least one required field was never set. Sorted, no duplicates.
    MissingFields(Vec<RequiredField>),
    EmptyId,
    /// Saved flags claim the job both succeeded and was cancelled.
    ConflictingState,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::MissingFields(fields) => write!(
                f,
                "must provide all required fields, missing: {}",
                fields.iter().join(", ")
            ),
            Self::EmptyId => f.write_str("job id must not be empty"),
            Self::ConflictingState => {
                f.write_str("job cannot be both cancelled and successful")
            },
        }
    }
}

impl std::error::Error for BuildError {}

/// Collects descriptor fields and checks that none of the required ones were
/// forgotten.
pub struct JobBuilder {
    provided: BTreeSet<RequiredField>,
    id: String,
    persistent: bool,
    priority: i32,
    group_id: Option<String>,
    run_count: u32,
    work: Option<Box<dyn Work>>,
    created_at: Nanos,
    delay_until: TimeBound,
    insertion_order: Option<i64>,
    running_session: SessionId,
    requires_network_until: TimeBound,
    requires_unmetered_network_until: TimeBound,
    deadline: TimeBound,
    cancel_on_deadline: bool,
    tags: Option<BTreeSet<String>>,
    status: JobStatus,
    retry_constraint: Option<RetryConstraint>,
}

impl Default for JobBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl JobBuilder {
    pub fn new() -> Self {
        Self {
            provided: BTreeSet::new(),
            id: String::new(),
            persistent: false,
            priority: 0,
            group_id: None,
            run_count: 0,
            work: None,
            created_at: 0,
            delay_until: TimeBound::Never,
            insertion_order: None,
            running_session: SessionId(0),
            requires_network_until: TimeBound::Never,
            requires_unmetered_network_until: TimeBound::Never,
            deadline: TimeBound::Forever,
            cancel_on_deadline: false,
            tags: None,
            status: JobStatus::new(),
            retry_constraint: None,
        }
    }

    fn provide(mut self, field: RequiredField) -> Self {
        self.provided.insert(field);
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self.provide(RequiredField::Id)
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self.provide(RequiredField::Persistent)
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self.provide(RequiredField::Priority)
    }

    /// Must be called even for ungrouped jobs, with `None`.
    pub fn group_id(mut self, group_id: Option<String>) -> Self {
        self.group_id = group_id;
        self.provide(RequiredField::GroupId)
    }

    pub fn run_count(mut self, run_count: u32) -> Self {
        self.run_count = run_count;
        self
    }

    pub fn work(self, work: impl Work + 'static) -> Self {
        self.boxed_work(Box::new(work))
    }

    pub fn boxed_work(mut self, work: Box<dyn Work>) -> Self {
        self.work = Some(work);
        self.provide(RequiredField::Work)
    }

    pub fn created_at(mut self, created_at: Nanos) -> Self {
        self.created_at = created_at;
        self.provide(RequiredField::CreatedAt)
    }

    pub fn delay_until(mut self, delay_until: TimeBound) -> Self {
        self.delay_until = delay_until;
        self.provide(RequiredField::DelayUntil)
    }

    /// Optional: normally assigned by the queue on enqueue.
    pub fn insertion_order(mut self, insertion_order: i64) -> Self {
        self.insertion_order = Some(insertion_order);
        self
    }

    pub fn running_session(mut self, session: SessionId) -> Self {
        self.running_session = session;
        self.provide(RequiredField::RunningSession)
    }

    pub fn requires_network_until(mut self, until: TimeBound) -> Self {
        self.requires_network_until = until;
        self.provide(RequiredField::RequiresNetworkUntil)
    }

    pub fn requires_unmetered_network_until(
        mut self,
        until: TimeBound,
    ) -> Self {
        self.requires_unmetered_network_until = until;
        self.provide(RequiredField::RequiresUnmeteredNetworkUntil)
    }

    /// Optional; defaults to no deadline.
    pub fn deadline(
        mut self,
        deadline: TimeBound,
        cancel_on_deadline: bool,
    ) -> Self {
        self.deadline = deadline;
        self.cancel_on_deadline = cancel_on_deadline;
        self
    }

    pub fn tags(mut self, tags: Option<BTreeSet<String>>) -> Self {
        self.tags = tags;
        self
    }

    /// Converts both relative network timeouts to absolute windows using one
    /// reading of `clock`, raising the network window to cover the unmetered
    /// one if needed.
    pub fn seal_times(
        self,
        clock: &dyn Clock,
        network: Timeout,
        unmetered: Timeout,
    ) -> Self {
        let now = clock.nano_time();
        let (network, unmetered) =
            seal_network_windows(now, network, unmetered);
        trace!(now, %network, %unmetered, "sealed network windows");
        self.requires_network_until(network)
            .requires_unmetered_network_until(unmetered)
    }

    /// Carries flags and a pending retry over from storage, so the work item
    /// absorbs the state as it was saved.
    pub(crate) fn restored(
        mut self,
        status: JobStatus,
        retry_constraint: Option<RetryConstraint>,
    ) -> Self {
        self.status = status;
        self.retry_constraint = retry_constraint;
        self
    }

    /// Fields that haven't been provided yet.
    pub fn missing(&self) -> Vec<RequiredField> {
        RequiredField::ALL
            .into_iter()
            .filter(|f| !self.provided.contains(f))
            .collect()
    }

    #[instrument(name = "build", skip_all, fields(id = %self.id))]
    pub fn build(self) -> Result<JobDescriptor, BuildError> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(BuildError::MissingFields(missing));
        }
        if self.id.is_empty() {
            return Err(BuildError::EmptyId);
        }
        let work = self
            .work
            .ok_or(BuildError::MissingFields(vec![RequiredField::Work]))?;

        let mut requires_network_until = self.requires_network_until;
        if requires_network_until < self.requires_unmetered_network_until {
            debug!("raising network window to cover unmetered window");
            requires_network_until = self.requires_unmetered_network_until;
        }

        let mut descriptor = JobDescriptor {
            id: self.id,
            persistent: self.persistent,
            priority: self.priority,
            group_id: self.group_id,
            run_count: self.run_count,
            created_at: self.created_at,
            delay_until: self.delay_until,
            insertion_order: None,
            running_session: self.running_session,
            requires_network_until,
            requires_unmetered_network_until: self
                .requires_unmetered_network_until,
            deadline: self.deadline,
            cancel_on_deadline: self.cancel_on_deadline,
            tags: self.tags,
            status: self.status,
            retry_constraint: self.retry_constraint,
            last_error: None,
            cancel_notified: false,
            work,
        };
        if let Some(order) = self.insertion_order {
            descriptor.assign_insertion_order(order);
        }

        let state = descriptor.to_record();
        descriptor.work.absorb_descriptor_state(&state);

        debug!("built job descriptor");
        Ok(descriptor)
    }
}
