use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use tracing::{debug, instrument, warn};

use super::connectivity::Connectivity;
use super::retry::RetryConstraint;
use super::states::JobState;
use super::status::JobStatus;
use super::time::{offset, Nanos, SessionId, TimeBound};
use crate::builder::JobBuilder;
use crate::classifier::{CancelReason, FollowUp, RunResultCode};
use crate::clock::Clock;
use crate::constraints::{
    evaluate, seal_network_windows, Constraints, Eligibility,
};
use crate::work::{RunContext, Work};

/// Tags starting with this prefix name the descriptor's single-instance key.
pub const SINGLE_ID_TAG_PREFIX: &str = "job-single-id:";

/// The tag that marks a descriptor as the single instance for `single_id`.
pub fn single_instance_tag(single_id: &str) -> String {
    format!("{SINGLE_ID_TAG_PREFIX}{single_id}")
}

/// A unit of deferred work as the queue sees it.
///
/// Identity is the `id` alone: equality and hashing ignore every other field.
///
/// Scheduling fields change through `&mut self`, so only the dispatcher that
/// owns the descriptor can touch them. The cancel and success flags live in a
/// shared [`JobStatus`] which other threads reach through
/// [`JobDescriptor::status`].
pub struct JobDescriptor {
    pub(crate) id: String,
    pub(crate) persistent: bool,
    pub(crate) priority: i32,
    pub(crate) group_id: Option<String>,
    pub(crate) run_count: u32,
    pub(crate) created_at: Nanos,
    pub(crate) delay_until: TimeBound,
    pub(crate) insertion_order: Option<i64>,
    pub(crate) running_session: SessionId,
    pub(crate) requires_network_until: TimeBound,
    pub(crate) requires_unmetered_network_until: TimeBound,
    pub(crate) deadline: TimeBound,
    pub(crate) cancel_on_deadline: bool,
    pub(crate) tags: Option<BTreeSet<String>>,
    pub(crate) status: JobStatus,
    pub(crate) retry_constraint: Option<RetryConstraint>,
    pub(crate) last_error: Option<anyhow::Error>,
    /// Whether the work's cancellation callback already ran.
    pub(crate) cancel_notified: bool,
    pub(crate) work: Box<dyn Work>,
}

impl JobDescriptor {
    pub fn builder() -> JobBuilder {
        JobBuilder::new()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Updates the priority here and on the work item. Dispatch decisions
    /// already taken are unaffected.
    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
        self.work.set_priority(priority);
    }

    pub fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }

    pub fn run_count(&self) -> u32 {
        self.run_count
    }

    pub fn set_run_count(&mut self, run_count: u32) {
        self.run_count = run_count;
    }

    pub fn created_at(&self) -> Nanos {
        self.created_at
    }

    pub fn set_created_at(&mut self, created_at: Nanos) {
        self.created_at = created_at;
    }

    pub fn delay_until(&self) -> TimeBound {
        self.delay_until
    }

    pub fn set_delay_until(&mut self, delay_until: TimeBound) {
        self.delay_until = delay_until;
    }

    pub fn insertion_order(&self) -> Option<i64> {
        self.insertion_order
    }

    /// Records the queue position. Only the first assignment sticks; later
    /// ones are ignored and reported by returning false.
    #[instrument(skip(self), fields(id = %self.id))]
    pub fn assign_insertion_order(&mut self, order: i64) -> bool {
        match self.insertion_order {
            Some(existing) => {
                warn!(existing, "insertion order already assigned");
                false
            },
            None => {
                self.insertion_order = Some(order);
                true
            },
        }
    }

    pub fn running_session(&self) -> SessionId {
        self.running_session
    }

    pub fn set_running_session(&mut self, session: SessionId) {
        self.running_session = session;
    }

    /// True when the descriptor was last claimed by a session other than
    /// `current`, i.e. its previous run was interrupted by a restart.
    pub fn is_stale_session(&self, current: SessionId) -> bool {
        self.running_session != current
    }

    pub fn requires_network_until(&self) -> TimeBound {
        self.requires_network_until
    }

    pub fn requires_unmetered_network_until(&self) -> TimeBound {
        self.requires_unmetered_network_until
    }

    pub fn requires_network(&self, now: Nanos) -> bool {
        self.requires_network_until.is_pending(now)
    }

    pub fn requires_unmetered_network(&self, now: Nanos) -> bool {
        self.requires_unmetered_network_until.is_pending(now)
    }

    pub fn deadline(&self) -> TimeBound {
        self.deadline
    }

    pub fn cancel_on_deadline(&self) -> bool {
        self.cancel_on_deadline
    }

    pub fn tags(&self) -> Option<&BTreeSet<String>> {
        self.tags.as_ref()
    }

    pub fn has_tags(&self) -> bool {
        self.tags.as_ref().is_some_and(|t| !t.is_empty())
    }

    /// The first tag carrying [`SINGLE_ID_TAG_PREFIX`], in tag order.
    ///
    /// Tags are kept sorted, so the answer doesn't depend on insertion order.
    pub fn single_instance_key(&self) -> Option<&str> {
        let mut keys = self
            .tags
            .iter()
            .flatten()
            .filter(|t| t.starts_with(SINGLE_ID_TAG_PREFIX));
        let first = keys.next()?;
        if keys.next().is_some() {
            debug!(id = %self.id, key = %first, "several single-instance tags");
        }
        Some(first.as_str())
    }

    pub fn constraints(&self) -> Constraints {
        Constraints {
            delay_until: self.delay_until,
            requires_network_until: self.requires_network_until,
            requires_unmetered_network_until: self
                .requires_unmetered_network_until,
            deadline: self.deadline,
            cancel_on_deadline: self.cancel_on_deadline,
        }
    }

    /// Whether the descriptor may run at `now`. Pure.
    pub fn eligibility(
        &self,
        now: Nanos,
        connectivity: Connectivity,
    ) -> Eligibility {
        if self.status.is_successful() {
            return Eligibility::Completed;
        }
        evaluate(
            &self.constraints(),
            self.status.is_cancelled(),
            now,
            connectivity,
        )
    }

    pub fn next_wake(&self, now: Nanos) -> Option<Nanos> {
        self.constraints().next_wake(now)
    }

    /// Cancels the descriptor if its deadline passed and it cancels on
    /// deadline, returning the code the dispatcher should act on.
    #[instrument(skip(self), fields(id = %self.id))]
    pub fn enforce_deadline(&self, now: Nanos) -> Option<RunResultCode> {
        if !self.cancel_on_deadline || self.deadline.is_pending(now) {
            return None;
        }
        if !self.status.mark_cancelled() {
            // Already cancelled or already done.
            return None;
        }
        debug!("deadline reached, cancelled");
        Some(RunResultCode::HitDeadline)
    }

    /// Handle onto the shared flags, for other threads.
    pub fn status(&self) -> &JobStatus {
        &self.status
    }

    pub fn state(&self) -> JobState {
        self.status.state()
    }

    pub fn mark_cancelled(&self) -> bool {
        self.status.mark_cancelled()
    }

    pub fn mark_cancelled_single_id(&self) -> bool {
        self.status.mark_cancelled_single_id()
    }

    pub fn is_cancelled(&self) -> bool {
        self.status.is_cancelled()
    }

    pub fn is_cancelled_single_id(&self) -> bool {
        self.status.is_cancelled_single_id()
    }

    pub fn mark_successful(&self) -> bool {
        self.status.mark_successful()
    }

    pub fn is_successful(&self) -> bool {
        self.status.is_successful()
    }

    pub fn retry_constraint(&self) -> Option<&RetryConstraint> {
        self.retry_constraint.as_ref()
    }

    pub fn take_retry_constraint(&mut self) -> Option<RetryConstraint> {
        self.retry_constraint.take()
    }

    pub fn clear_retry_constraint(&mut self) {
        self.retry_constraint = None;
    }

    pub fn last_error(&self) -> Option<&anyhow::Error> {
        self.last_error.as_ref()
    }

    /// Hands the terminal cancel to the work item along with the last
    /// failure. Only the first call reaches the work.
    #[instrument(skip(self), fields(id = %self.id))]
    pub fn on_cancel(&mut self, reason: CancelReason) {
        if self.cancel_notified {
            return;
        }
        self.cancel_notified = true;
        debug!(%reason, "notifying work of cancellation");
        self.work.on_cancel(reason, self.last_error.as_ref());
    }

    /// Discards this descriptor in favour of an already-queued one with the
    /// same single-instance key.
    pub fn cancel_as_duplicate(&mut self) {
        self.mark_cancelled_single_id();
        self.on_cancel(CancelReason::SingleInstanceIdQueued);
    }

    /// Runs one attempt of the underlying work.
    ///
    /// Failures never escape as errors: they come back as a result code, with
    /// the error kept in [`JobDescriptor::last_error`].
    #[instrument(skip_all, fields(id = %self.id, attempt = self.run_count + 1))]
    pub fn safe_run(&mut self, clock: &dyn Clock) -> RunResultCode {
        self.retry_constraint = None;

        let mut ctx = RunContext::new(
            self.run_count.saturating_add(1),
            clock,
            self.status.clone(),
            self.deadline,
            self.cancel_on_deadline,
        );
        let code = self.work.run(&mut ctx);

        self.retry_constraint = ctx.retry_constraint.take();
        if let Some(error) = ctx.error.take() {
            self.last_error = Some(error);
        }

        debug!(%code, "attempt finished");
        code
    }

    /// Applies the descriptor's half of the follow-up for `code` and returns
    /// the action left for the dispatcher.
    ///
    /// A cancel that lands before a success is recorded wins: the work is
    /// notified and the dispatcher is told to cancel.
    #[instrument(skip(self, clock), fields(id = %self.id))]
    pub fn apply(
        &mut self,
        code: RunResultCode,
        clock: &dyn Clock,
    ) -> FollowUp {
        let mut follow_up = code.follow_up(self.cancel_on_deadline);
        if follow_up == FollowUp::Remove && !self.status.mark_successful() {
            warn!("cancelled before success was recorded, keeping cancel");
            follow_up = FollowUp::Cancel(CancelReason::CancelledWhileRunning);
        }

        match follow_up {
            FollowUp::Remove => {
                self.retry_constraint = None;
            },
            FollowUp::Cancel(reason) => {
                self.status.mark_cancelled();
                self.retry_constraint = None;
                self.on_cancel(reason);
            },
            FollowUp::Reschedule => {
                let constraint = self.retry_constraint.take();
                self.run_count = self.run_count.saturating_add(1);
                if let Some(constraint) = constraint {
                    self.apply_retry_constraint(constraint, clock.nano_time());
                }
            },
            FollowUp::ForceRun => {
                self.retry_constraint = None;
                self.run_count = self.run_count.saturating_add(1);
            },
        }

        debug!(?follow_up, run_count = self.run_count, "applied result");
        follow_up
    }

    fn apply_retry_constraint(
        &mut self,
        constraint: RetryConstraint,
        now: Nanos,
    ) {
        if let Some(delay) = constraint.new_delay {
            self.delay_until = TimeBound::At(offset(now, delay));
        }
        if let Some(priority) = constraint.new_priority {
            self.set_priority(priority);
        }
        if let Some(requirement) = constraint.new_network {
            let (network, unmetered) = seal_network_windows(
                now,
                requirement.network,
                requirement.unmetered,
            );
            self.requires_network_until = network;
            self.requires_unmetered_network_until = unmetered;
        }
    }

    pub fn ordering_key(&self) -> OrderingKey<'_> {
        OrderingKey {
            priority: self.priority,
            created_at: self.created_at,
            insertion_order: self.insertion_order,
            id: &self.id,
        }
    }
}

impl PartialEq for JobDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for JobDescriptor {}

impl Hash for JobDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for JobDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("JobDescriptor")
            .field("id", &self.id)
            .field("persistent", &self.persistent)
            .field("priority", &self.priority)
            .field("group_id", &self.group_id)
            .field("run_count", &self.run_count)
            .field("created_at", &self.created_at)
            .field("delay_until", &self.delay_until)
            .field("insertion_order", &self.insertion_order)
            .field("running_session", &self.running_session)
            .field("requires_network_until", &self.requires_network_until)
            .field(
                "requires_unmetered_network_until",
                &self.requires_unmetered_network_until,
            )
            .field("deadline", &self.deadline)
            .field("cancel_on_deadline", &self.cancel_on_deadline)
            .field("tags", &self.tags)
            .field("state", &self.status.state())
            .field("retry_constraint", &self.retry_constraint)
            .finish_non_exhaustive()
    }
}

/// Dispatch order: higher priority first, then older, then earlier enqueued
/// (descriptors not yet enqueued go last), then by id so the order is total.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OrderingKey<'a> {
    pub priority: i32,
    pub created_at: Nanos,
    pub insertion_order: Option<i64>,
    pub id: &'a str,
}

impl Ord for OrderingKey<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then(self.created_at.cmp(&other.created_at))
            .then(
                self.insertion_order
                    .unwrap_or(i64::MAX)
                    .cmp(&other.insertion_order.unwrap_or(i64::MAX)),
            )
            .then(self.id.cmp(other.id))
    }
}

impl PartialOrd for OrderingKey<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;
    use std::time::Duration;

    use proptest::prelude::*;

    use super::*;
    use crate::clock::ManualClock;
    use crate::testing::{complete_builder, RecordingWork};
    use crate::types::retry::NetworkRequirement;
    use crate::types::time::Timeout;

    const SECOND: Nanos = 1_000_000_000;

    fn hash_of(job: &JobDescriptor) -> u64 {
        let mut h = DefaultHasher::new();
        job.hash(&mut h);
        h.finish()
    }

    fn tagged(tags: &[&str]) -> JobDescriptor {
        complete_builder("t")
            .tags(Some(tags.iter().map(|t| t.to_string()).collect()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_identity_is_id_only() {
        let a = complete_builder("same").priority(1).build().unwrap();
        let b = complete_builder("same")
            .priority(9)
            .persistent(true)
            .created_at(77)
            .build()
            .unwrap();
        let c = complete_builder("other").build().unwrap();

        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_ne!(a, c);
    }

    #[test]
    fn test_single_instance_key() {
        let untagged = complete_builder("t").build().unwrap();
        assert_eq!(untagged.single_instance_key(), None);
        assert_eq!(tagged(&[]).single_instance_key(), None);
        assert!(!tagged(&[]).has_tags());
        assert_eq!(tagged(&["a", "b"]).single_instance_key(), None);
        assert_eq!(
            tagged(&["a", "job-single-id:x"]).single_instance_key(),
            Some("job-single-id:x")
        );
        // Several matches: the smallest tag wins, whatever the input order.
        assert_eq!(
            tagged(&["job-single-id:z", "job-single-id:b"])
                .single_instance_key(),
            Some("job-single-id:b")
        );
    }

    proptest! {
        #[test]
        fn single_instance_key_ignores_tag_order(
            mut tags in prop::collection::vec(
                prop_oneof!["[a-z]{1,6}", "job-single-id:[a-z]{1,6}"],
                0..8,
            )
        ) {
            let refs: Vec<&str> = tags.iter().map(String::as_str).collect();
            let forward =
                tagged(&refs).single_instance_key().map(str::to_owned);

            tags.reverse();
            let refs: Vec<&str> = tags.iter().map(String::as_str).collect();
            let job = tagged(&refs);
            let reversed = job.single_instance_key().map(str::to_owned);

            prop_assert_eq!(&forward, &reversed);
            prop_assert_eq!(
                job.single_instance_key().map(str::to_owned),
                reversed
            );
        }

        #[test]
        fn sealed_windows_keep_invariant(
            now in any::<i64>(),
            network in prop_oneof![
                Just(Timeout::Never),
                Just(Timeout::Forever),
                (0u64..1_000_000).prop_map(Timeout::from_millis),
            ],
            unmetered in prop_oneof![
                Just(Timeout::Never),
                Just(Timeout::Forever),
                (0u64..1_000_000).prop_map(Timeout::from_millis),
            ],
        ) {
            let clock = ManualClock::new(now);
            let job = complete_builder("p")
                .seal_times(&clock, network, unmetered)
                .build()
                .unwrap();
            prop_assert!(
                job.requires_network_until()
                    >= job.requires_unmetered_network_until()
            );
            // Needing unmetered always means needing some network.
            for probe in [now, now.saturating_add(SECOND), i64::MAX] {
                if job.requires_unmetered_network(probe) {
                    prop_assert!(job.requires_network(probe));
                }
            }
        }
    }

    #[test]
    fn test_set_priority_propagates() {
        let work = RecordingWork::default();
        let log = work.log();
        let mut job = complete_builder("p").work(work).build().unwrap();

        job.set_priority(12);
        assert_eq!(job.priority(), 12);
        assert_eq!(log.lock().priority, Some(12));
    }

    #[test]
    fn test_cancel_single_id() {
        let job = complete_builder("c").build().unwrap();
        assert!(job.mark_cancelled_single_id());
        assert!(job.is_cancelled());
        job.mark_cancelled_single_id();
        assert!(job.is_cancelled() && job.is_cancelled_single_id());
        assert_eq!(job.state(), JobState::Cancelled { single_id: true });
    }

    #[test]
    fn test_cancel_as_duplicate_notifies_once() {
        let work = RecordingWork::default();
        let log = work.log();
        let mut job = complete_builder("d").work(work).build().unwrap();

        job.cancel_as_duplicate();
        job.on_cancel(CancelReason::ReachedDeadline);

        assert!(job.is_cancelled_single_id());
        assert_eq!(
            log.lock().cancels,
            vec![(CancelReason::SingleInstanceIdQueued, None)]
        );
    }

    #[test]
    fn test_deadline_cancels_instead_of_running() {
        let deadline = 10 * SECOND;
        let job = complete_builder("dl")
            .delay_until(TimeBound::Forever)
            .deadline(TimeBound::At(deadline), true)
            .build()
            .unwrap();

        assert_eq!(job.enforce_deadline(deadline - 1), None);
        assert!(!job.is_cancelled());

        for t in [deadline, deadline + SECOND] {
            let verdict = job.eligibility(t, Connectivity::Unmetered);
            assert!(!verdict.is_runnable());
        }
        assert_eq!(
            job.enforce_deadline(deadline),
            Some(RunResultCode::HitDeadline)
        );
        assert!(job.is_cancelled());
        assert_eq!(
            job.eligibility(deadline, Connectivity::Unmetered),
            Eligibility::Cancelled
        );
        // Only reported once.
        assert_eq!(job.enforce_deadline(deadline + 1), None);
    }

    #[test]
    fn test_deadline_forces_run() {
        let clock = ManualClock::new(0);
        let deadline = 10 * SECOND;
        let job = complete_builder("dl")
            .delay_until(TimeBound::Forever)
            .seal_times(&clock, Timeout::Forever, Timeout::Forever)
            .deadline(TimeBound::At(deadline), false)
            .build()
            .unwrap();

        assert_eq!(
            job.eligibility(deadline - 1, Connectivity::Disconnected),
            Eligibility::Delayed { until: Nanos::MAX }
        );
        assert_eq!(
            job.eligibility(deadline, Connectivity::Disconnected),
            Eligibility::ForcedByDeadline
        );
        assert_eq!(job.enforce_deadline(deadline), None);
        assert!(!job.is_cancelled());
    }

    #[test]
    fn test_successful_run() {
        let clock = ManualClock::new(0);
        let mut job = complete_builder("s").build().unwrap();

        let code = job.safe_run(&clock);
        assert_eq!(code, RunResultCode::Success);
        assert_eq!(job.apply(code, &clock), FollowUp::Remove);
        assert!(job.is_successful());
        assert!(!job.mark_cancelled());
    }

    #[test]
    fn test_cancel_beats_late_success() {
        let clock = ManualClock::new(0);
        let work = RecordingWork::default();
        let log = work.log();
        let mut job = complete_builder("late").work(work).build().unwrap();

        let code = job.safe_run(&clock);
        assert_eq!(code, RunResultCode::Success);
        // Another thread cancels after the work returned.
        assert!(job.status().mark_cancelled());

        assert_eq!(
            job.apply(code, &clock),
            FollowUp::Cancel(CancelReason::CancelledWhileRunning)
        );
        assert!(!job.is_successful());
        assert_eq!(job.state(), JobState::Cancelled { single_id: false });
        assert_eq!(
            log.lock().cancels,
            vec![(CancelReason::CancelledWhileRunning, None)]
        );
        assert_eq!(
            job.eligibility(0, Connectivity::Unmetered),
            Eligibility::Cancelled
        );
    }

    #[test]
    fn test_completed_job_is_not_runnable() {
        let clock = ManualClock::new(0);
        let mut job = complete_builder("done").build().unwrap();

        let code = job.safe_run(&clock);
        assert_eq!(job.apply(code, &clock), FollowUp::Remove);
        let verdict = job.eligibility(0, Connectivity::Unmetered);
        assert_eq!(verdict, Eligibility::Completed);
        assert!(!verdict.is_runnable());
    }

    #[test]
    fn test_retry_applies_constraint() {
        let clock = ManualClock::new(5 * SECOND);
        let retry = RetryConstraint::RETRY
            .with_delay(Duration::from_secs(2))
            .with_priority(4)
            .with_network(NetworkRequirement {
                network: Timeout::Never,
                unmetered: Timeout::from_millis(1_000),
            });
        let work = RecordingWork::scripted([
            (RunResultCode::TryAgain, Some(retry)),
            (RunResultCode::Success, None),
        ]);
        let log = work.log();
        let mut job = complete_builder("r").work(work).build().unwrap();

        let code = job.safe_run(&clock);
        assert_eq!(code, RunResultCode::TryAgain);
        assert!(job.retry_constraint().is_some());
        assert!(job.last_error().is_some());

        assert_eq!(job.apply(code, &clock), FollowUp::Reschedule);
        assert_eq!(job.retry_constraint(), None);
        assert_eq!(job.run_count(), 1);
        assert_eq!(job.delay_until(), TimeBound::At(7 * SECOND));
        assert_eq!(job.priority(), 4);
        assert_eq!(log.lock().priority, Some(4));
        assert_eq!(
            job.requires_unmetered_network_until(),
            TimeBound::At(6 * SECOND)
        );
        assert_eq!(job.requires_network_until(), TimeBound::At(6 * SECOND));

        clock.set(7 * SECOND);
        assert_eq!(job.safe_run(&clock), RunResultCode::Success);
        assert_eq!(log.lock().attempts, vec![1, 2]);
    }

    #[test]
    fn test_terminal_failure_notifies_with_error() {
        let clock = ManualClock::new(0);
        let work =
            RecordingWork::scripted([(RunResultCode::FailRunLimit, None)]);
        let log = work.log();
        let mut job = complete_builder("f").work(work).build().unwrap();

        let code = job.safe_run(&clock);
        assert_eq!(
            job.apply(code, &clock),
            FollowUp::Cancel(CancelReason::ReachedRetryLimit)
        );
        assert!(job.is_cancelled());
        assert!(!job.is_successful());
        assert_eq!(
            log.lock().cancels,
            vec![(
                CancelReason::ReachedRetryLimit,
                Some("scripted failure 1".to_string())
            )]
        );
    }

    #[test]
    fn test_stale_retry_constraint_cleared_on_next_run() {
        let clock = ManualClock::new(0);
        let mut job = complete_builder("x").build().unwrap();
        job.retry_constraint = Some(RetryConstraint::CANCEL);
        job.safe_run(&clock);
        assert_eq!(job.retry_constraint(), None);
    }

    #[test]
    fn test_hit_deadline_follow_up() {
        let clock = ManualClock::new(0);
        let mut job = complete_builder("h").build().unwrap();
        assert_eq!(
            job.apply(RunResultCode::HitDeadline, &clock),
            FollowUp::ForceRun
        );
        assert_eq!(job.run_count(), 1);
        assert!(!job.is_cancelled());
    }

    #[test]
    fn test_stale_session() {
        let mut job = complete_builder("s")
            .running_session(SessionId(1))
            .build()
            .unwrap();
        assert!(!job.is_stale_session(SessionId(1)));
        assert!(job.is_stale_session(SessionId(2)));
        job.set_running_session(SessionId(2));
        assert!(!job.is_stale_session(SessionId(2)));
    }

    #[test]
    fn test_ordering_key() {
        let job = |id: &str, priority, created_at, order: Option<i64>| {
            let mut b = complete_builder(id)
                .priority(priority)
                .created_at(created_at);
            if let Some(order) = order {
                b = b.insertion_order(order);
            }
            b.build().unwrap()
        };

        let mut jobs = vec![
            job("low", 1, 0, Some(1)),
            job("unqueued", 5, 10, None),
            job("high-late", 5, 10, Some(4)),
            job("high-early", 5, 3, Some(9)),
            job("high-late-first", 5, 10, Some(2)),
        ];
        jobs.sort_by(|a, b| a.ordering_key().cmp(&b.ordering_key()));
        let ids: Vec<&str> = jobs.iter().map(|j| j.id()).collect();
        assert_eq!(
            ids,
            ["high-early", "high-late-first", "high-late", "unqueued", "low"]
        );
    }
}
