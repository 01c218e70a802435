//! The seam between a descriptor and the work it schedules.
use tracing::debug;

use crate::classifier::{classify, AttemptReport, CancelReason, RunResultCode};
use crate::clock::Clock;
use crate::record::JobRecord;
use crate::types::retry::RetryConstraint;
use crate::types::status::JobStatus;
use crate::types::time::{Nanos, TimeBound};

/// Number of attempts a [`Task`] gets unless it says otherwise.
pub const DEFAULT_RETRY_LIMIT: u32 = 20;

/// The underlying unit of work a descriptor carries. The descriptor never
/// looks inside; it only reacts to the declared outcome.
pub trait Work: Send {
    /// Runs one attempt. A failing run may leave a retry constraint and its
    /// error in `ctx`; the descriptor collects both afterwards.
    fn run(&mut self, ctx: &mut RunContext<'_>) -> RunResultCode;

    /// Called once when the descriptor reaches a terminal cancel.
    fn on_cancel(
        &mut self,
        reason: CancelReason,
        last_error: Option<&anyhow::Error>,
    );

    /// One-way sync of the final descriptor state, called when the
    /// descriptor is built.
    fn absorb_descriptor_state(&mut self, _state: &JobRecord) {}

    fn set_priority(&mut self, priority: i32);
}

/// Per-attempt view handed to [`Work::run`].
pub struct RunContext<'a> {
    attempt: u32,
    clock: &'a dyn Clock,
    status: JobStatus,
    deadline: TimeBound,
    cancel_on_deadline: bool,
    pub(crate) retry_constraint: Option<RetryConstraint>,
    pub(crate) error: Option<anyhow::Error>,
}

impl<'a> RunContext<'a> {
    pub fn new(
        attempt: u32,
        clock: &'a dyn Clock,
        status: JobStatus,
        deadline: TimeBound,
        cancel_on_deadline: bool,
    ) -> Self {
        Self {
            attempt,
            clock,
            status,
            deadline,
            cancel_on_deadline,
            retry_constraint: None,
            error: None,
        }
    }

    /// 1-based number of this attempt.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn now(&self) -> Nanos {
        self.clock.nano_time()
    }

    /// Cancellation is cooperative: long-running work should poll this.
    pub fn is_cancelled(&self) -> bool {
        self.status.is_cancelled()
    }

    pub fn status(&self) -> &JobStatus {
        &self.status
    }

    pub fn deadline(&self) -> TimeBound {
        self.deadline
    }

    /// The deadline has passed and reaching it cancels the job.
    pub fn deadline_cancels_now(&self) -> bool {
        self.cancel_on_deadline && self.deadline.has_passed(self.now())
    }

    pub fn set_retry_constraint(&mut self, constraint: RetryConstraint) {
        self.retry_constraint = Some(constraint);
    }

    pub fn retry_constraint(&self) -> Option<&RetryConstraint> {
        self.retry_constraint.as_ref()
    }

    pub fn record_error(&mut self, error: anyhow::Error) {
        self.error = Some(error);
    }
}

/// A fallible job body. Wrap it in [`TaskWork`] to get a [`Work`] that
/// classifies its own failures.
pub trait Task: Send {
    fn on_run(&mut self, ctx: &RunContext<'_>) -> anyhow::Result<()>;

    /// Consulted after a failure while retries remain.
    fn should_re_run(
        &mut self,
        _error: &anyhow::Error,
        _run_count: u32,
        _retry_limit: u32,
    ) -> RetryConstraint {
        RetryConstraint::RETRY
    }

    fn retry_limit(&self) -> u32 {
        DEFAULT_RETRY_LIMIT
    }

    fn on_cancel(
        &mut self,
        _reason: CancelReason,
        _last_error: Option<&anyhow::Error>,
    ) {
    }

    fn on_added(&mut self, _state: &JobRecord) {}
}

/// Adapts a [`Task`] into a [`Work`].
#[derive(Debug)]
pub struct TaskWork<T> {
    task: T,
    priority: i32,
}

impl<T: Task> TaskWork<T> {
    pub fn new(task: T) -> Self {
        Self { task, priority: 0 }
    }

    pub fn task(&self) -> &T {
        &self.task
    }

    pub fn task_mut(&mut self) -> &mut T {
        &mut self.task
    }

    /// Priority as last propagated from the descriptor.
    pub fn priority(&self) -> i32 {
        self.priority
    }
}

impl<T: Task> Work for TaskWork<T> {
    fn run(&mut self, ctx: &mut RunContext<'_>) -> RunResultCode {
        let error = match self.task.on_run(ctx) {
            Ok(()) => return classify(AttemptReport::default()),
            Err(error) => error,
        };

        let retry_limit = self.task.retry_limit();
        let deadline_cancel = ctx.deadline_cancels_now();
        let below_retry_limit = ctx.attempt() < retry_limit;
        let cancelled = ctx.is_cancelled();

        let mut retry_requested = false;
        if below_retry_limit && !deadline_cancel && !cancelled {
            let constraint =
                self.task.should_re_run(&error, ctx.attempt(), retry_limit);
            retry_requested = constraint.retry;
            ctx.set_retry_constraint(constraint);
        }

        debug!(
            attempt = ctx.attempt(),
            retry_limit,
            retry_requested,
            error = %error,
            "task failed"
        );
        ctx.record_error(error);

        classify(AttemptReport {
            failed: true,
            cancelled,
            cancelled_single_id: ctx.status().is_cancelled_single_id(),
            deadline_cancel,
            below_retry_limit,
            retry_requested,
        })
    }

    fn on_cancel(
        &mut self,
        reason: CancelReason,
        last_error: Option<&anyhow::Error>,
    ) {
        self.task.on_cancel(reason, last_error);
    }

    fn absorb_descriptor_state(&mut self, state: &JobRecord) {
        self.priority = state.priority;
        self.task.on_added(state);
    }

    fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }
}

#[cfg(test)]
mod tests {
    use anyhow::bail;

    use super::*;
    use crate::clock::ManualClock;

    /// Fails until it has been run `succeed_on` times.
    struct Flaky {
        succeed_on: u32,
        retry: bool,
        limit: u32,
    }

    impl Task for Flaky {
        fn on_run(&mut self, ctx: &RunContext<'_>) -> anyhow::Result<()> {
            if ctx.attempt() >= self.succeed_on {
                Ok(())
            } else {
                bail!("attempt {} failed", ctx.attempt())
            }
        }

        fn should_re_run(
            &mut self,
            _error: &anyhow::Error,
            run_count: u32,
            _retry_limit: u32,
        ) -> RetryConstraint {
            if self.retry {
                RetryConstraint::exponential_backoff(
                    run_count,
                    std::time::Duration::from_millis(10),
                )
            } else {
                RetryConstraint::CANCEL
            }
        }

        fn retry_limit(&self) -> u32 {
            self.limit
        }
    }

    fn run_once(
        work: &mut TaskWork<Flaky>,
        attempt: u32,
        status: &JobStatus,
        deadline: TimeBound,
    ) -> (RunResultCode, bool, bool) {
        let clock = ManualClock::new(100);
        let mut ctx =
            RunContext::new(attempt, &clock, status.clone(), deadline, true);
        let code = work.run(&mut ctx);
        (code, ctx.retry_constraint.is_some(), ctx.error.is_some())
    }

    fn flaky(succeed_on: u32, retry: bool, limit: u32) -> TaskWork<Flaky> {
        TaskWork::new(Flaky {
            succeed_on,
            retry,
            limit,
        })
    }

    #[test]
    fn test_success() {
        let mut work = flaky(1, true, 3);
        let status = JobStatus::new();
        assert_eq!(
            run_once(&mut work, 1, &status, TimeBound::Forever),
            (RunResultCode::Success, false, false)
        );
    }

    #[test]
    fn test_retry_then_limit() {
        let mut work = flaky(10, true, 3);
        let status = JobStatus::new();
        assert_eq!(
            run_once(&mut work, 1, &status, TimeBound::Forever),
            (RunResultCode::TryAgain, true, true)
        );
        assert_eq!(
            run_once(&mut work, 3, &status, TimeBound::Forever),
            (RunResultCode::FailRunLimit, false, true)
        );
    }

    #[test]
    fn test_declined_retry() {
        let mut work = flaky(10, false, 3);
        let status = JobStatus::new();
        assert_eq!(
            run_once(&mut work, 1, &status, TimeBound::Forever),
            (RunResultCode::FailShouldReRun, true, true)
        );
    }

    #[test]
    fn test_cancel_mid_run() {
        let mut work = flaky(10, true, 3);
        let status = JobStatus::new();
        status.mark_cancelled();
        // Retry handler is not consulted for a cancelled job.
        assert_eq!(
            run_once(&mut work, 1, &status, TimeBound::Forever),
            (RunResultCode::FailForCancel, false, true)
        );

        let status = JobStatus::new();
        status.mark_cancelled_single_id();
        assert_eq!(
            run_once(&mut work, 1, &status, TimeBound::Forever).0,
            RunResultCode::FailSingleId
        );
    }

    #[test]
    fn test_deadline_mid_run() {
        let mut work = flaky(10, true, 3);
        let status = JobStatus::new();
        assert_eq!(
            run_once(&mut work, 1, &status, TimeBound::At(50)),
            (RunResultCode::HitDeadline, false, true)
        );
    }
}
