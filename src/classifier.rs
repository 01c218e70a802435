//! Maps the outcome of one run attempt to a result code, and each result
//! code to what the dispatcher has to do next.
use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of exactly one run attempt. There is deliberately no "running"
/// code: a code only exists once the attempt is over.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunResultCode {
    /// The work completed without error.
    Success,
    /// The work failed and its retry budget is spent.
    FailRunLimit,
    /// The work failed after a cancel request arrived mid-run.
    FailForCancel,
    /// The work failed and asked for another attempt.
    TryAgain,
    /// The work failed and declined another attempt.
    FailShouldReRun,
    /// The work failed while a newer descriptor with the same single-instance
    /// key was waiting.
    FailSingleId,
    /// The deadline was reached before or during the run.
    HitDeadline,
}

impl RunResultCode {
    /// Stable numeric form, for collaborators that persist or log raw codes.
    pub fn code(self) -> u8 {
        use RunResultCode::*;

        match self {
            Success => 1,
            FailRunLimit => 2,
            FailForCancel => 3,
            TryAgain => 4,
            FailShouldReRun => 5,
            FailSingleId => 6,
            HitDeadline => 7,
        }
    }

    /// What the dispatcher must do after an attempt ended with this code.
    pub fn follow_up(self, cancel_on_deadline: bool) -> FollowUp {
        use RunResultCode::*;

        match self {
            Success => FollowUp::Remove,
            FailRunLimit => FollowUp::Cancel(CancelReason::ReachedRetryLimit),
            FailForCancel => {
                FollowUp::Cancel(CancelReason::CancelledWhileRunning)
            },
            TryAgain => FollowUp::Reschedule,
            FailShouldReRun => {
                FollowUp::Cancel(CancelReason::CancelledViaShouldReRun)
            },
            FailSingleId => {
                FollowUp::Cancel(CancelReason::SingleInstanceWhileRunning)
            },
            HitDeadline if cancel_on_deadline => {
                FollowUp::Cancel(CancelReason::ReachedDeadline)
            },
            HitDeadline => FollowUp::ForceRun,
        }
    }
}

impl TryFrom<u8> for RunResultCode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use RunResultCode::*;

        Ok(match value {
            1 => Success,
            2 => FailRunLimit,
            3 => FailForCancel,
            4 => TryAgain,
            5 => FailShouldReRun,
            6 => FailSingleId,
            7 => HitDeadline,
            _ => return Err(value),
        })
    }
}

impl fmt::Display for RunResultCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use RunResultCode::*;

        f.write_str(match self {
            Success => "SUCCESS",
            FailRunLimit => "FAIL_RUN_LIMIT",
            FailForCancel => "FAIL_FOR_CANCEL",
            TryAgain => "TRY_AGAIN",
            FailShouldReRun => "FAIL_SHOULD_RE_RUN",
            FailSingleId => "FAIL_SINGLE_ID",
            HitDeadline => "HIT_DEADLINE",
        })
    }
}

/// Why a descriptor reached a terminal cancel. Passed to the work's
/// cancellation callback.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    ReachedRetryLimit,
    CancelledWhileRunning,
    /// Discarded before running because an equivalent single-instance
    /// descriptor was already queued.
    SingleInstanceIdQueued,
    CancelledViaShouldReRun,
    SingleInstanceWhileRunning,
    ReachedDeadline,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use CancelReason::*;

        f.write_str(match self {
            ReachedRetryLimit => "reached retry limit",
            CancelledWhileRunning => "cancelled while running",
            SingleInstanceIdQueued => "single instance id queued",
            CancelledViaShouldReRun => "cancelled via should-re-run",
            SingleInstanceWhileRunning => "single instance while running",
            ReachedDeadline => "reached deadline",
        })
    }
}

/// The action a dispatcher owes a descriptor after an attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FollowUp {
    /// Finished for good; drop it from storage.
    Remove,
    /// Terminal cancel; the cancellation callback runs once.
    Cancel(CancelReason),
    /// Back into the queue using the retry constraint.
    Reschedule,
    /// Run again now, ignoring outstanding constraints.
    ForceRun,
}

impl FollowUp {
    /// True when the descriptor leaves storage after this action.
    pub fn is_terminal(self) -> bool {
        matches!(self, FollowUp::Remove | FollowUp::Cancel(_))
    }
}

/// Everything known about an attempt once the work has returned.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct AttemptReport {
    pub failed: bool,
    pub cancelled: bool,
    pub cancelled_single_id: bool,
    /// The deadline had passed by the time the attempt ended and the
    /// descriptor cancels on deadline.
    pub deadline_cancel: bool,
    /// The attempt number is still below the work's retry limit.
    pub below_retry_limit: bool,
    /// The work's failure handler asked for a retry.
    pub retry_requested: bool,
}

/// Turns a finished attempt into its result code.
///
/// Cancellation outranks everything but success, so a run that notices a
/// cancel and bails out is reported as cancelled rather than as a retry.
pub fn classify(report: AttemptReport) -> RunResultCode {
    use RunResultCode::*;

    if !report.failed {
        Success
    } else if report.cancelled_single_id {
        FailSingleId
    } else if report.cancelled {
        FailForCancel
    } else if report.below_retry_limit
        && !report.deadline_cancel
        && report.retry_requested
    {
        TryAgain
    } else if report.deadline_cancel {
        HitDeadline
    } else if report.below_retry_limit {
        FailShouldReRun
    } else {
        FailRunLimit
    }
}
