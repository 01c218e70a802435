//! Decides whether a descriptor may run at a given instant.
//!
//! Everything here is pure and non-blocking so a queue can call it while
//! holding its own selection lock.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::connectivity::Connectivity;
use crate::types::time::{Nanos, TimeBound, Timeout};

/// Anchors both network timeouts at `now`.
///
/// Unmetered implies network, so the network window is raised to the
/// unmetered one when the latter reaches further.
pub fn seal_network_windows(
    now: Nanos,
    network: Timeout,
    unmetered: Timeout,
) -> (TimeBound, TimeBound) {
    let unmetered = unmetered.seal(now);
    let network = network.seal(now).max(unmetered);
    (network, unmetered)
}

/// The scheduling fields a run decision depends on.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    pub delay_until: TimeBound,
    pub requires_network_until: TimeBound,
    pub requires_unmetered_network_until: TimeBound,
    pub deadline: TimeBound,
    pub cancel_on_deadline: bool,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            delay_until: TimeBound::Never,
            requires_network_until: TimeBound::Never,
            requires_unmetered_network_until: TimeBound::Never,
            deadline: TimeBound::Forever,
            cancel_on_deadline: false,
        }
    }
}

impl Constraints {
    pub fn requires_network(&self, now: Nanos) -> bool {
        self.requires_network_until.is_pending(now)
    }

    pub fn requires_unmetered_network(&self, now: Nanos) -> bool {
        self.requires_unmetered_network_until.is_pending(now)
    }

    pub fn deadline_reached(&self, now: Nanos) -> bool {
        self.deadline.has_passed(now)
    }

    /// Earliest instant after `now` at which [`evaluate`] may answer
    /// differently without a connectivity change, if there is one.
    pub fn next_wake(&self, now: Nanos) -> Option<Nanos> {
        [
            self.delay_until,
            self.requires_network_until,
            self.requires_unmetered_network_until,
            self.deadline,
        ]
        .into_iter()
        .filter(|b| b.is_pending(now))
        .filter_map(TimeBound::instant)
        .min()
    }
}

/// Verdict of a single evaluation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Eligibility {
    /// Every constraint is satisfied.
    Runnable,
    /// Constraints are outstanding but the deadline overrides them.
    ForcedByDeadline,
    Delayed { until: Nanos },
    AwaitingNetwork,
    AwaitingUnmeteredNetwork,
    Cancelled,
    /// The deadline passed and the descriptor cancels on deadline.
    HitDeadline,
    /// The job already finished successfully.
    Completed,
}

impl Eligibility {
    pub fn is_runnable(self) -> bool {
        matches!(self, Eligibility::Runnable | Eligibility::ForcedByDeadline)
    }
}

impl fmt::Display for Eligibility {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Eligibility::Runnable => f.write_str("runnable"),
            Eligibility::ForcedByDeadline => {
                f.write_str("runnable (forced by deadline)")
            },
            Eligibility::Delayed { until } => {
                write!(f, "delayed until {until}ns")
            },
            Eligibility::AwaitingNetwork => f.write_str("awaiting network"),
            Eligibility::AwaitingUnmeteredNetwork => {
                f.write_str("awaiting unmetered network")
            },
            Eligibility::Cancelled => f.write_str("cancelled"),
            Eligibility::HitDeadline => f.write_str("hit deadline"),
            Eligibility::Completed => f.write_str("completed"),
        }
    }
}

/// Evaluates `constraints` at `now`.
///
/// A passed deadline either cancels (when `cancel_on_deadline` is set) or
/// lifts every other constraint; the two never mix for one descriptor.
pub fn evaluate(
    constraints: &Constraints,
    cancelled: bool,
    now: Nanos,
    connectivity: Connectivity,
) -> Eligibility {
    if cancelled {
        return Eligibility::Cancelled;
    }

    let blocked = if constraints.delay_until.is_pending(now) {
        // is_pending only holds for Forever or a concrete instant.
        Some(Eligibility::Delayed {
            until: constraints.delay_until.instant().unwrap_or(Nanos::MAX),
        })
    } else if constraints.requires_network(now) && !connectivity.has_network()
    {
        Some(Eligibility::AwaitingNetwork)
    } else if constraints.requires_unmetered_network(now)
        && !connectivity.has_unmetered_network()
    {
        Some(Eligibility::AwaitingUnmeteredNetwork)
    } else {
        None
    };

    if constraints.deadline_reached(now) {
        if constraints.cancel_on_deadline {
            Eligibility::HitDeadline
        } else if blocked.is_some() {
            Eligibility::ForcedByDeadline
        } else {
            Eligibility::Runnable
        }
    } else {
        blocked.unwrap_or(Eligibility::Runnable)
    }
}
