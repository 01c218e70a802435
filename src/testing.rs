//! Test doubles shared by the unit tests.
use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::anyhow;
use parking_lot::Mutex;

use crate::builder::JobBuilder;
use crate::classifier::{CancelReason, RunResultCode};
use crate::record::JobRecord;
use crate::types::retry::RetryConstraint;
use crate::types::time::{SessionId, TimeBound};
use crate::work::{RunContext, Work};

#[derive(Debug, Default)]
pub(crate) struct WorkLog {
    pub(crate) absorbed_priority: Option<i32>,
    pub(crate) absorbed: Option<JobRecord>,
    pub(crate) priority: Option<i32>,
    pub(crate) attempts: Vec<u32>,
    pub(crate) cancels: Vec<(CancelReason, Option<String>)>,
}

/// Work that replays scripted outcomes and records every callback.
#[derive(Default)]
pub(crate) struct RecordingWork {
    script: VecDeque<(RunResultCode, Option<RetryConstraint>)>,
    log: Arc<Mutex<WorkLog>>,
}

impl RecordingWork {
    pub(crate) fn scripted(
        script: impl IntoIterator<
            Item = (RunResultCode, Option<RetryConstraint>),
        >,
    ) -> Self {
        Self {
            script: script.into_iter().collect(),
            log: Default::default(),
        }
    }

    pub(crate) fn log(&self) -> Arc<Mutex<WorkLog>> {
        self.log.clone()
    }
}

impl Work for RecordingWork {
    fn run(&mut self, ctx: &mut RunContext<'_>) -> RunResultCode {
        self.log.lock().attempts.push(ctx.attempt());

        let (code, retry) = self
            .script
            .pop_front()
            .unwrap_or((RunResultCode::Success, None));
        if code != RunResultCode::Success {
            ctx.record_error(anyhow!("scripted failure {}", ctx.attempt()));
        }
        if let Some(retry) = retry {
            ctx.set_retry_constraint(retry);
        }
        code
    }

    fn on_cancel(
        &mut self,
        reason: CancelReason,
        last_error: Option<&anyhow::Error>,
    ) {
        self.log
            .lock()
            .cancels
            .push((reason, last_error.map(|e| e.to_string())));
    }

    fn absorb_descriptor_state(&mut self, state: &JobRecord) {
        let mut log = self.log.lock();
        log.absorbed_priority = Some(state.priority);
        log.absorbed = Some(state.clone());
    }

    fn set_priority(&mut self, priority: i32) {
        self.log.lock().priority = Some(priority);
    }
}

/// A builder with every required field set.
pub(crate) fn complete_builder(id: &str) -> JobBuilder {
    JobBuilder::new()
        .id(id)
        .persistent(false)
        .priority(0)
        .group_id(None)
        .work(RecordingWork::default())
        .created_at(0)
        .delay_until(TimeBound::Never)
        .running_session(SessionId(1))
        .requires_network_until(TimeBound::Never)
        .requires_unmetered_network_until(TimeBound::Never)
}
