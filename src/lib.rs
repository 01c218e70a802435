//! Scheduling-decision core of a background job queue: the job descriptor,
//! its run constraints, and the handling of run outcomes.
pub mod builder;
pub mod classifier;
pub mod clock;
pub mod constraints;
pub mod params;
pub mod record;
pub mod types;
pub mod util;
pub mod work;

#[cfg(test)]
pub(crate) mod testing;

pub use builder::{BuildError, JobBuilder, RequiredField};
pub use classifier::{CancelReason, FollowUp, RunResultCode};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use constraints::{Constraints, Eligibility};
pub use params::JobParams;
pub use record::JobRecord;
pub use types::job::JobDescriptor;
pub use work::{RunContext, Task, TaskWork, Work};
