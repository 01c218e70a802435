use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Monotonic clock reading in nanoseconds. Only meaningful relative to other
/// readings taken from the same [`Clock`](crate::clock::Clock).
pub type Nanos = i64;

/// An absolute point on the monotonic timeline, or one of the two unreachable
/// ends of it.
///
/// The ordering is `Never < At(_) < Forever` regardless of the wrapped value,
/// so `max`/`min` behave as expected when mixing sentinels with real instants.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TimeBound {
    /// Already in the past for every reading.
    Never,
    /// A concrete instant.
    At(Nanos),
    /// Unreachably far in the future.
    Forever,
}

impl TimeBound {
    /// True while `now` hasn't yet reached this bound, i.e. `bound > now`.
    pub fn is_pending(self, now: Nanos) -> bool {
        match self {
            TimeBound::Never => false,
            TimeBound::At(at) => at > now,
            TimeBound::Forever => true,
        }
    }

    /// True once `now` is at or beyond this bound. Exact complement of
    /// [`TimeBound::is_pending`].
    pub fn has_passed(self, now: Nanos) -> bool {
        !self.is_pending(now)
    }

    /// The concrete instant, if any.
    pub fn instant(self) -> Option<Nanos> {
        match self {
            TimeBound::At(at) => Some(at),
            _ => None,
        }
    }
}

impl fmt::Display for TimeBound {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TimeBound::Never => f.write_str("never"),
            TimeBound::At(at) => write!(f, "{at}ns"),
            TimeBound::Forever => f.write_str("forever"),
        }
    }
}

/// A relative timeout, converted into a [`TimeBound`] once at sealing time.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeout {
    /// The requirement never applies.
    #[default]
    Never,
    /// The requirement never expires.
    Forever,
    /// The requirement lapses this long after sealing.
    #[serde(rename = "after_ms", with = "serde_millis")]
    After(Duration),
}

impl Timeout {
    pub fn from_millis(ms: u64) -> Self {
        Timeout::After(Duration::from_millis(ms))
    }

    /// Anchors this timeout at `now`. Saturates rather than wrapping for
    /// absurdly long durations.
    pub fn seal(self, now: Nanos) -> TimeBound {
        match self {
            Timeout::Never => TimeBound::Never,
            Timeout::Forever => TimeBound::Forever,
            Timeout::After(d) => TimeBound::At(offset(now, d)),
        }
    }
}

/// Adds `d` to `now`, saturating at `Nanos::MAX`.
pub fn offset(now: Nanos, d: Duration) -> Nanos {
    let d = i64::try_from(d.as_nanos()).unwrap_or(i64::MAX);
    now.saturating_add(d)
}

/// Identifies one lifetime of the dispatcher. Descriptors carry the session
/// that last ran them so an interrupted run can be spotted after a restart.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(pub i64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Serde helper for Duration serialization as whole milliseconds.
pub(crate) mod serde_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        u64::try_from(d.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }

    /// Same as the parent module, for `Option<Duration>` fields.
    pub mod option {
        use std::time::Duration;

        use serde::{Deserialize, Deserializer, Serialize, Serializer};

        pub fn serialize<S>(
            d: &Option<Duration>,
            serializer: S,
        ) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            d.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
                .serialize(serializer)
        }

        pub fn deserialize<'de, D>(
            deserializer: D,
        ) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let ms = Option::<u64>::deserialize(deserializer)?;
            Ok(ms.map(Duration::from_millis))
        }
    }
}
