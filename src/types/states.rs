use serde::Serialize;

/// Coarse lifecycle position of a descriptor as far as its own flags can
/// tell. Whether it is queued or running is the dispatcher's business.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JobState {
    Pending,
    Cancelled { single_id: bool },
    Successful,
}

// This impl is used to allow JobState to be reported in YAML.
impl Serialize for JobState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use JobState::*;

        serializer.serialize_str(match self {
            Pending => "pending",
            Cancelled { single_id: false } => "cancelled",
            Cancelled { single_id: true } => "cancelled-single-id",
            Successful => "successful",
        })
    }
}
