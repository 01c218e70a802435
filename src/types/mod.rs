pub mod connectivity;
pub mod job;
pub mod retry;
pub mod states;
pub mod status;
pub mod time;
