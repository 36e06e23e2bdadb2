pub mod poll_coordinator;

pub use poll_coordinator::{PollConfig, PollCoordinator, TIMEOUT_REASON};
