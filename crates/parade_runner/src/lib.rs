//! The coordinator: finds test files, runs a worker per file and merges what
//! the workers report into a single [`parade_protocol::RunEvent`] stream.

mod discovery;
mod launcher;
mod orchestration;
mod tally;

pub use discovery::{DiscoveryError, GlobDiscovery};
pub use launcher::{LaunchError, ProcessLauncher};
pub use orchestration::{EventSink, run_coordinator};
