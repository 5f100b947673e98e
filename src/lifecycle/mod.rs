//! Container lifecycle for a clean build.
//!
//! ```text
//! Idle -> SettingUp -> WaitingForNetwork -> NetworkReady -> Building -> Retrieving -> Done
//!                             \-> (timeout) -> Failed
//! any phase -> (runtime error) -> Failed
//! ```
//!
//! - `phase` - Phase enum, transition function and reported events
//! - `reporter` - Progress sinks
//! - `orchestrator` - Sequential driver over a container runtime

mod orchestrator;
mod phase;
mod reporter;

pub use orchestrator::{BuildRequest, BuildSession, CONTAINER_PROJECT_DIR, Orchestrator};
pub use phase::{Phase, PhaseEvent};
pub use reporter::{LogReporter, ProgressReporter, RecordingReporter};
