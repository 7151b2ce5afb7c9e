//! Pipeline entry points for monitoring.
//!
//! - `ChangeDetector`: compare a snapshot with stored state
//! - `PollCycle`: one pass over all monitored channels
//! - `Scheduler`: run poll cycles on a timer

pub mod detect;
pub mod poll;
pub mod scheduler;

pub use detect::{ChangeDetector, Detection, detect_changes};
pub use poll::{CycleReport, PollCycle};
pub use scheduler::Scheduler;
