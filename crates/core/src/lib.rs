#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod progress;
pub mod time;

pub use error::Error;
pub use progress::{GroupProgress, GroupStatus, ProgressReport, StitchSlot, compute_progress};
pub use time::Clock;
