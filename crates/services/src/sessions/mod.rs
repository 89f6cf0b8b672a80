mod service;
mod view;

// Public API of the work session subsystem.
pub use crate::error::SessionError;
pub use service::WorkSessionService;
pub use view::{ActiveSessionItem, WorkSessionView};
