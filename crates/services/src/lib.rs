#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod sessions;

pub use stitch_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, ErrorKind, SessionError};
pub use sessions::{ActiveSessionItem, WorkSessionService, WorkSessionView};
