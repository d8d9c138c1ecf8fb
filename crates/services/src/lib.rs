#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod error;
pub mod locks;
pub mod session_service;

pub use quiz_core::Clock;

pub use app_services::QuizServices;
pub use config::ServiceConfig;
pub use error::{ErrorKind, QuizServiceError, QuizServicesError};
pub use locks::{SessionGuard, SessionLocks};
pub use session_service::{NewSession, SessionService};
