pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{GeminiClient, JsonlAuditSink, LogDispatchNotifier};
pub use config::AppConfig;
pub use core::service::TriageService;
pub use domain::model::{TriageDecision, TriageRequest};
pub use utils::error::{Result, TriageError};
