pub mod arbiter;
pub mod parser;
pub mod prompt;
pub mod service;

pub use crate::domain::model::{Assessment, AuditRecord, ParsedAssessment, TriageDecision, TriageRequest};
pub use crate::domain::ports::{AuditSink, DispatchNotifier, ReasoningError, ReasoningModel};
pub use crate::utils::error::Result;
