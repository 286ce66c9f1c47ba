use crate::domain::model::{AuditRecord, FailureKind, Prompt, RawModelOutput, TriageDecision};
use crate::utils::error::Result;
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Classified failure of a reasoning call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReasoningError {
    #[error("reasoning call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("upstream model error: {0}")]
    Upstream(String),
}

impl ReasoningError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ReasoningError::Timeout { .. } => FailureKind::Timeout,
            ReasoningError::Transport(_) => FailureKind::TransportError,
            ReasoningError::Upstream(_) => FailureKind::UpstreamError,
        }
    }
}

/// The external reasoning model: prompt in, raw text or a typed failure out.
/// Implementations never retry.
#[async_trait]
pub trait ReasoningModel: Send + Sync {
    async fn generate(&self, prompt: &Prompt) -> std::result::Result<RawModelOutput, ReasoningError>;
}

pub trait AuditSink: Send + Sync {
    /// Appends one whole record. A record is either fully written or not at all.
    fn append(&self, record: &AuditRecord) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[async_trait]
pub trait DispatchNotifier: Send + Sync {
    async fn notify(&self, decision: &TriageDecision, correlation_id: Uuid) -> Result<()>;
}
