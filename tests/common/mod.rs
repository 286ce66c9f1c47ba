#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use triage_flow::domain::model::{AuditRecord, Prompt, RawModelOutput, TriageDecision};
use triage_flow::domain::ports::{AuditSink, DispatchNotifier, ReasoningError, ReasoningModel};
use triage_flow::{Result, TriageError};
use uuid::Uuid;

pub fn model_json(level: &str, uncertainty: f64) -> String {
    format!(
        r#"```json
{{
    "reasoning_steps": ["Step 1: Review symptoms", "Step 2: Assess airway and circulation"],
    "urgency_level": {},
    "uncertainty_score": {},
    "red_flags": [],
    "recommended_action": "Follow protocol"
}}
```"#,
        level, uncertainty
    )
}

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(ReasoningError),
    Delay(Duration, String),
}

/// Scripted reasoning model. Replies are consumed in order; the last one repeats.
#[derive(Clone)]
pub struct StubModel {
    replies: Arc<Vec<Reply>>,
    calls: Arc<AtomicUsize>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl StubModel {
    fn from_replies(replies: Vec<Reply>) -> Self {
        Self {
            replies: Arc::new(replies),
            calls: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn replying(text: impl Into<String>) -> Self {
        Self::from_replies(vec![Reply::Text(text.into())])
    }

    pub fn failing(error: ReasoningError) -> Self {
        Self::from_replies(vec![Reply::Fail(error)])
    }

    pub fn delayed(delay: Duration, text: impl Into<String>) -> Self {
        Self::from_replies(vec![Reply::Delay(delay, text.into())])
    }

    pub fn sequence(texts: &[&str]) -> Self {
        Self::from_replies(texts.iter().map(|t| Reply::Text(t.to_string())).collect())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReasoningModel for StubModel {
    async fn generate(&self, prompt: &Prompt) -> std::result::Result<RawModelOutput, ReasoningError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.as_str().to_string());

        let reply = self.replies[n.min(self.replies.len() - 1)].clone();
        match reply {
            Reply::Text(text) => Ok(RawModelOutput::new(text)),
            Reply::Fail(e) => Err(e),
            Reply::Delay(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(RawModelOutput::new(text))
            }
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryAuditSink {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl MemoryAuditSink {
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl AuditSink for MemoryAuditSink {
    async fn append(&self, record: &AuditRecord) -> Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

pub struct FailingAuditSink;

impl AuditSink for FailingAuditSink {
    async fn append(&self, _record: &AuditRecord) -> Result<()> {
        Err(TriageError::IoError(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        )))
    }
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(Uuid, TriageDecision)>>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(Uuid, TriageDecision)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl DispatchNotifier for RecordingNotifier {
    async fn notify(&self, decision: &TriageDecision, correlation_id: Uuid) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((correlation_id, decision.clone()));
        Ok(())
    }
}

/// Notifier whose every call fails, counting the attempts.
#[derive(Clone, Default)]
pub struct FailingNotifier {
    attempts: Arc<AtomicUsize>,
}

impl FailingNotifier {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DispatchNotifier for FailingNotifier {
    async fn notify(&self, _decision: &TriageDecision, _correlation_id: Uuid) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(TriageError::IoError(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "dispatch centre unreachable",
        )))
    }
}
