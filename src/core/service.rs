use crate::core::arbiter::SafetyArbiter;
use crate::core::parser::ResponseParser;
use crate::core::prompt::PromptBuilder;
use crate::domain::model::{
    Assessment, AuditRecord, FailureKind, Prompt, RawModelOutput, TriageDecision, TriageRequest,
};
use crate::domain::ports::{AuditSink, DispatchNotifier, ReasoningError, ReasoningModel};
use crate::utils::error::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::task::TaskTracker;
use uuid::Uuid;

pub const DEFAULT_REASONING_TIMEOUT: Duration = Duration::from_secs(8);

/// Runs one triage request end to end:
/// validate → prompt → reason → parse → arbitrate → audit → dispatch.
///
/// Holds no per-request state; share it behind an `Arc` across concurrent requests.
pub struct TriageService<A: AuditSink> {
    model: Arc<dyn ReasoningModel>,
    audit: Arc<A>,
    notifier: Arc<dyn DispatchNotifier>,
    prompts: PromptBuilder,
    parser: ResponseParser,
    arbiter: SafetyArbiter,
    timeout: Duration,
    reformat_on_parse_error: bool,
    notifications: TaskTracker,
}

impl<A: AuditSink + 'static> TriageService<A> {
    pub fn new(
        model: impl ReasoningModel + 'static,
        audit: A,
        notifier: impl DispatchNotifier + 'static,
    ) -> Self {
        Self {
            model: Arc::new(model),
            audit: Arc::new(audit),
            notifier: Arc::new(notifier),
            prompts: PromptBuilder::new(),
            parser: ResponseParser::new(),
            arbiter: SafetyArbiter::new(),
            timeout: DEFAULT_REASONING_TIMEOUT,
            reformat_on_parse_error: false,
            notifications: TaskTracker::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// One extra "restate as strict JSON" call when the first answer cannot be parsed.
    pub fn with_reformat_on_parse_error(mut self, enabled: bool) -> Self {
        self.reformat_on_parse_error = enabled;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Waits for dispatch notifications still in flight. Called on shutdown.
    pub async fn drain(&self) {
        self.notifications.close();
        self.notifications.wait().await;
        self.notifications.reopen();
    }

    /// Returns a decision for every valid request. The only error is a validation
    /// failure, raised before the model is called and never audited.
    pub async fn assess(&self, request: TriageRequest) -> Result<TriageDecision> {
        let prompt = self.prompts.build(&request)?;

        let correlation_id = Uuid::new_v4();
        tracing::info!(
            %correlation_id,
            "Received triage request: {} chars",
            request.description.len()
        );

        let assessment = self.reason(&prompt, correlation_id).await;
        let outcome = assessment.outcome_tag();
        let decision = self.arbiter.decide(assessment, Utc::now());

        let record = AuditRecord {
            correlation_id,
            outcome,
            input_fingerprint: request.fingerprint(),
            decision: decision.clone(),
            recorded_at: Utc::now(),
        };
        self.record(&record).await;

        if decision.dispatch_ambulance() {
            self.dispatch(&decision, correlation_id);
        }

        tracing::info!(
            %correlation_id,
            outcome = %outcome,
            "✅ Triage completed: {}, uncertainty {:.2}, safety_flag {}, dispatch {}",
            decision.urgency_level(),
            decision.uncertainty_score().value(),
            decision.safety_flag(),
            decision.dispatch_ambulance()
        );

        Ok(decision)
    }

    async fn reason(&self, prompt: &Prompt, correlation_id: Uuid) -> Assessment {
        let raw = match self.invoke(prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(%correlation_id, "Reasoning call failed: {}", e);
                return Assessment::Fallback(e.kind());
            }
        };

        match self.parser.parse(&raw) {
            Ok(parsed) => Assessment::ModelAssessed(parsed),
            Err(e) if self.reformat_on_parse_error => {
                tracing::warn!(%correlation_id, "Initial parse failed ({}), requesting reformat", e);
                self.reformat(&raw, correlation_id).await
            }
            Err(e) => {
                tracing::warn!(%correlation_id, "Model output rejected: {}", e);
                Assessment::Fallback(FailureKind::ParseError)
            }
        }
    }

    async fn reformat(&self, previous: &RawModelOutput, correlation_id: Uuid) -> Assessment {
        let prompt = self.prompts.build_reformat(previous);

        match self.invoke(&prompt).await {
            Ok(raw) => match self.parser.parse(&raw) {
                Ok(parsed) => {
                    tracing::info!(%correlation_id, "Reformat succeeded");
                    Assessment::ModelAssessed(parsed)
                }
                Err(e) => {
                    tracing::warn!(%correlation_id, "Reformatted output also rejected: {}", e);
                    Assessment::Fallback(FailureKind::ParseError)
                }
            },
            Err(e) => {
                tracing::warn!(%correlation_id, "Reformat call failed: {}", e);
                Assessment::Fallback(e.kind())
            }
        }
    }

    async fn invoke(&self, prompt: &Prompt) -> std::result::Result<RawModelOutput, ReasoningError> {
        let prompt_hash = prompt.fingerprint();
        let started = Instant::now();
        tracing::debug!(%prompt_hash, "Reasoning call started");

        let result = match tokio::time::timeout(self.timeout, self.model.generate(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(ReasoningError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        };

        tracing::debug!(
            %prompt_hash,
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "Reasoning call finished"
        );
        result
    }

    async fn record(&self, record: &AuditRecord) {
        if let Err(e) = self.audit.append(record).await {
            tracing::error!(
                correlation_id = %record.correlation_id,
                outcome = %record.outcome,
                "❌ Audit write failed: {}",
                e
            );
        }
    }

    // Fire-and-forget: the decision is already final.
    fn dispatch(&self, decision: &TriageDecision, correlation_id: Uuid) {
        let notifier = Arc::clone(&self.notifier);
        let decision = decision.clone();

        self.notifications.spawn(async move {
            if let Err(e) = notifier.notify(&decision, correlation_id).await {
                tracing::error!(
                    target: "triage_flow::dispatch",
                    %correlation_id,
                    "❌ Dispatch notification failed: {}",
                    e
                );
            }
        });
    }
}
