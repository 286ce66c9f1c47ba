use crate::domain::model::TriageDecision;
use crate::domain::ports::DispatchNotifier;
use crate::utils::error::Result;
use async_trait::async_trait;
use uuid::Uuid;

const SUMMARY_CHARS: usize = 100;

/// Records the ambulance-dispatch intent in the log. No network integration.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDispatchNotifier;

impl LogDispatchNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DispatchNotifier for LogDispatchNotifier {
    async fn notify(&self, decision: &TriageDecision, correlation_id: Uuid) -> Result<()> {
        let summary: String = decision
            .clinical_reasoning()
            .chars()
            .take(SUMMARY_CHARS)
            .collect();

        tracing::error!(
            target: "triage_flow::dispatch",
            %correlation_id,
            urgency = decision.urgency_level().value(),
            timestamp = %decision.timestamp().to_rfc3339(),
            safety_flag = decision.safety_flag(),
            "🚨 DISPATCH: ambulance requested for {} - {}...",
            decision.urgency_level(),
            summary.replace('\n', " ")
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::arbiter::SafetyArbiter;
    use crate::domain::model::{Assessment, FailureKind};
    use chrono::Utc;

    #[tokio::test]
    async fn test_notify_always_succeeds() {
        let decision =
            SafetyArbiter::new().decide(Assessment::Fallback(FailureKind::Timeout), Utc::now());
        tokio_test::assert_ok!(
            LogDispatchNotifier::new()
                .notify(&decision, Uuid::new_v4())
                .await
        );
    }
}
