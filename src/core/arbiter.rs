use crate::domain::model::{
    Assessment, FailureKind, ParsedAssessment, TriageDecision, UncertaintyScore, UrgencyLevel,
};
use chrono::{DateTime, Utc};

/// Uncertainty above this always requires human review.
pub const REVIEW_UNCERTAINTY_THRESHOLD: f64 = 0.7;

/// Decides the final classification. Every output is either a fully validated model
/// assessment or the maximally cautious fallback; there is no partial path.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafetyArbiter;

impl SafetyArbiter {
    pub fn new() -> Self {
        Self
    }

    pub fn decide(&self, assessment: Assessment, decided_at: DateTime<Utc>) -> TriageDecision {
        match assessment {
            Assessment::ModelAssessed(parsed) => self.model_assessed(parsed, decided_at),
            Assessment::Fallback(kind) => self.fallback(kind, decided_at),
        }
    }

    fn model_assessed(&self, parsed: ParsedAssessment, decided_at: DateTime<Utc>) -> TriageDecision {
        let ParsedAssessment {
            urgency_level,
            reasoning_trace,
            uncertainty_score,
        } = parsed;

        let most_severe = urgency_level.is_most_severe();
        let safety_flag = uncertainty_score.value() > REVIEW_UNCERTAINTY_THRESHOLD || most_severe;

        TriageDecision::new(
            urgency_level,
            reasoning_trace,
            uncertainty_score,
            safety_flag,
            most_severe,
            decided_at,
        )
    }

    fn fallback(&self, kind: FailureKind, decided_at: DateTime<Utc>) -> TriageDecision {
        tracing::error!("🚨 SAFETY FALLBACK ACTIVATED ({}) - defaulting to Level 1", kind);

        TriageDecision::new(
            UrgencyLevel::MOST_SEVERE,
            fallback_message(kind),
            UncertaintyScore::NO_CONFIDENCE,
            true,
            true,
            decided_at,
        )
    }
}

/// Fixed, non-clinical explanation for a fallback decision.
pub fn fallback_message(kind: FailureKind) -> String {
    format!(
        "SYSTEM ERROR - SAFETY FALLBACK ACTIVATED ({})\n\n\
         No clinical assessment was produced: {}.\n\n\
         SAFETY PROTOCOL: this case has been automatically escalated to Level 1 (Emergency) \
         and requires immediate manual review by qualified medical personnel.\n\n\
         ACTION REQUIRED: human clinician assessment is MANDATORY.",
        kind,
        kind.description()
    )
}
