use crate::utils::error::{Result, TriageError};
use crate::utils::sha256_hex;
use crate::utils::validation::Validate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Shortest description (in characters, after trimming) worth sending to the model.
pub const MIN_DESCRIPTION_CHARS: usize = 5;

/// Incoming triage call. `image_reference` is accepted and never processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageRequest {
    #[serde(default, alias = "text_description")]
    pub description: String,
    #[serde(default, alias = "image_url", skip_serializing_if = "Option::is_none")]
    pub image_reference: Option<String>,
}

impl TriageRequest {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            image_reference: None,
        }
    }

    pub fn with_image_reference(mut self, image_reference: impl Into<String>) -> Self {
        self.image_reference = Some(image_reference.into());
        self
    }

    /// SHA-256 of the raw description, recorded in the audit log instead of the text itself.
    pub fn fingerprint(&self) -> String {
        sha256_hex(&self.description)
    }
}

impl Validate for TriageRequest {
    fn validate(&self) -> Result<()> {
        let trimmed = self.description.trim();
        if trimmed.is_empty() {
            return Err(TriageError::validation(
                "Symptom description is required.",
            ));
        }
        if trimmed.chars().count() < MIN_DESCRIPTION_CHARS {
            return Err(TriageError::validation(
                "Symptom description too short. Please provide detailed symptoms.",
            ));
        }
        Ok(())
    }
}

/// Triage urgency, 1 (life-threatening) to 5 (non-urgent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct UrgencyLevel(u8);

impl UrgencyLevel {
    pub const MOST_SEVERE: UrgencyLevel = UrgencyLevel(1);
    pub const LEAST_SEVERE: UrgencyLevel = UrgencyLevel(5);

    pub fn new(value: i64) -> Option<Self> {
        if (1..=5).contains(&value) {
            Some(Self(value as u8))
        } else {
            None
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_most_severe(self) -> bool {
        self == Self::MOST_SEVERE
    }
}

impl TryFrom<u8> for UrgencyLevel {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        Self::new(i64::from(value)).ok_or_else(|| format!("urgency level {} outside 1..=5", value))
    }
}

impl From<UrgencyLevel> for u8 {
    fn from(level: UrgencyLevel) -> Self {
        level.0
    }
}

impl fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Level {}", self.0)
    }
}

/// Model-reported uncertainty: 0.0 is fully confident, 1.0 is no confidence.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct UncertaintyScore(f64);

impl UncertaintyScore {
    pub const NO_CONFIDENCE: UncertaintyScore = UncertaintyScore(1.0);

    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for UncertaintyScore {
    type Error = String;

    fn try_from(value: f64) -> std::result::Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("uncertainty score {} outside 0.0..=1.0", value))
    }
}

impl From<UncertaintyScore> for f64 {
    fn from(score: UncertaintyScore) -> Self {
        score.0
    }
}

/// Rendered reasoning prompt handed to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    text: String,
}

impl Prompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Short hash for trace events; the prompt embeds patient text and is never logged.
    pub fn fingerprint(&self) -> String {
        let mut hash = sha256_hex(&self.text);
        hash.truncate(16);
        hash
    }
}

/// Opaque text returned by the reasoning model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawModelOutput {
    text: String,
}

impl RawModelOutput {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// A fully validated model answer. Only the response parser builds one.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAssessment {
    pub urgency_level: UrgencyLevel,
    pub reasoning_trace: String,
    pub uncertainty_score: UncertaintyScore,
}

/// Why the pipeline could not produce a trustworthy model assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    Timeout,
    TransportError,
    UpstreamError,
    ParseError,
}

impl FailureKind {
    pub fn outcome_tag(self) -> OutcomeTag {
        match self {
            FailureKind::Timeout => OutcomeTag::FallbackTimeout,
            FailureKind::TransportError => OutcomeTag::FallbackTransportError,
            FailureKind::UpstreamError => OutcomeTag::FallbackUpstreamError,
            FailureKind::ParseError => OutcomeTag::FallbackParseError,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            FailureKind::Timeout => "the reasoning service did not answer within the time limit",
            FailureKind::TransportError => "the reasoning service could not be reached",
            FailureKind::UpstreamError => "the reasoning service reported an internal failure",
            FailureKind::ParseError => "the reasoning service returned an unusable answer",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Timeout => "TIMEOUT",
            FailureKind::TransportError => "TRANSPORT ERROR",
            FailureKind::UpstreamError => "UPSTREAM ERROR",
            FailureKind::ParseError => "PARSE ERROR",
        };
        f.write_str(name)
    }
}

/// Input to the safety arbiter: exactly one of two fully populated shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Assessment {
    ModelAssessed(ParsedAssessment),
    Fallback(FailureKind),
}

impl Assessment {
    pub fn outcome_tag(&self) -> OutcomeTag {
        match self {
            Assessment::ModelAssessed(_) => OutcomeTag::ModelAssessed,
            Assessment::Fallback(kind) => kind.outcome_tag(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeTag {
    ModelAssessed,
    FallbackTimeout,
    FallbackParseError,
    FallbackTransportError,
    FallbackUpstreamError,
}

impl OutcomeTag {
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeTag::ModelAssessed => "model-assessed",
            OutcomeTag::FallbackTimeout => "fallback-timeout",
            OutcomeTag::FallbackParseError => "fallback-parse-error",
            OutcomeTag::FallbackTransportError => "fallback-transport-error",
            OutcomeTag::FallbackUpstreamError => "fallback-upstream-error",
        }
    }

    pub fn is_fallback(self) -> bool {
        self != OutcomeTag::ModelAssessed
    }
}

impl fmt::Display for OutcomeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The pipeline's only output. Built by the safety arbiter, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredDecision")]
pub struct TriageDecision {
    urgency_level: UrgencyLevel,
    clinical_reasoning: String,
    uncertainty_score: UncertaintyScore,
    safety_flag: bool,
    dispatch_ambulance: bool,
    timestamp: DateTime<Utc>,
}

impl TriageDecision {
    pub(crate) fn new(
        urgency_level: UrgencyLevel,
        clinical_reasoning: String,
        uncertainty_score: UncertaintyScore,
        safety_flag: bool,
        dispatch_ambulance: bool,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            urgency_level,
            clinical_reasoning,
            uncertainty_score,
            safety_flag,
            dispatch_ambulance,
            timestamp,
        }
    }

    pub fn urgency_level(&self) -> UrgencyLevel {
        self.urgency_level
    }

    pub fn clinical_reasoning(&self) -> &str {
        &self.clinical_reasoning
    }

    pub fn uncertainty_score(&self) -> UncertaintyScore {
        self.uncertainty_score
    }

    pub fn safety_flag(&self) -> bool {
        self.safety_flag
    }

    pub fn dispatch_ambulance(&self) -> bool {
        self.dispatch_ambulance
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

// Wire shape of a decision read back from storage; checked before it becomes a `TriageDecision`.
#[derive(Deserialize)]
struct StoredDecision {
    urgency_level: UrgencyLevel,
    clinical_reasoning: String,
    uncertainty_score: UncertaintyScore,
    safety_flag: bool,
    dispatch_ambulance: bool,
    timestamp: DateTime<Utc>,
}

impl TryFrom<StoredDecision> for TriageDecision {
    type Error = String;

    fn try_from(d: StoredDecision) -> std::result::Result<Self, Self::Error> {
        let most_severe = d.urgency_level.is_most_severe();
        if d.dispatch_ambulance != most_severe {
            return Err(format!(
                "dispatch_ambulance={} contradicts {}",
                d.dispatch_ambulance, d.urgency_level
            ));
        }
        if most_severe && !d.safety_flag {
            return Err(format!("{} decision without safety_flag", d.urgency_level));
        }

        Ok(Self::new(
            d.urgency_level,
            d.clinical_reasoning,
            d.uncertainty_score,
            d.safety_flag,
            d.dispatch_ambulance,
            d.timestamp,
        ))
    }
}

/// One line of the append-only audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub correlation_id: Uuid,
    pub outcome: OutcomeTag,
    pub input_fingerprint: String,
    pub decision: TriageDecision,
    pub recorded_at: DateTime<Utc>,
}
