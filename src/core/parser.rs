use crate::domain::model::{ParsedAssessment, RawModelOutput, UncertaintyScore, UrgencyLevel};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use thiserror::Error;

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:[A-Za-z]+)?\s*(\{.*?\})\s*```").expect("fenced JSON pattern is valid")
});

// "1. text", "1) text", "Step 1: text"
static NUMBERED_STEP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:step\s+)?\d+[.):]\s+(.+?)\s*$").expect("numbered step pattern is valid")
});

const REASONING_TEXT_KEYS: [&str; 3] = ["reasoning", "reasoning_trace", "clinical_reasoning"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no JSON object found in model output")]
    NoJsonObject,
    #[error("model output is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("urgency_level {0} is not an integer between 1 and 5")]
    InvalidUrgencyLevel(String),
    #[error("uncertainty_score {0} is not a number between 0.0 and 1.0")]
    InvalidUncertainty(String),
    #[error("reasoning trace is empty")]
    EmptyReasoning,
}

/// Turns raw model text into a validated assessment, or a parse error. Never fills in defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseParser;

impl ResponseParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, raw: &RawModelOutput) -> Result<ParsedAssessment, ParseError> {
        let text = raw.as_str();
        tracing::debug!("Parsing model output ({} chars)", text.len());

        let object = locate_object(text)?;

        let urgency_level = parse_urgency(object.get("urgency_level"))?;
        let uncertainty_score = parse_uncertainty(object.get("uncertainty_score"))?;

        let mut steps = reasoning_from_object(&object);
        if steps.is_empty() {
            tracing::warn!("reasoning_steps missing, recovering numbered steps from raw text");
            steps = extract_numbered_steps(text);
        }
        if steps.is_empty() {
            return Err(ParseError::EmptyReasoning);
        }

        let red_flags = string_list(object.get("red_flags"));
        let recommended_action = object
            .get("recommended_action")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty());

        Ok(ParsedAssessment {
            urgency_level,
            reasoning_trace: render_trace(&steps, &red_flags, recommended_action),
            uncertainty_score,
        })
    }
}

fn locate_object(text: &str) -> Result<Map<String, Value>, ParseError> {
    let candidate = match FENCED_JSON.captures(text).and_then(|caps| caps.get(1)) {
        Some(m) => m.as_str(),
        None => {
            let start = text.find('{').ok_or(ParseError::NoJsonObject)?;
            let end = text.rfind('}').ok_or(ParseError::NoJsonObject)?;
            if end < start {
                return Err(ParseError::NoJsonObject);
            }
            &text[start..=end]
        }
    };

    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ParseError::NoJsonObject),
        Err(e) => Err(ParseError::InvalidJson(e.to_string())),
    }
}

fn parse_urgency(value: Option<&Value>) -> Result<UrgencyLevel, ParseError> {
    let value = value.ok_or(ParseError::MissingField("urgency_level"))?;

    let number = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    number
        .and_then(UrgencyLevel::new)
        .ok_or_else(|| ParseError::InvalidUrgencyLevel(value.to_string()))
}

fn parse_uncertainty(value: Option<&Value>) -> Result<UncertaintyScore, ParseError> {
    let value = value.ok_or(ParseError::MissingField("uncertainty_score"))?;

    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    number
        .and_then(UncertaintyScore::new)
        .ok_or_else(|| ParseError::InvalidUncertainty(value.to_string()))
}

fn reasoning_from_object(object: &Map<String, Value>) -> Vec<String> {
    let steps = match object.get("reasoning_steps") {
        Some(Value::String(s)) => non_empty(s).into_iter().collect(),
        other => string_list(other),
    };
    if !steps.is_empty() {
        return steps;
    }

    REASONING_TEXT_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str).and_then(non_empty))
        .into_iter()
        .collect()
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter_map(non_empty)
            .collect(),
        _ => Vec::new(),
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Recovers a numbered list ("1. ...", "1) ...", "Step 1: ...") from free text, one step per line.
pub fn extract_numbered_steps(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| NUMBERED_STEP.captures(line))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

fn render_trace(steps: &[String], red_flags: &[String], recommended_action: Option<&str>) -> String {
    let mut trace = String::from("CHAIN-OF-THOUGHT ANALYSIS:\n\n");
    for (i, step) in steps.iter().enumerate() {
        trace.push_str(&format!("{}. {}\n", i + 1, step));
    }

    let flags = if red_flags.is_empty() {
        "None".to_string()
    } else {
        red_flags.join(", ")
    };
    trace.push_str(&format!("\nRED FLAGS IDENTIFIED: {}\n", flags));

    if let Some(action) = recommended_action {
        trace.push_str(&format!("\nRECOMMENDED ACTION: {}\n", action));
    }

    trace
}
