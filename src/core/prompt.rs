use crate::domain::model::{Prompt, RawModelOutput, TriageRequest};
use crate::utils::error::Result;
use crate::utils::validation::Validate;

const TRIAGE_INSTRUCTION: &str = r#"You are an expert medical triage assistant for a rural healthcare clinic. Perform a systematic triage assessment using step-by-step (chain-of-thought) reasoning.

CRITICAL INSTRUCTIONS:
1. Reason step by step before assigning an urgency level: identify the key symptoms, assess severity indicators, consider the differential diagnoses, then evaluate time sensitivity.
2. If the symptoms are ambiguous or insufficient, report high uncertainty.
3. Always err on the side of caution for patient safety.

URGENCY LEVELS:
- Level 1: Life-threatening (cardiac arrest, severe trauma, stroke symptoms, difficulty breathing, severe bleeding)
- Level 2: Emergency (chest pain, severe pain, high fever with altered mental status)
- Level 3: Urgent (moderate pain, fever, vomiting, minor injuries)
- Level 4: Semi-urgent (mild symptoms, chronic conditions)
- Level 5: Non-urgent (routine care, minor ailments)

UNCERTAINTY:
Report uncertainty_score as a number between 0.0 (fully confident) and 1.0 (no confidence)."#;

const RESPONSE_FORMAT: &str = r#"RESPONSE FORMAT:
Answer with a single JSON object and nothing else, shaped exactly like this:
{
  "reasoning_steps": [
    "Step 1: Identify key symptoms...",
    "Step 2: Assess severity indicators...",
    "Step 3: Consider differential diagnoses...",
    "Step 4: Evaluate time sensitivity..."
  ],
  "urgency_level": <integer 1-5>,
  "uncertainty_score": <number 0.0-1.0>,
  "red_flags": ["any concerning symptoms"],
  "recommended_action": "brief action summary"
}"#;

/// Renders reasoning prompts. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Builds the triage prompt. Invalid requests are rejected here, before any model call.
    pub fn build(&self, request: &TriageRequest) -> Result<Prompt> {
        request.validate()?;

        Ok(Prompt::new(format!(
            "{}\n\n{}\n\nINPUT: Patient describes: {}\n\nYOUR ANALYSIS:",
            TRIAGE_INSTRUCTION,
            RESPONSE_FORMAT,
            request.description.trim()
        )))
    }

    /// Asks the model to restate an unparseable answer as strict JSON.
    pub fn build_reformat(&self, previous: &RawModelOutput) -> Prompt {
        Prompt::new(format!(
            "The previous response was not valid JSON in the required shape.\n\
             Reformat the exact same medical analysis as strict JSON. Do not change the assessment.\n\n\
             {}\n\nPrevious response to reformat:\n{}",
            RESPONSE_FORMAT,
            previous.as_str()
        ))
    }
}
