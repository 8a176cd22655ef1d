//! One-shot SystemSpec generation
//!
//! Unlike the turn-based session, these produce a whole document in a single
//! call: `extract_spec` from a description of an existing system,
//! `propose_spec` from goals and constraints. The result is schema-validated
//! before it is returned.

use crate::prompts::{extract_prompt, propose_prompt, SYSTEM_SPEC_PROMPT};
use crate::DesignModel;
use specforge_core::{LlmError, SpecForgeError, SpecForgeResult, SystemSpec};

/// Output size discipline for one-shot generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecMode {
    /// Tight lists, omission over verbosity.
    Short,
    /// Fuller lists, still one sentence per item.
    Full,
}

impl SpecMode {
    pub fn size_constraints(self) -> &'static str {
        match self {
            SpecMode::Short => {
                "- Keep each list to max 3 items.\n\
                 - Keep each item to one short sentence.\n\
                 - Prefer omission over verbosity; use null for unknown optional fields."
            }
            SpecMode::Full => {
                "- Keep each list to max 8 items.\n\
                 - Keep each item to one short sentence.\n\
                 - Prefer concise, factual entries."
            }
        }
    }
}

/// A generated document plus the raw model text it was parsed from.
#[derive(Debug, Clone)]
pub struct SpecResult {
    pub spec: SystemSpec,
    pub raw: String,
}

pub(crate) fn invalid(reason: String) -> SpecForgeError {
    SpecForgeError::Llm(LlmError::InvalidResponse {
        provider: "design-model".to_string(),
        reason,
    })
}

async fn run_spec_prompt(model: &dyn DesignModel, prompt: String) -> SpecForgeResult<SpecResult> {
    let raw = model.complete(SYSTEM_SPEC_PROMPT, &prompt).await?;
    if raw.trim().is_empty() {
        return Err(invalid("No text content in model response".to_string()));
    }
    let spec: SystemSpec = serde_json::from_str(&raw)
        .map_err(|e| invalid(format!("SystemSpec parse failed: {}", e)))?;
    spec.validate()
        .map_err(|e| invalid(format!("SystemSpec validation failed: {}", e)))?;
    Ok(SpecResult { spec, raw })
}

/// Extract a SystemSpec from an existing system description.
pub async fn extract_spec(
    model: &dyn DesignModel,
    description: &str,
    mode: SpecMode,
) -> SpecForgeResult<SpecResult> {
    run_spec_prompt(model, extract_prompt(description, mode)).await
}

/// Propose a SystemSpec from a goals/constraints description.
pub async fn propose_spec(
    model: &dyn DesignModel,
    description: &str,
    mode: SpecMode,
) -> SpecForgeResult<SpecResult> {
    run_spec_prompt(model, propose_prompt(description, mode)).await
}

// =============================================================================
// TESTS
// =============================================================================
