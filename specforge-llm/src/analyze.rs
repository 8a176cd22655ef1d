//! One-shot architecture review
//!
//! Produces a structured review of a system description in a single call,
//! through fixed analysis lenses (idempotency, responsibility coupling,
//! backpressure, ingestion vs processing, failure modes). The report shape
//! follows the mode: `Short` carries the core sections, `Full` adds coupling,
//! boundary, metrics, and failure-injection sections.

use crate::oneshot::invalid;
use crate::prompts::{analyze_prompt, SYSTEM_REVIEW_PROMPT};
use crate::{DesignModel, SpecMode};
use serde::{Deserialize, Serialize};
use specforge_core::SpecForgeResult;

/// Core review sections, produced in `Short` mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShortReport {
    pub architecture_summary: String,
    pub assumptions_detected: Vec<String>,
    pub idempotency_risks: Vec<String>,
    pub backpressure_analysis: Vec<String>,
    pub failure_scenarios: Vec<String>,
    pub concrete_fixes: Vec<String>,
}

/// Full review, produced in `Full` mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Report {
    pub architecture_summary: String,
    pub assumptions_detected: Vec<String>,
    pub idempotency_risks: Vec<String>,
    pub responsibility_coupling: Vec<String>,
    pub backpressure_analysis: Vec<String>,
    pub ingestion_vs_processing: Vec<String>,
    pub failure_scenarios: Vec<String>,
    pub concrete_fixes: Vec<String>,
    pub suggested_metrics: Vec<String>,
    pub failure_injection_tests: Vec<String>,
}

/// Mode-dependent report payload.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisReport {
    Short(ShortReport),
    Full(Report),
}

impl AnalysisReport {
    pub fn architecture_summary(&self) -> &str {
        match self {
            AnalysisReport::Short(report) => &report.architecture_summary,
            AnalysisReport::Full(report) => &report.architecture_summary,
        }
    }

    pub fn concrete_fixes(&self) -> &[String] {
        match self {
            AnalysisReport::Short(report) => &report.concrete_fixes,
            AnalysisReport::Full(report) => &report.concrete_fixes,
        }
    }
}

/// A validated report plus the raw model text it was parsed from.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub report: AnalysisReport,
    pub raw: String,
}

/// Review a system description and return the structured report.
pub async fn analyze_system(
    model: &dyn DesignModel,
    description: &str,
    mode: SpecMode,
) -> SpecForgeResult<AnalysisResult> {
    let raw = model
        .complete(SYSTEM_REVIEW_PROMPT, &analyze_prompt(description, mode))
        .await?;
    if raw.trim().is_empty() {
        return Err(invalid("No text content in model response".to_string()));
    }
    let report = match mode {
        SpecMode::Short => serde_json::from_str::<ShortReport>(&raw).map(AnalysisReport::Short),
        SpecMode::Full => serde_json::from_str::<Report>(&raw).map(AnalysisReport::Full),
    }
    .map_err(|e| invalid(format!("Report parse failed: {}", e)))?;
    if report.architecture_summary().trim().is_empty() {
        return Err(invalid(
            "Report has an empty architecture_summary".to_string(),
        ));
    }
    Ok(AnalysisResult { report, raw })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use specforge_core::{LlmError, SpecForgeError};

    struct FixedModel {
        reply: String,
    }

    #[async_trait]
    impl DesignModel for FixedModel {
        async fn complete(&self, _system: &str, _user: &str) -> SpecForgeResult<String> {
            Ok(self.reply.clone())
        }
    }

    fn short_report_json() -> serde_json::Value {
        json!({
            "architecture_summary": "Single-writer ingest behind a queue.",
            "assumptions_detected": ["at-least-once delivery"],
            "idempotency_risks": ["webhook retries double-write orders"],
            "backpressure_analysis": ["queue is unbounded"],
            "failure_scenarios": ["consumer crash loses offsets"],
            "concrete_fixes": ["dedupe on order id at the DB write"]
        })
    }

    #[tokio::test]
    async fn test_analyze_short_parses_report() {
        let model = FixedModel {
            reply: short_report_json().to_string(),
        };
        let result = analyze_system(&model, "an order pipeline", SpecMode::Short)
            .await
            .unwrap();
        assert_eq!(
            result.report.architecture_summary(),
            "Single-writer ingest behind a queue."
        );
        assert_eq!(
            result.report.concrete_fixes(),
            ["dedupe on order id at the DB write"]
        );
    }

    #[tokio::test]
    async fn test_analyze_full_rejects_short_shaped_report() {
        // Full mode requires the extended sections.
        let model = FixedModel {
            reply: short_report_json().to_string(),
        };
        let err = analyze_system(&model, "an order pipeline", SpecMode::Full)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SpecForgeError::Llm(LlmError::InvalidResponse { .. })
        ));
    }

    #[tokio::test]
    async fn test_analyze_rejects_unknown_report_key() {
        let mut value = short_report_json();
        value["extra_section"] = json!(["surprise"]);
        let model = FixedModel {
            reply: value.to_string(),
        };
        let err = analyze_system(&model, "x", SpecMode::Short)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SpecForgeError::Llm(LlmError::InvalidResponse { .. })
        ));
    }

    #[tokio::test]
    async fn test_analyze_rejects_empty_summary() {
        let mut value = short_report_json();
        value["architecture_summary"] = json!("   ");
        let model = FixedModel {
            reply: value.to_string(),
        };
        let err = analyze_system(&model, "x", SpecMode::Short)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SpecForgeError::Llm(LlmError::InvalidResponse { .. })
        ));
    }
}
