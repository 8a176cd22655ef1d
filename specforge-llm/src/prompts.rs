//! Prompt templates for the design session and one-shot spec generation
//!
//! The session serializes the document and last error to canonical compact
//! JSON before templating, so identical states always produce identical
//! prompts.

use crate::SpecMode;

/// System prompt for the turn-based design session.
pub const SYSTEM_DESIGN_PROMPT: &str = "\
You are a senior distributed systems architect.

Run a strict design session to iteratively build a SystemSpec.
Return only one action per turn: ask, patch, or complete.
Do not rewrite the full spec; use incremental patch operations only.
";

/// System prompt for the one-shot architecture review.
pub const SYSTEM_REVIEW_PROMPT: &str = "\
You are a senior distributed systems architect.

You review system designs using these lenses:
1) Idempotency and duplicate handling
2) Separation of responsibilities
3) Backpressure and flow control
4) Ingestion vs processing boundaries
5) Failure modes and recovery

Be concrete. Avoid vague advice.
";

/// System prompt for one-shot SystemSpec generation.
pub const SYSTEM_SPEC_PROMPT: &str = "\
You are a senior distributed systems architect producing SystemSpec v1 JSON.

Be explicit and concise.
";

const DESIGN_PROTOCOL_RULES: &str = r#"Return ONLY valid, compact JSON (no markdown, no explanations, no trailing text).

Protocol rules (MUST follow):
- Choose exactly one action: "ask", "patch", or "complete".
- If action="ask": include only "ask" payload.
- If action="patch": include only "patch" payload as JSON Pointer ops.
- If action="complete": include only "complete" payload.
- Never propose replacing the whole document.
- Never target root path "" or "/".
- Never modify /schema_version.
- Output MUST be a single compact JSON object.

Response schema (all keys allowed below only):
{
  "action": "ask"|"patch"|"complete",
  "ask"?: {
    "question": string,
    "needed_for": string[],
    "assumptions_if_unknown": string[]
  },
  "patch"?: [
    {"op":"set"|"merge"|"append"|"remove","path":string,"value"?:any}
  ],
  "complete"?: {
    "reason": string,
    "assumptions": string[],
    "remaining_unknowns": string[]
  },
  "notes"?: string[]
}"#;

/// Target document schema, shown verbatim to the model.
pub const SYSTEM_SPEC_SCHEMA: &str = r#"{
  "schema_version": "specforge.systemspec.v1",
  "system": {"name": string, "domain": string|null, "goals": string[], "non_goals": string[]},
  "components": [{"id": string, "type": string, "name": string, "responsibilities": string[], "depends_on": string[], "runtime": {"kind": string, "platform": string|null}|null, "scaling": {"min": number|null, "max": number|null, "strategy": string|null}|null}],
  "links": [{"id": string, "from_id": string, "to_id": string, "transport": {"kind": string, "name": string, "format": string|null}, "semantics": string[], "delivery": string|null, "ordering": string|null, "key": string|null, "backpressure": string|null}],
  "data_stores": [{"id": string, "type": string, "ownership": string, "notes": string[], "retention": string|null}],
  "contracts": [{"id": string, "name": string, "owner_component_id": string, "schema": object, "evolution": string|null}],
  "deploy": {"orchestration": string|null, "regions": string[], "observability": string[], "notes": string[]},
  "requirements": {"slos": string[], "constraints": string[], "throughput_targets": string[], "latency_budgets": string[]},
  "open_questions": string[],
  "extensions": object
}"#;

/// Review-report schema for `SpecMode::Short`.
pub const SHORT_REPORT_SCHEMA: &str = r#"{
  "architecture_summary": string,
  "assumptions_detected": string[],
  "idempotency_risks": string[],
  "backpressure_analysis": string[],
  "failure_scenarios": string[],
  "concrete_fixes": string[]
}"#;

/// Review-report schema for `SpecMode::Full`.
pub const FULL_REPORT_SCHEMA: &str = r#"{
  "architecture_summary": string,
  "assumptions_detected": string[],
  "idempotency_risks": string[],
  "responsibility_coupling": string[],
  "backpressure_analysis": string[],
  "ingestion_vs_processing": string[],
  "failure_scenarios": string[],
  "concrete_fixes": string[],
  "suggested_metrics": string[],
  "failure_injection_tests": string[]
}"#;

fn report_schema(mode: SpecMode) -> &'static str {
    match mode {
        SpecMode::Short => SHORT_REPORT_SCHEMA,
        SpecMode::Full => FULL_REPORT_SCHEMA,
    }
}

fn report_size_constraints(mode: SpecMode) -> &'static str {
    match mode {
        SpecMode::Short => {
            "- arrays: max 3 items each\n\
             - each item: ONE sentence, max 120 characters\n\
             - Avoid repetition across sections."
        }
        SpecMode::Full => {
            "- arrays: max 4 items each\n\
             - each item: ONE sentence, max 120 characters\n\
             - suggested_metrics: max 6 items\n\
             - failure_injection_tests: max 2 items\n\
             - Avoid repetition across sections."
        }
    }
}

/// Build the one-shot architecture-review prompt.
pub fn analyze_prompt(description: &str, mode: SpecMode) -> String {
    format!(
        "Return ONLY valid, compact JSON (no markdown, no explanations, no trailing text).\n\n\
         Required schema (all keys required):\n{schema}\n\n\
         Hard rules (MUST follow):\n\
         - Output MUST be valid JSON only (no code fences, no markdown, no commentary).\n\
         - Output MUST be a single JSON object.\n\
         - Use COMPACT JSON: no pretty-printing, no extra whitespace, no newlines.\n\
         - Do NOT include newline characters inside any JSON string.\n\n\
         Size constraints (MUST follow):\n{constraints}\n\n\
         Quality constraints:\n\
         - Be concrete: name boundaries (e.g., \"WebSocket handler\", \"DB write\", \"alert webhook\").\n\
         - If something is unknown, add it to assumptions_detected (do not invent facts).\n\n\
         System description:\n{description}\n",
        schema = report_schema(mode),
        constraints = report_size_constraints(mode),
        description = description,
    )
}

/// Build the per-turn design-session user prompt. `spec_json` and
/// `last_error_json` are pre-serialized canonical JSON (`"null"` when no
/// error is held).
pub fn design_prompt(spec_json: &str, user_message: &str, last_error_json: &str) -> String {
    format!(
        "{rules}\n\nCurrent SystemSpec JSON:\n{spec}\n\nUser message:\n{message}\n\nLast error JSON (if any):\n{error}\n",
        rules = DESIGN_PROTOCOL_RULES,
        spec = spec_json,
        message = user_message,
        error = last_error_json,
    )
}

/// Build the one-shot extraction prompt: pull a SystemSpec out of an existing
/// system description without inventing details.
pub fn extract_prompt(description: &str, mode: SpecMode) -> String {
    format!(
        "Return ONLY valid, compact JSON (single object, no markdown, no newlines).\n\n\
         Target schema (all keys required):\n{schema}\n\n\
         Task:\n\
         - Extract a SystemSpec from the implementation/system description below.\n\
         - MUST NOT invent unknown details.\n\
         - If an optional semantic detail is unknown, use the literal string \"unknown\" where appropriate.\n\
         - Add unknowns and ambiguities to open_questions.\n\n\
         Hard rules:\n\
         - Output must be valid JSON only.\n\
         - Output must be a single JSON object.\n\
         - Use compact JSON.\n\
         - schema_version must be \"specforge.systemspec.v1\".\n\n\
         Size constraints:\n{constraints}\n\n\
         Input description:\n{description}\n",
        schema = SYSTEM_SPEC_SCHEMA,
        constraints = mode.size_constraints(),
        description = description,
    )
}

/// Build the one-shot proposal prompt: design a SystemSpec from goals and
/// constraints, defaults allowed.
pub fn propose_prompt(description: &str, mode: SpecMode) -> String {
    format!(
        "Return ONLY valid, compact JSON (single object, no markdown, no newlines).\n\n\
         Target schema (all keys required):\n{schema}\n\n\
         Task:\n\
         - Propose a SystemSpec from the goals/constraints description below.\n\
         - You may propose reasonable defaults when unspecified.\n\
         - List assumptions explicitly in extensions.assumptions.\n\
         - Add unresolved items to open_questions.\n\n\
         Hard rules:\n\
         - Output must be valid JSON only.\n\
         - Output must be a single JSON object.\n\
         - Use compact JSON.\n\
         - schema_version must be \"specforge.systemspec.v1\".\n\n\
         Size constraints:\n{constraints}\n\n\
         Input description:\n{description}\n",
        schema = SYSTEM_SPEC_SCHEMA,
        constraints = mode.size_constraints(),
        description = description,
    )
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_design_prompt_embeds_all_parts() {
        let prompt = design_prompt("{\"a\":1}", "add a cache", "null");
        assert!(prompt.contains("Current SystemSpec JSON:\n{\"a\":1}"));
        assert!(prompt.contains("User message:\nadd a cache"));
        assert!(prompt.contains("Last error JSON (if any):\nnull"));
        assert!(prompt.contains("Never modify /schema_version."));
    }

    #[test]
    fn test_oneshot_prompts_carry_schema_and_constraints() {
        for builder in [extract_prompt, propose_prompt] {
            let prompt = builder("an order pipeline", SpecMode::Short);
            assert!(prompt.contains("specforge.systemspec.v1"));
            assert!(prompt.contains("max 3 items"));
            assert!(prompt.contains("an order pipeline"));
        }
        let full = extract_prompt("x", SpecMode::Full);
        assert!(full.contains("max 8 items"));
    }

    #[test]
    fn test_analyze_prompt_schema_tracks_mode() {
        let short = analyze_prompt("an ingest pipeline", SpecMode::Short);
        assert!(short.contains("\"concrete_fixes\""));
        assert!(!short.contains("\"suggested_metrics\""));
        assert!(short.contains("max 3 items"));
        assert!(short.contains("an ingest pipeline"));

        let full = analyze_prompt("an ingest pipeline", SpecMode::Full);
        assert!(full.contains("\"suggested_metrics\""));
        assert!(full.contains("failure_injection_tests: max 2 items"));
    }
}
