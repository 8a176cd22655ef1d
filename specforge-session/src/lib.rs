//! specforge session - the turn-based design loop
//!
//! One session owns one document and one last-error register. Each call to
//! `step` runs a full turn: build the prompt from the current state, call the
//! model collaborator, classify the reply into ask/patch/complete (or a
//! classification error), apply the consequence, and emit a `TurnRecord` for
//! the persistence collaborator. Classification and patch failures are not
//! thrown; they are held in the register and fed into the next prompt so the
//! model can self-correct. The document is never partially mutated: the patch
//! engine returns a fresh document or the old one stands.

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use specforge_core::{
    validate_semantics, AskPayload, CompletePayload, DesignAction, DesignSessionError,
    DesignSessionResponse, LlmError, SessionError, SessionErrorCode, SpecForgeError,
    SpecForgeResult, SystemSpec, TurnRecord,
};
use specforge_llm::{prompts, DesignModel};

/// Observable session state. The intermediate per-turn phases (awaiting the
/// model, applying, asking, completing) live inside one `step` call; between
/// calls a session is either accepting input or done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingInput,
    Complete,
}

/// What one turn did, for the operator-facing surface.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The model asked a clarifying question.
    Asked(AskPayload),
    /// A patch batch committed; semantic warnings are advisory.
    Applied { warnings: Vec<String> },
    /// The turn failed; the error is held for the next prompt.
    Rejected(DesignSessionError),
    /// The completion checklist passed; the session is over.
    Completed(CompletePayload),
}

/// A design session: the single document, the single last-error slot, and a
/// turn counter. Strictly single-threaded and synchronous per turn.
#[derive(Debug)]
pub struct DesignSession {
    spec: SystemSpec,
    last_error: Option<DesignSessionError>,
    turn: u32,
    state: SessionState,
}

impl DesignSession {
    /// Start from the skeleton document.
    pub fn new() -> Self {
        Self::resume(SystemSpec::skeleton(), None)
    }

    /// Re-enter a session from persisted state.
    pub fn resume(spec: SystemSpec, last_error: Option<DesignSessionError>) -> Self {
        Self {
            spec,
            last_error,
            turn: 0,
            state: SessionState::AwaitingInput,
        }
    }

    pub fn spec(&self) -> &SystemSpec {
        &self.spec
    }

    pub fn last_error(&self) -> Option<&DesignSessionError> {
        self.last_error.as_ref()
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Complete
    }

    /// Run one turn against the model collaborator.
    ///
    /// Only transport-level faults (other than timeouts) surface as `Err`;
    /// every protocol-level failure becomes a `TurnOutcome::Rejected` with
    /// the error held for the next prompt.
    pub async fn step(
        &mut self,
        input: &str,
        model: &dyn DesignModel,
    ) -> SpecForgeResult<(TurnOutcome, TurnRecord)> {
        if self.is_complete() {
            return Err(SessionError::AlreadyComplete.into());
        }
        self.turn += 1;

        let user_prompt = self.build_prompt(input)?;
        let raw = match model
            .complete(prompts::SYSTEM_DESIGN_PROMPT, &user_prompt)
            .await
        {
            Ok(raw) => raw,
            Err(SpecForgeError::Llm(LlmError::Timeout {
                provider,
                timeout_ms,
            })) => {
                // Retryable: hold it like any other turn error.
                let error = DesignSessionError::new(
                    SessionErrorCode::ModelTimeout,
                    format!("Model call to {} timed out after {}ms", provider, timeout_ms),
                );
                return Ok(self.reject(input, String::new(), None, error));
            }
            Err(other) => return Err(other),
        };

        let response = match classify(&raw) {
            Ok(response) => response,
            Err(error) => return Ok(self.reject(input, raw, None, error)),
        };

        match response.action.clone() {
            DesignAction::Ask { ask } => {
                tracing::info!(turn = self.turn, "model asked a clarifying question");
                self.last_error = None;
                Ok((
                    TurnOutcome::Asked(ask),
                    self.record(input, raw, Some(response)),
                ))
            }
            DesignAction::Patch { patch } => match specforge_patch::apply(&self.spec, &patch) {
                Ok(next) => {
                    self.spec = next;
                    self.last_error = None;
                    let warnings = validate_semantics(&self.spec);
                    if !warnings.is_empty() {
                        tracing::warn!(
                            turn = self.turn,
                            count = warnings.len(),
                            "semantic warnings after patch"
                        );
                    }
                    Ok((
                        TurnOutcome::Applied { warnings },
                        self.record(input, raw, Some(response)),
                    ))
                }
                Err(patch_error) => {
                    let error =
                        DesignSessionError::new(SessionErrorCode::PatchApplyError, patch_error.to_string())
                            .with_details(json!({ "rejected_ops": patch }));
                    Ok(self.reject(input, raw, Some(response), error))
                }
            },
            DesignAction::Complete { complete } => {
                let missing = self.spec.missing_fields();
                if missing.is_empty() {
                    tracing::info!(turn = self.turn, "completion checklist passed");
                    self.last_error = None;
                    self.state = SessionState::Complete;
                    Ok((
                        TurnOutcome::Completed(complete),
                        self.record(input, raw, Some(response)),
                    ))
                } else {
                    let error = DesignSessionError::new(
                        SessionErrorCode::IncompleteSpec,
                        format!("Spec is missing required fields: {}", missing.join(", ")),
                    )
                    .with_details(json!({ "missing": missing }));
                    Ok(self.reject(input, raw, Some(response), error))
                }
            }
        }
    }

    fn build_prompt(&self, input: &str) -> SpecForgeResult<String> {
        let spec_json = canonical_json(&self.spec)?;
        let error_json = match &self.last_error {
            Some(error) => canonical_json(error)?,
            None => "null".to_string(),
        };
        Ok(prompts::design_prompt(&spec_json, input, &error_json))
    }

    fn reject(
        &mut self,
        input: &str,
        raw: String,
        response: Option<DesignSessionResponse>,
        error: DesignSessionError,
    ) -> (TurnOutcome, TurnRecord) {
        tracing::warn!(turn = self.turn, code = ?error.code, "turn rejected");
        self.last_error = Some(error.clone());
        (
            TurnOutcome::Rejected(error),
            self.record(input, raw, response),
        )
    }

    fn record(
        &self,
        input: &str,
        raw: String,
        response: Option<DesignSessionResponse>,
    ) -> TurnRecord {
        TurnRecord {
            turn: self.turn,
            input: input.to_string(),
            raw,
            response,
            error: self.last_error.clone(),
            spec: self.spec.clone(),
            recorded_at: Utc::now(),
        }
    }
}

impl Default for DesignSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical compact JSON: serde_json's default map is ordered by key, so
/// equal states serialize identically.
fn canonical_json<T: Serialize>(value: &T) -> SpecForgeResult<String> {
    serde_json::to_string(value).map_err(|e| {
        SessionError::Serialize {
            reason: e.to_string(),
        }
        .into()
    })
}

/// Classify raw model text into a structured response, or the session error
/// that should be fed back next turn.
fn classify(raw: &str) -> Result<DesignSessionResponse, DesignSessionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DesignSessionError::new(
            SessionErrorCode::EmptyOutput,
            "No text content found in model response",
        ));
    }
    let value: serde_json::Value = serde_json::from_str(trimmed).map_err(|e| {
        DesignSessionError::new(
            SessionErrorCode::MalformedOutput,
            format!("Model output is not valid JSON: {}", e),
        )
    })?;
    serde_json::from_value(value).map_err(|e| {
        DesignSessionError::new(
            SessionErrorCode::SchemaMismatch,
            format!("Model output violates the response schema: {}", e),
        )
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted collaborator: pops replies in order and keeps every prompt it
    /// was shown for assertions about error feedback.
    struct ScriptedModel {
        replies: Mutex<VecDeque<SpecForgeResult<String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new<I: IntoIterator<Item = SpecForgeResult<String>>>(replies: I) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn from_json(replies: &[serde_json::Value]) -> Self {
            Self::new(replies.iter().map(|v| Ok(v.to_string())))
        }

        fn prompt(&self, index: usize) -> String {
            self.prompts.lock().unwrap()[index].clone()
        }
    }

    #[async_trait]
    impl DesignModel for ScriptedModel {
        async fn complete(&self, _system: &str, user: &str) -> SpecForgeResult<String> {
            self.prompts.lock().unwrap().push(user.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("script exhausted")
        }
    }

    fn ask_reply() -> serde_json::Value {
        json!({"action": "ask", "ask": {"question": "What is the SLA?"}})
    }

    fn patch_reply(ops: serde_json::Value) -> serde_json::Value {
        json!({"action": "patch", "patch": ops})
    }

    #[tokio::test]
    async fn test_ask_surfaces_question_and_clears_error() {
        let model = ScriptedModel::new([
            Ok("not json at all".to_string()),
            Ok(ask_reply().to_string()),
        ]);
        let mut session = DesignSession::new();

        let (outcome, record) = session.step("hello", &model).await.unwrap();
        match outcome {
            TurnOutcome::Rejected(error) => {
                assert_eq!(error.code, SessionErrorCode::MalformedOutput)
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        assert_eq!(record.turn, 1);
        assert!(record.response.is_none());
        assert!(session.last_error().is_some());

        let (outcome, record) = session.step("still here", &model).await.unwrap();
        match outcome {
            TurnOutcome::Asked(ask) => assert_eq!(ask.question, "What is the SLA?"),
            other => panic!("expected ask, got {:?}", other),
        }
        assert_eq!(record.turn, 2);
        assert!(session.last_error().is_none());

        // The second prompt carried the held error for self-correction.
        assert!(model.prompt(1).contains("malformed_output"));
        // Cleared errors are not re-sent.
        assert!(model.prompt(0).contains("Last error JSON (if any):\nnull"));
    }

    #[tokio::test]
    async fn test_empty_and_schema_mismatch_classification() {
        let model = ScriptedModel::new([
            Ok("   ".to_string()),
            Ok(json!({"action": "patch"}).to_string()),
            Ok(json!({
                "action": "ask",
                "ask": {"question": "both?"},
                "patch": [{"op": "set", "path": "/system/name", "value": "x"}]
            })
            .to_string()),
        ]);
        let mut session = DesignSession::new();

        let (outcome, _) = session.step("x", &model).await.unwrap();
        assert!(matches!(
            outcome,
            TurnOutcome::Rejected(DesignSessionError {
                code: SessionErrorCode::EmptyOutput,
                ..
            })
        ));

        let (outcome, _) = session.step("x", &model).await.unwrap();
        assert!(matches!(
            outcome,
            TurnOutcome::Rejected(DesignSessionError {
                code: SessionErrorCode::SchemaMismatch,
                ..
            })
        ));

        // An ask that also carries a patch payload is a schema mismatch, not
        // a clean ask; the document must not move.
        let (outcome, _) = session.step("x", &model).await.unwrap();
        assert!(matches!(
            outcome,
            TurnOutcome::Rejected(DesignSessionError {
                code: SessionErrorCode::SchemaMismatch,
                ..
            })
        ));
        assert_eq!(session.spec(), &SystemSpec::skeleton());
    }

    #[tokio::test]
    async fn test_patch_success_updates_document_with_warnings() {
        let model = ScriptedModel::from_json(&[patch_reply(json!([
            {"op": "set", "path": "/system/name", "value": "Order Service"},
            {"op": "append", "path": "/links", "value": {
                "id": "l1", "from_id": "ghost", "to_id": "ghost",
                "transport": {"kind": "http", "name": "rest"}
            }}
        ]))]);
        let mut session = DesignSession::new();

        let (outcome, record) = session.step("name it", &model).await.unwrap();
        match outcome {
            TurnOutcome::Applied { warnings } => {
                assert_eq!(
                    warnings,
                    vec![
                        "dangling link.from_id: l1 -> ghost",
                        "dangling link.to_id: l1 -> ghost",
                    ]
                );
            }
            other => panic!("expected applied, got {:?}", other),
        }
        assert_eq!(session.spec().system.name, "Order Service");
        assert_eq!(record.spec.system.name, "Order Service");
        assert!(session.last_error().is_none());
    }

    #[tokio::test]
    async fn test_patch_failure_keeps_document_and_holds_ops() {
        let model = ScriptedModel::from_json(&[patch_reply(json!([
            {"op": "set", "path": "/schema_version", "value": "v2"}
        ]))]);
        let mut session = DesignSession::new();

        let (outcome, record) = session.step("try it", &model).await.unwrap();
        let error = match outcome {
            TurnOutcome::Rejected(error) => error,
            other => panic!("expected rejection, got {:?}", other),
        };
        assert_eq!(error.code, SessionErrorCode::PatchApplyError);
        let details = error.details.unwrap();
        assert_eq!(details["rejected_ops"][0]["path"], "/schema_version");
        // Document unchanged, response still recorded.
        assert_eq!(session.spec(), &SystemSpec::skeleton());
        assert!(record.response.is_some());
    }

    #[tokio::test]
    async fn test_complete_rejected_on_skeleton_lists_all_six() {
        let model = ScriptedModel::from_json(&[json!({
            "action": "complete",
            "complete": {"reason": "done", "assumptions": [], "remaining_unknowns": []}
        })]);
        let mut session = DesignSession::new();

        let (outcome, _) = session.step("finish", &model).await.unwrap();
        let error = match outcome {
            TurnOutcome::Rejected(error) => error,
            other => panic!("expected rejection, got {:?}", other),
        };
        assert_eq!(error.code, SessionErrorCode::IncompleteSpec);
        assert_eq!(
            error.details.unwrap()["missing"],
            json!([
                "system.name",
                "system.goals",
                "components",
                "links",
                "data_stores",
                "requirements.slos"
            ])
        );
        assert!(!session.is_complete());
    }

    #[tokio::test]
    async fn test_complete_accepted_once_checklist_passes() {
        let fill = patch_reply(json!([
            {"op": "set", "path": "/system/name", "value": "Order Service"},
            {"op": "append", "path": "/system/goals", "value": "take orders"},
            {"op": "append", "path": "/components", "value": {
                "id": "c1", "type": "service", "name": "API",
                "responsibilities": [], "depends_on": []
            }},
            {"op": "append", "path": "/links", "value": {
                "id": "l1", "from_id": "c1", "to_id": "c1",
                "transport": {"kind": "http", "name": "rest"}
            }},
            {"op": "append", "path": "/data_stores", "value": {
                "id": "d1", "type": "postgres", "ownership": "c1"
            }},
            {"op": "append", "path": "/requirements/slos", "value": "p99 < 200ms"}
        ]));
        let done = json!({
            "action": "complete",
            "complete": {"reason": "minimum viable spec", "assumptions": ["single region"],
                         "remaining_unknowns": []}
        });
        let model = ScriptedModel::from_json(&[fill, done]);
        let mut session = DesignSession::new();

        let (outcome, _) = session.step("fill it in", &model).await.unwrap();
        assert_eq!(outcome, TurnOutcome::Applied { warnings: vec![] });

        let (outcome, record) = session.step("finish", &model).await.unwrap();
        match outcome {
            TurnOutcome::Completed(complete) => {
                assert_eq!(complete.reason, "minimum viable spec")
            }
            other => panic!("expected completion, got {:?}", other),
        }
        assert!(session.is_complete());
        assert!(record.error.is_none());

        // Terminal: further steps are a caller bug.
        let err = session.step("again", &model).await.unwrap_err();
        assert!(matches!(
            err,
            SpecForgeError::Session(SessionError::AlreadyComplete)
        ));
    }

    #[tokio::test]
    async fn test_timeout_becomes_retryable_session_error() {
        let model = ScriptedModel::new([
            Err(SpecForgeError::Llm(LlmError::Timeout {
                provider: "anthropic".to_string(),
                timeout_ms: 5,
            })),
            Ok(ask_reply().to_string()),
        ]);
        let mut session = DesignSession::new();

        let (outcome, record) = session.step("x", &model).await.unwrap();
        assert!(matches!(
            outcome,
            TurnOutcome::Rejected(DesignSessionError {
                code: SessionErrorCode::ModelTimeout,
                ..
            })
        ));
        assert_eq!(record.raw, "");

        // Next turn still works and sees the timeout error in its prompt.
        let (outcome, _) = session.step("x", &model).await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Asked(_)));
        assert!(model.prompt(1).contains("model_timeout"));
    }

    #[tokio::test]
    async fn test_non_timeout_transport_error_propagates() {
        let model = ScriptedModel::new([Err(SpecForgeError::Llm(LlmError::RateLimited {
            provider: "anthropic".to_string(),
        }))]);
        let mut session = DesignSession::new();

        let err = session.step("x", &model).await.unwrap_err();
        assert!(matches!(
            err,
            SpecForgeError::Llm(LlmError::RateLimited { .. })
        ));
        // The register is untouched by hard failures.
        assert!(session.last_error().is_none());
    }
}
