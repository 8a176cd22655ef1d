//! Wire types for the design-session protocol
//!
//! The model collaborator speaks JSON: one action per turn (ask, patch, or
//! complete) with exactly one matching payload. Exclusivity is carried by the
//! `DesignAction` sum type rather than by cross-field checks.

use crate::PatchError;
use crate::SystemSpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// PATCH OPERATIONS
// ============================================================================

/// Kind of a patch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOpKind {
    Set,
    Merge,
    Append,
    Remove,
}

impl PatchOpKind {
    /// Lowercase wire name, used in error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            PatchOpKind::Set => "set",
            PatchOpKind::Merge => "merge",
            PatchOpKind::Append => "append",
            PatchOpKind::Remove => "remove",
        }
    }
}

/// One pointer-addressed mutation. set/merge/append carry a value; remove
/// must not. The constructors enforce that; `check_shape` re-enforces it for
/// ops that arrived over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOp {
    pub op: PatchOpKind,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOp {
    /// Assign a key or sequence slot (create-or-overwrite, one-past-end
    /// appends).
    pub fn set(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOpKind::Set,
            path: path.into(),
            value: Some(value),
        }
    }

    /// Shallow key-wise union into an existing mapping.
    pub fn merge(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOpKind::Merge,
            path: path.into(),
            value: Some(value),
        }
    }

    /// Push onto an existing sequence.
    pub fn append(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOpKind::Append,
            path: path.into(),
            value: Some(value),
        }
    }

    /// Delete a key or sequence slot.
    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: PatchOpKind::Remove,
            path: path.into(),
            value: None,
        }
    }

    /// Asymmetric value requirement: set/merge/append require a value,
    /// remove must not carry one.
    pub fn check_shape(&self) -> Result<(), PatchError> {
        match (self.op, &self.value) {
            (PatchOpKind::Remove, Some(_)) => Err(PatchError::UnexpectedValue {
                path: self.path.clone(),
            }),
            (PatchOpKind::Remove, None) => Ok(()),
            (op, None) => Err(PatchError::MissingValue {
                op: op.as_str(),
                path: self.path.clone(),
            }),
            (_, Some(_)) => Ok(()),
        }
    }
}

// ============================================================================
// SESSION RESPONSE
// ============================================================================

/// The model's declared action for one turn, with its payload. Internally
/// tagged on `action`; a response can only ever carry the payload matching
/// its tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum DesignAction {
    Ask { ask: AskPayload },
    Patch { patch: Vec<PatchOp> },
    Complete { complete: CompletePayload },
}

/// Full per-turn response from the model collaborator.
///
/// Deserialization is strict: besides `action` and `notes`, only the payload
/// key matching the action tag may be present. A response that carries an
/// extra payload (say an ask that also ships a patch) is rejected instead of
/// silently dropping the stray payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DesignSessionResponse {
    #[serde(flatten)]
    pub action: DesignAction,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl<'de> Deserialize<'de> for DesignSessionResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        let map = serde_json::Map::deserialize(deserializer)?;
        let tag = match map.get("action") {
            Some(Value::String(tag)) => tag.clone(),
            Some(_) => return Err(D::Error::custom("field `action` must be a string")),
            None => return Err(D::Error::missing_field("action")),
        };
        for key in map.keys() {
            if key != "action" && key != "notes" && key != &tag {
                return Err(D::Error::custom(format!(
                    "unexpected field {:?} for action {:?}",
                    key, tag
                )));
            }
        }
        let notes = match map.get("notes") {
            Some(notes) => Vec::deserialize(notes).map_err(D::Error::custom)?,
            None => Vec::new(),
        };
        let action =
            DesignAction::deserialize(&Value::Object(map)).map_err(D::Error::custom)?;
        Ok(Self { action, notes })
    }
}

/// Clarifying question payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskPayload {
    pub question: String,
    #[serde(default)]
    pub needed_for: Vec<String>,
    #[serde(default)]
    pub assumptions_if_unknown: Vec<String>,
}

/// Completion declaration payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletePayload {
    pub reason: String,
    #[serde(default)]
    pub assumptions: Vec<String>,
    #[serde(default)]
    pub remaining_unknowns: Vec<String>,
}

// ============================================================================
// SESSION ERROR REGISTER
// ============================================================================

/// Kind of session error held in the last-error register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionErrorCode {
    EmptyOutput,
    MalformedOutput,
    SchemaMismatch,
    PatchApplyError,
    IncompleteSpec,
    ModelTimeout,
}

impl SessionErrorCode {
    /// True for errors where the raw model text failed to parse or classify.
    /// Callers persisting artifacts capture the raw output verbatim for these.
    pub fn is_parse_failure(self) -> bool {
        matches!(
            self,
            SessionErrorCode::MalformedOutput | SessionErrorCode::SchemaMismatch
        )
    }
}

/// One turn's failure, carried into the next prompt so the model can
/// self-correct, then cleared on success. Serializable so a session can be
/// re-entered across process restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignSessionError {
    pub code: SessionErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl DesignSessionError {
    pub fn new(code: SessionErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

// ============================================================================
// TURN RECORD
// ============================================================================

/// Everything the persistence collaborator needs about one turn: the document
/// snapshot after the turn, the raw model output, and the error held going
/// into the next turn (if any).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub turn: u32,
    pub input: String,
    pub raw: String,
    pub response: Option<DesignSessionResponse>,
    pub error: Option<DesignSessionError>,
    pub spec: SystemSpec,
    pub recorded_at: DateTime<Utc>,
}

// =============================================================================
// TESTS
// =============================================================================
