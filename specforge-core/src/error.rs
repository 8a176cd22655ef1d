//! Error types for specforge operations

use thiserror::Error;

/// Patch engine failures. Each condition is a distinct variant so callers and
/// the session error register can report precisely what was rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PatchError {
    #[error("Malformed pointer {path:?}: {reason}")]
    MalformedPath { path: String, reason: String },

    #[error("Forbidden patch target {path:?}")]
    ForbiddenTarget { path: String },

    #[error("Path {path:?} not found: no key {segment:?}")]
    NotFound { path: String, segment: String },

    #[error("Index {index:?} out of range in {path:?} (len {len})")]
    IndexOutOfRange {
        path: String,
        index: String,
        len: usize,
    },

    #[error("Type mismatch at {path:?}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Operation {op} on {path:?} requires a value")]
    MissingValue { op: &'static str, path: String },

    #[error("Operation remove on {path:?} must not carry a value")]
    UnexpectedValue { path: String },

    #[error("Patched document failed schema validation: {reason}")]
    SchemaValidation { reason: String },
}

/// Document-level invariants checked after deserialization.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Schema version mismatch: expected {expected}, got {got}")]
    SchemaVersionMismatch { expected: String, got: String },
}

/// LLM provider errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("Missing API key for {provider}")]
    MissingApiKey { provider: String },

    #[error("Request to {provider} failed with status {status}: {message}")]
    RequestFailed {
        provider: String,
        status: i32,
        message: String,
    },

    #[error("Rate limited by {provider}")]
    RateLimited { provider: String },

    #[error("Invalid API key for {provider}")]
    InvalidApiKey { provider: String },

    #[error("Request to {provider} timed out after {timeout_ms}ms")]
    Timeout { provider: String, timeout_ms: u64 },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Provider error from {provider}: {message}")]
    ProviderError { provider: String, message: String },
}

/// Hard session-controller failures. Protocol-level turn failures live in
/// the `DesignSessionError` register instead; these are caller bugs or
/// serialization faults.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session already complete")]
    AlreadyComplete,

    #[error("Serialization failed: {reason}")]
    Serialize { reason: String },
}

/// Run store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("IO error on {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Serialization failed: {reason}")]
    Serialize { reason: String },
}

/// Master error type for all specforge errors.
#[derive(Debug, Clone, Error)]
pub enum SpecForgeError {
    #[error("Patch error: {0}")]
    Patch(#[from] PatchError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type alias for specforge operations.
pub type SpecForgeResult<T> = Result<T, SpecForgeError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_error_display_forbidden_target() {
        let err = PatchError::ForbiddenTarget {
            path: "/schema_version".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Forbidden"));
        assert!(msg.contains("/schema_version"));
    }

    #[test]
    fn test_patch_error_display_index_out_of_range() {
        let err = PatchError::IndexOutOfRange {
            path: "/components/7".to_string(),
            index: "7".to_string(),
            len: 2,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("7"));
        assert!(msg.contains("len 2"));
    }

    #[test]
    fn test_llm_error_display_timeout() {
        let err = LlmError::Timeout {
            provider: "anthropic".to_string(),
            timeout_ms: 60_000,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("anthropic"));
        assert!(msg.contains("60000"));
    }

    #[test]
    fn test_specforge_error_from_variants() {
        let patch = SpecForgeError::from(PatchError::UnexpectedValue {
            path: "/links/0".to_string(),
        });
        assert!(matches!(patch, SpecForgeError::Patch(_)));

        let llm = SpecForgeError::from(LlmError::RateLimited {
            provider: "anthropic".to_string(),
        });
        assert!(matches!(llm, SpecForgeError::Llm(_)));

        let store = SpecForgeError::from(StoreError::Serialize {
            reason: "bad".to_string(),
        });
        assert!(matches!(store, SpecForgeError::Store(_)));

        let validation = SpecForgeError::from(ValidationError::SchemaVersionMismatch {
            expected: "a".to_string(),
            got: "b".to_string(),
        });
        assert!(matches!(validation, SpecForgeError::Validation(_)));
    }
}
