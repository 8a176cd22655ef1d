//! specforge core - protocol and document types
//!
//! Pure data structures plus the two pieces of document-level logic that
//! belong next to them: the semantic-consistency validator and the
//! completion checklist. All other crates depend on this one.

mod error;
mod protocol;
mod semantics;
mod spec;

pub use error::{
    LlmError, PatchError, SessionError, SpecForgeError, SpecForgeResult, StoreError,
    ValidationError,
};
pub use protocol::{
    AskPayload, CompletePayload, DesignAction, DesignSessionError, DesignSessionResponse, PatchOp,
    PatchOpKind, SessionErrorCode, TurnRecord,
};
pub use semantics::validate_semantics;
pub use spec::{
    Component, Contract, DataStore, Deploy, Link, Requirements, Runtime, Scaling, SystemInfo,
    SystemSpec, Transport, NAME_PLACEHOLDER, SCHEMA_VERSION,
};
