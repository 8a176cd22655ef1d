//! The SystemSpec document model
//!
//! Pure data structures describing a target system's architecture. The
//! document starts as a fixed skeleton and is only ever replaced wholesale by
//! a fully validated patch application; `deny_unknown_fields` on every struct
//! makes typed deserialization double as schema validation.

use crate::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Schema tag carried by every document. Immutable after creation; the patch
/// engine refuses any operation addressing it.
pub const SCHEMA_VERSION: &str = "specforge.systemspec.v1";

/// Placeholder system name used by the skeleton document. The completion
/// checklist treats it the same as an empty name.
pub const NAME_PLACEHOLDER: &str = "TBD";

// ============================================================================
// ROOT DOCUMENT
// ============================================================================

/// Root structured document describing a target system, built incrementally
/// over the design session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SystemSpec {
    pub schema_version: String,
    pub system: SystemInfo,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub data_stores: Vec<DataStore>,
    #[serde(default)]
    pub contracts: Vec<Contract>,
    #[serde(default)]
    pub deploy: Deploy,
    #[serde(default)]
    pub requirements: Requirements,
    #[serde(default)]
    pub open_questions: Vec<String>,
    /// Free-form escape hatch for details the schema does not model.
    #[serde(default)]
    pub extensions: Map<String, Value>,
}

/// Identity block: what the system is and what it is (not) for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SystemInfo {
    pub name: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub non_goals: Vec<String>,
}

// ============================================================================
// COLLECTIONS
// ============================================================================

/// A deployable unit of the target system. `depends_on` holds soft references
/// to other component ids; dangling references are reported by the semantic
/// validator, not rejected by the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Component {
    pub id: String,
    #[serde(rename = "type")]
    pub component_type: String,
    pub name: String,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub runtime: Option<Runtime>,
    #[serde(default)]
    pub scaling: Option<Scaling>,
}

/// Runtime descriptor for a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Runtime {
    pub kind: String,
    #[serde(default)]
    pub platform: Option<String>,
}

/// Scaling descriptor for a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scaling {
    #[serde(default)]
    pub min: Option<i64>,
    #[serde(default)]
    pub max: Option<i64>,
    #[serde(default)]
    pub strategy: Option<String>,
}

/// A communication edge between two components. `from_id`/`to_id` are soft
/// component references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Link {
    pub id: String,
    pub from_id: String,
    pub to_id: String,
    pub transport: Transport,
    #[serde(default)]
    pub semantics: Vec<String>,
    #[serde(default)]
    pub delivery: Option<String>,
    #[serde(default)]
    pub ordering: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub backpressure: Option<String>,
}

/// Transport descriptor for a link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Transport {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub format: Option<String>,
}

/// A persistent store and who owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataStore {
    pub id: String,
    #[serde(rename = "type")]
    pub store_type: String,
    pub ownership: String,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub retention: Option<String>,
}

/// A data contract owned by a component. The schema payload is deliberately
/// untyped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Contract {
    pub id: String,
    pub name: String,
    pub owner_component_id: String,
    pub schema: Value,
    #[serde(default)]
    pub evolution: Option<String>,
}

// ============================================================================
// SINGLETON RECORDS
// ============================================================================

/// Deployment posture of the system.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Deploy {
    #[serde(default)]
    pub orchestration: Option<String>,
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub observability: Vec<String>,
    #[serde(default)]
    pub notes: Vec<String>,
}

/// Non-functional requirements.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Requirements {
    #[serde(default)]
    pub slos: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub throughput_targets: Vec<String>,
    #[serde(default)]
    pub latency_budgets: Vec<String>,
}

// ============================================================================
// LIFECYCLE
// ============================================================================

impl SystemSpec {
    /// Fixed starting document: placeholder name, empty collections, current
    /// schema tag.
    pub fn skeleton() -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            system: SystemInfo {
                name: NAME_PLACEHOLDER.to_string(),
                domain: None,
                goals: Vec::new(),
                non_goals: Vec::new(),
            },
            components: Vec::new(),
            links: Vec::new(),
            data_stores: Vec::new(),
            contracts: Vec::new(),
            deploy: Deploy::default(),
            requirements: Requirements::default(),
            open_questions: Vec::new(),
            extensions: Map::new(),
        }
    }

    /// Structural invariants the serde schema cannot express.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ValidationError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION.to_string(),
                got: self.schema_version.clone(),
            });
        }
        Ok(())
    }

    /// Minimum-viability completion checklist. Returns the list of missing
    /// fields; completion is only permitted when this is empty. Does not run
    /// the semantic validator.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let name = self.system.name.trim();
        if name.is_empty() || name == NAME_PLACEHOLDER {
            missing.push("system.name");
        }
        if self.system.goals.is_empty() {
            missing.push("system.goals");
        }
        if self.components.is_empty() {
            missing.push("components");
        }
        if self.links.is_empty() {
            missing.push("links");
        }
        if self.data_stores.is_empty() {
            missing.push("data_stores");
        }
        if self.requirements.slos.is_empty() {
            missing.push("requirements.slos");
        }
        missing
    }
}

impl Default for SystemSpec {
    fn default() -> Self {
        Self::skeleton()
    }
}

// =============================================================================
// TESTS
// =============================================================================
