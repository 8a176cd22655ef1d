//! Atomic patch application
//!
//! Operates on a working `serde_json::Value` copy of the document; the
//! caller's document is replaced only when every operation in the batch and
//! the whole-document re-validation succeed. Partial application is never
//! observable.

use crate::pointer::{parse_pointer, resolve, seq_index, value_kind};
use serde_json::Value;
use specforge_core::{PatchError, PatchOp, PatchOpKind, SystemSpec};

/// Apply an ordered batch of operations, returning the new document or the
/// first failure. On any error the input document is untouched.
pub fn apply(spec: &SystemSpec, ops: &[PatchOp]) -> Result<SystemSpec, PatchError> {
    let mut doc = serde_json::to_value(spec).map_err(|e| PatchError::SchemaValidation {
        reason: e.to_string(),
    })?;
    for op in ops {
        apply_op(&mut doc, op)?;
    }
    // Typed round trip is the schema check: deny_unknown_fields rejects any
    // key the document model does not know.
    let next: SystemSpec =
        serde_json::from_value(doc).map_err(|e| PatchError::SchemaValidation {
            reason: e.to_string(),
        })?;
    next.validate().map_err(|e| PatchError::SchemaValidation {
        reason: e.to_string(),
    })?;
    Ok(next)
}

fn apply_op(doc: &mut Value, op: &PatchOp) -> Result<(), PatchError> {
    op.check_shape()?;
    let tokens = parse_pointer(&op.path)?;
    if tokens[0] == "schema_version" {
        return Err(PatchError::ForbiddenTarget {
            path: op.path.clone(),
        });
    }
    let (parent, last) = resolve(doc, &op.path, &tokens)?;
    match op.op {
        PatchOpKind::Set => op_set(parent, last, op),
        PatchOpKind::Merge => op_merge(parent, last, op),
        PatchOpKind::Append => op_append(parent, last, op),
        PatchOpKind::Remove => op_remove(parent, last, op),
    }
}

fn required_value(op: &PatchOp) -> Result<Value, PatchError> {
    op.value.clone().ok_or_else(|| PatchError::MissingValue {
        op: op.op.as_str(),
        path: op.path.clone(),
    })
}

fn op_set(parent: &mut Value, last: &str, op: &PatchOp) -> Result<(), PatchError> {
    let value = required_value(op)?;
    match parent {
        Value::Object(map) => {
            map.insert(last.to_string(), value);
            Ok(())
        }
        Value::Array(seq) => {
            // One-past-the-end is legal for set only: it appends.
            let idx = seq_index(&op.path, last, seq.len(), true)?;
            if idx == seq.len() {
                seq.push(value);
            } else {
                seq[idx] = value;
            }
            Ok(())
        }
        scalar => Err(PatchError::TypeMismatch {
            path: op.path.clone(),
            expected: "object or array",
            found: value_kind(scalar),
        }),
    }
}

/// Look up the slot the final token addresses; it must already exist.
fn existing_slot<'a>(
    parent: &'a mut Value,
    last: &str,
    path: &str,
) -> Result<&'a mut Value, PatchError> {
    match parent {
        Value::Object(map) => map.get_mut(last).ok_or_else(|| PatchError::NotFound {
            path: path.to_string(),
            segment: last.to_string(),
        }),
        Value::Array(seq) => {
            let idx = seq_index(path, last, seq.len(), false)?;
            Ok(&mut seq[idx])
        }
        scalar => Err(PatchError::TypeMismatch {
            path: path.to_string(),
            expected: "object or array",
            found: value_kind(scalar),
        }),
    }
}

fn op_merge(parent: &mut Value, last: &str, op: &PatchOp) -> Result<(), PatchError> {
    let incoming = match required_value(op)? {
        Value::Object(map) => map,
        other => {
            return Err(PatchError::TypeMismatch {
                path: op.path.clone(),
                expected: "object value",
                found: value_kind(&other),
            })
        }
    };
    let target = existing_slot(parent, last, &op.path)?;
    match target {
        Value::Object(map) => {
            for (key, value) in incoming {
                map.insert(key, value);
            }
            Ok(())
        }
        other => Err(PatchError::TypeMismatch {
            path: op.path.clone(),
            expected: "object",
            found: value_kind(other),
        }),
    }
}

fn op_append(parent: &mut Value, last: &str, op: &PatchOp) -> Result<(), PatchError> {
    let value = required_value(op)?;
    let target = existing_slot(parent, last, &op.path)?;
    match target {
        Value::Array(seq) => {
            seq.push(value);
            Ok(())
        }
        other => Err(PatchError::TypeMismatch {
            path: op.path.clone(),
            expected: "array",
            found: value_kind(other),
        }),
    }
}

fn op_remove(parent: &mut Value, last: &str, op: &PatchOp) -> Result<(), PatchError> {
    match parent {
        Value::Object(map) => {
            map.remove(last).ok_or_else(|| PatchError::NotFound {
                path: op.path.clone(),
                segment: last.to_string(),
            })?;
            Ok(())
        }
        Value::Array(seq) => {
            let idx = seq_index(&op.path, last, seq.len(), false)?;
            seq.remove(idx);
            Ok(())
        }
        scalar => Err(PatchError::TypeMismatch {
            path: op.path.clone(),
            expected: "object or array",
            found: value_kind(scalar),
        }),
    }
}

// =============================================================================
// TESTS
// =============================================================================
