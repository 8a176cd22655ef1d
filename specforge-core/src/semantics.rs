//! Semantic consistency checks the schema cannot express
//!
//! Advisory only: these never block a patch from committing. Schema validity
//! is a precondition.

use crate::SystemSpec;
use std::collections::{BTreeMap, BTreeSet};

fn duplicate_id_warnings<'a, I>(ids: I, label: &str) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for id in ids {
        *counts.entry(id).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(id, _)| format!("duplicate {} id: {}", label, id))
        .collect()
}

/// Inspect a structurally valid document for duplicate identifiers and
/// dangling soft references. One warning per finding, deterministic order
/// within each check.
pub fn validate_semantics(spec: &SystemSpec) -> Vec<String> {
    let mut warnings = Vec::new();

    warnings.extend(duplicate_id_warnings(
        spec.components.iter().map(|c| c.id.as_str()),
        "component",
    ));
    warnings.extend(duplicate_id_warnings(
        spec.links.iter().map(|l| l.id.as_str()),
        "link",
    ));
    warnings.extend(duplicate_id_warnings(
        spec.data_stores.iter().map(|d| d.id.as_str()),
        "data_store",
    ));
    warnings.extend(duplicate_id_warnings(
        spec.contracts.iter().map(|c| c.id.as_str()),
        "contract",
    ));

    let component_ids: BTreeSet<&str> = spec.components.iter().map(|c| c.id.as_str()).collect();

    for link in &spec.links {
        if !component_ids.contains(link.from_id.as_str()) {
            warnings.push(format!(
                "dangling link.from_id: {} -> {}",
                link.id, link.from_id
            ));
        }
        if !component_ids.contains(link.to_id.as_str()) {
            warnings.push(format!("dangling link.to_id: {} -> {}", link.id, link.to_id));
        }
    }

    for contract in &spec.contracts {
        if !component_ids.contains(contract.owner_component_id.as_str()) {
            warnings.push(format!(
                "dangling contract.owner_component_id: {} -> {}",
                contract.id, contract.owner_component_id
            ));
        }
    }

    warnings
}

// =============================================================================
// TESTS
// =============================================================================
