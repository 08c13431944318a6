// src/criteria/tags.rs
//! "Your criteria" chips: one display tag per consolidated requirement.

use serde::Serialize;

use super::{ConsolidatedCharacteristic, CriterionValues, Priority};
use crate::registry::Registry;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionTag {
    pub characteristic_id: i64,
    pub label: String,
    pub value: String,
    pub priority: Priority,
}

/// Selected values as display text: labels joined with ", " for textual
/// requirements, the formatted range for numeric ones.
pub fn format_selected(registry: &Registry, requirement: &ConsolidatedCharacteristic) -> String {
    match &requirement.values {
        CriterionValues::Textual { target_values, .. } => registry
            .value_labels(requirement.characteristic_id, target_values)
            .join(", "),
        CriterionValues::Numeric { .. } => requirement.expected_label(registry).unwrap_or_default(),
    }
}

/// Tags in importance order; requirements with nothing to show are skipped.
pub fn criteria_tags(
    requirements: &[ConsolidatedCharacteristic],
    registry: &Registry,
) -> Vec<CriterionTag> {
    requirements
        .iter()
        .filter_map(|req| {
            let value = format_selected(registry, req);
            if value.is_empty() {
                return None;
            }
            Some(CriterionTag {
                characteristic_id: req.characteristic_id,
                label: registry.characteristic_label(req.characteristic_id),
                value,
                priority: req.priority,
            })
        })
        .collect()
}
