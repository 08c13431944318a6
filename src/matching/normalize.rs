// src/matching/normalize.rs
//! Matching result normalization.
//!
//! Specs are built by walking the buyer's requirements, not the product's
//! characteristics: every card shows exactly one line per requested
//! criterion, whether or not the engine reported on it. Gaps are the
//! opposite walk, over what the engine reported as non-matching.
//!
//! Gap and Blocking statuses render the same way here; whether Blocking
//! should exclude a product is the engine's call.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::{MatchStatus, MatchingCharacteristic, MatchingProduct, MatchingResponse};
use crate::criteria::ConsolidatedCharacteristic;
use crate::registry::{with_unit, Registry};

/// Placeholder value for a criterion the product does not document.
pub const MISSING_VALUE: &str = "-";

/// One line of a product card: the product's value for a requested criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecEntry {
    pub characteristic_id: i64,
    pub label: String,
    pub value: String,
    pub matches: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default)]
    pub is_requested: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedProduct {
    pub id: String,
    #[serde(default)]
    pub rank: u32,
    /// Engine score scaled to 0..=100.
    pub score: u8,
    #[serde(default)]
    pub is_top_pick: bool,
    #[serde(default)]
    pub specs: Vec<SpecEntry>,
    #[serde(default)]
    pub gaps: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMatching {
    pub recommended: Vec<NormalizedProduct>,
    pub others: Vec<NormalizedProduct>,
}

/// `[0,1]` → `0..=100`, rounding half away from zero.
pub fn scale_score(score: f64) -> u8 {
    if !score.is_finite() {
        return 0;
    }
    (score * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Normalize both engine lists. Partition follows the input list, never the score.
pub fn normalize(
    top_products: &[MatchingProduct],
    other_products: &[MatchingProduct],
    registry: &Registry,
    requirements: &[ConsolidatedCharacteristic],
) -> NormalizedMatching {
    let by_id = index_requirements(requirements);
    let run = |products: &[MatchingProduct]| {
        let mut out: Vec<NormalizedProduct> = products
            .iter()
            .map(|p| normalize_with_index(p, registry, requirements, &by_id))
            .collect();
        // Stable: equal scores keep engine order.
        out.sort_by(|a, b| b.score.cmp(&a.score));
        out
    };

    let result = NormalizedMatching {
        recommended: run(top_products),
        others: run(other_products),
    };
    metrics::counter!("normalize_products_total")
        .increment((result.recommended.len() + result.others.len()) as u64);
    debug!(
        recommended = result.recommended.len(),
        others = result.others.len(),
        requirements = requirements.len(),
        registry = registry.len(),
        "normalized matching response"
    );
    result
}

pub fn normalize_response(
    response: &MatchingResponse,
    registry: &Registry,
    requirements: &[ConsolidatedCharacteristic],
) -> NormalizedMatching {
    normalize(
        &response.top_products,
        &response.other_products,
        registry,
        requirements,
    )
}

/// Normalize a single product against the buyer's requirements.
pub fn normalize_product(
    product: &MatchingProduct,
    registry: &Registry,
    requirements: &[ConsolidatedCharacteristic],
) -> NormalizedProduct {
    normalize_with_index(product, registry, requirements, &index_requirements(requirements))
}

fn index_requirements(
    requirements: &[ConsolidatedCharacteristic],
) -> HashMap<i64, &ConsolidatedCharacteristic> {
    let mut by_id = HashMap::with_capacity(requirements.len());
    for r in requirements {
        by_id.entry(r.characteristic_id).or_insert(r);
    }
    by_id
}

fn normalize_with_index(
    product: &MatchingProduct,
    registry: &Registry,
    requirements: &[ConsolidatedCharacteristic],
    by_id: &HashMap<i64, &ConsolidatedCharacteristic>,
) -> NormalizedProduct {
    NormalizedProduct {
        id: product.product_id.clone(),
        rank: product.rank,
        score: scale_score(product.score),
        is_top_pick: product.is_top_pick,
        specs: build_specs(product, registry, requirements),
        gaps: build_gaps(product, registry, by_id),
    }
}

fn build_specs(
    product: &MatchingProduct,
    registry: &Registry,
    requirements: &[ConsolidatedCharacteristic],
) -> Vec<SpecEntry> {
    requirements
        .iter()
        .map(|req| {
            let id = req.characteristic_id;
            let label = registry.characteristic_label(id);
            match product.characteristic(id) {
                Some(mc) if mc.match_status == MatchStatus::Match => SpecEntry {
                    characteristic_id: id,
                    label,
                    value: product_value(mc, Some(req), registry),
                    matches: true,
                    expected: None,
                    is_requested: true,
                },
                Some(mc) if mc.match_status != MatchStatus::NotProvided => SpecEntry {
                    characteristic_id: id,
                    label,
                    value: product_value(mc, Some(req), registry),
                    matches: false,
                    expected: req.expected_label(registry),
                    is_requested: true,
                },
                _ => SpecEntry {
                    characteristic_id: id,
                    label,
                    value: MISSING_VALUE.to_string(),
                    matches: false,
                    expected: req.expected_label(registry),
                    is_requested: true,
                },
            }
        })
        .collect()
}

fn build_gaps(
    product: &MatchingProduct,
    registry: &Registry,
    by_id: &HashMap<i64, &ConsolidatedCharacteristic>,
) -> Vec<String> {
    product
        .characteristics
        .iter()
        .filter(|mc| mc.match_status != MatchStatus::Match)
        .map(|mc| {
            let label = registry.characteristic_label(mc.characteristic_id);
            if mc.match_status == MatchStatus::NotProvided {
                return format!("{label} : non disponible");
            }
            let req = by_id.get(&mc.characteristic_id).copied();
            let value = product_value(mc, req, registry);
            match req.and_then(|r| r.expected_label(registry)) {
                Some(expected) => format!("{label} : {value} (demandé {expected})"),
                None => format!("{label} : {value}"),
            }
        })
        .collect()
}

/// The product's own value: value labels, else a numeric reading with unit, else `-`.
fn product_value(
    mc: &MatchingCharacteristic,
    requirement: Option<&ConsolidatedCharacteristic>,
    registry: &Registry,
) -> String {
    if !mc.value_ids.is_empty() {
        return registry
            .value_labels(mc.characteristic_id, &mc.value_ids)
            .join(", ");
    }
    if let Some(v) = mc.value {
        let unit = mc
            .unit
            .as_deref()
            .or_else(|| requirement.and_then(|r| r.unit.as_deref()))
            .or_else(|| registry.characteristic_unit(mc.characteristic_id));
        return with_unit(v, unit);
    }
    MISSING_VALUE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_scaling_rounds_half_up() {
        assert_eq!(scale_score(0.855), 86);
        assert_eq!(scale_score(0.0), 0);
        assert_eq!(scale_score(1.0), 100);
        assert_eq!(scale_score(0.444), 44);
    }

    #[test]
    fn score_scaling_clamps_out_of_range() {
        assert_eq!(scale_score(1.7), 100);
        assert_eq!(scale_score(-0.2), 0);
        assert_eq!(scale_score(f64::NAN), 0);
    }

    #[test]
    fn numeric_product_value_uses_unit_fallbacks() {
        let mut mc = MatchingCharacteristic::new(20, MatchStatus::Gap, vec![]);
        mc.value = Some(750.0);
        assert_eq!(product_value(&mc, None, &Registry::default()), "750");
        mc.unit = Some("kg".into());
        assert_eq!(product_value(&mc, None, &Registry::default()), "750 kg");
    }

    #[test]
    fn empty_product_value_is_dash() {
        let mc = MatchingCharacteristic::new(20, MatchStatus::Gap, vec![]);
        assert_eq!(product_value(&mc, None, &Registry::default()), MISSING_VALUE);
    }
}
