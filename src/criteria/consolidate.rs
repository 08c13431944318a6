// src/criteria/consolidate.rs
//! Equivalence consolidation.
//!
//! Algorithm:
//! 1. Weight each answered question by position (first of N → N, last → 1).
//! 2. Group every weighted equivalence by characteristic id.
//! 3. Resolve priority: Critical if any member is Critical; the question
//!    weight is the max weight inside the winning tier.
//! 4. Merge values over ALL members (not just the winning tier):
//!    textual sets are unioned and targets are removed from blocking;
//!    numeric bounds are widened side by side (lowest min, highest max).
//! 5. Sort by importance: Critical first, then question weight descending.
//!
//! Pure and deterministic: the same `AnswerSet` always yields the same list.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::{AnswerSet, CriterionValues, NumericBound, NumericTarget, Priority, WeightedEquivalence};
use crate::registry::{CharacteristicKind, Registry};

/// One buyer requirement per distinct characteristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedCharacteristic {
    pub characteristic_id: i64,
    pub priority: Priority,
    pub question_weight: u32,
    #[serde(flatten)]
    pub values: CriterionValues,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl ConsolidatedCharacteristic {
    pub fn kind(&self) -> CharacteristicKind {
        self.values.kind()
    }

    /// What the buyer asked for, as display text (`None` when unresolvable).
    pub fn expected_label(&self, registry: &Registry) -> Option<String> {
        self.values
            .describe_target(registry, self.characteristic_id, self.unit.as_deref())
    }
}

/// Merge all dynamic answers into the consolidated requirement list.
pub fn consolidate(answers: &AnswerSet) -> Vec<ConsolidatedCharacteristic> {
    metrics::counter!("consolidate_runs_total").increment(1);
    if answers.is_empty() {
        return Vec::new();
    }

    // Group by characteristic, keeping first-seen order for stable output.
    let mut order: Vec<i64> = Vec::new();
    let mut groups: HashMap<i64, Vec<WeightedEquivalence>> = HashMap::new();
    for w in answers.weighted() {
        let id = w.equivalence.characteristic_id;
        groups
            .entry(id)
            .or_insert_with(|| {
                order.push(id);
                Vec::new()
            })
            .push(w);
    }

    let mut out: Vec<ConsolidatedCharacteristic> = order
        .iter()
        .filter_map(|id| groups.get(id).and_then(|g| merge_group(*id, g)))
        .collect();

    out.sort_by(|a, b| {
        b.priority
            .is_critical()
            .cmp(&a.priority.is_critical())
            .then(b.question_weight.cmp(&a.question_weight))
            .then(a.characteristic_id.cmp(&b.characteristic_id))
    });

    debug!(questions = answers.len(), requirements = out.len(), "consolidated");
    out
}

fn merge_group(id: i64, group: &[WeightedEquivalence]) -> Option<ConsolidatedCharacteristic> {
    let first = group.first()?;

    let priority = if group.iter().any(|w| w.equivalence.priority.is_critical()) {
        Priority::Critical
    } else {
        Priority::Secondary
    };
    let question_weight = group
        .iter()
        .filter(|w| w.equivalence.priority == priority)
        .map(|w| w.question_weight)
        .max()
        .unwrap_or(first.question_weight);

    let kind = first.equivalence.kind();
    let same_kind: Vec<&CriterionValues> = group
        .iter()
        .map(|w| &w.equivalence.values)
        .filter(|v| v.kind() == kind)
        .collect();
    if same_kind.len() < group.len() {
        debug!(
            characteristic_id = id,
            ?kind,
            skipped = group.len() - same_kind.len(),
            "ignoring equivalences of conflicting kind"
        );
    }

    let values = match kind {
        CharacteristicKind::Textual => merge_textual(&same_kind),
        CharacteristicKind::Numeric => merge_numeric(&same_kind),
    };
    let unit = group.iter().find_map(|w| w.equivalence.unit.clone());

    Some(ConsolidatedCharacteristic {
        characteristic_id: id,
        priority,
        question_weight,
        values,
        unit,
    })
}

fn merge_textual(values: &[&CriterionValues]) -> CriterionValues {
    let mut targets: Vec<i64> = Vec::new();
    let mut blocking: Vec<i64> = Vec::new();
    for v in values {
        if let CriterionValues::Textual {
            target_values,
            blocking_values,
        } = v
        {
            push_unique(&mut targets, target_values);
            push_unique(&mut blocking, blocking_values);
        }
    }
    // A target always beats a conflicting blocking classification.
    blocking.retain(|b| !targets.contains(b));
    CriterionValues::Textual {
        target_values: targets,
        blocking_values: blocking,
    }
}

fn push_unique(into: &mut Vec<i64>, from: &[i64]) {
    for v in from {
        if !into.contains(v) {
            into.push(*v);
        }
    }
}

/// Per-side bounds. A side only exists when some contributor states it,
/// so `{min: 10}` merged with `{max: 100}` gives `10–100`, not an open range.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Bounds {
    lo: Option<f64>,
    hi: Option<f64>,
}

impl Bounds {
    fn widen(self, lo: Option<f64>, hi: Option<f64>) -> Self {
        Self {
            lo: pick(self.lo, lo, f64::min),
            hi: pick(self.hi, hi, f64::max),
        }
    }
}

fn pick(a: Option<f64>, b: Option<f64>, f: fn(f64, f64) -> f64) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(f(x, y)),
        (x, y) => x.or(y),
    }
}

fn merge_numeric(values: &[&CriterionValues]) -> CriterionValues {
    let mut target = Bounds::default();
    let mut blocking = Bounds::default();
    for v in values {
        if let CriterionValues::Numeric {
            target_values: t,
            blocking_values: b,
        } = v
        {
            // Exact counts as both a lower and an upper bound.
            target = match t.exact {
                Some(e) => target.widen(Some(e), Some(e)),
                None => target.widen(t.min, t.max),
            };
            blocking = blocking.widen(b.min, b.max);
        }
    }

    let target_values = match (target.lo, target.hi) {
        (Some(lo), Some(hi)) if lo == hi => NumericTarget::exact(lo),
        (lo, hi) => NumericTarget::range(lo, hi),
    };
    CriterionValues::Numeric {
        target_values,
        blocking_values: NumericBound {
            min: blocking.lo,
            max: blocking.hi,
        },
    }
}
