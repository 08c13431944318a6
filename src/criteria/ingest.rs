// src/criteria/ingest.rs
//! Ingestion boundary for questionnaire equivalences.
//!
//! Wire shape (per answered option, grouped by question code):
//! ```json
//! { "Q1": [ { "id_caracteristique": "176", "poids": "Critique",
//!             "valeurs_cibles": [5], "valeurs_bloquantes": [7] } ],
//!   "Q2": [ { "id_caracteristique": 20, "unite": "kg",
//!             "valeurs_cibles": {"min": 500}, "valeurs_bloquantes": {"max": 100} } ] }
//! ```
//! Priority and kind may be missing; kind is then inferred from structure.

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;
use tracing::debug;

use super::{CriterionValues, Equivalence, NumericBound, NumericTarget, Priority, WeightedEquivalence};
use crate::lenient;
use crate::registry::CharacteristicKind;

/// Range object as sent by the backend; all bounds optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct RawRange {
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub exact: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub min: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub max: Option<f64>,
}

impl RawRange {
    fn has_bound(&self) -> bool {
        self.exact.is_some() || self.min.is_some() || self.max.is_some()
    }
}

/// Untyped target/blocking payload: id list, range object, or nothing.
/// Any other shape (scalar, bool) is kept as `Other` and read as empty.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawValues {
    Ids(Vec<Value>),
    Range(RawRange),
    #[default]
    Missing,
    Other(Value),
}

impl RawValues {
    fn is_numeric_shape(&self) -> bool {
        matches!(self, Self::Range(r) if r.has_bound())
    }

    fn ids(&self) -> Vec<i64> {
        match self {
            Self::Ids(items) => lenient::values_to_ids(items),
            _ => Vec::new(),
        }
    }

    fn range(&self) -> RawRange {
        match self {
            Self::Range(r) => *r,
            _ => RawRange::default(),
        }
    }
}

/// Equivalence exactly as the questionnaire backend attaches it to an answer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEquivalence {
    #[serde(alias = "id_caracteristique", deserialize_with = "lenient::id")]
    pub characteristic_id: i64,
    #[serde(alias = "type_caracteristique", default)]
    pub kind: Option<String>,
    #[serde(alias = "poids_caracteristique", default)]
    pub priority: Option<String>,
    /// Some endpoints send the tier as `poids`; it wins over `poids_caracteristique`.
    #[serde(default)]
    pub poids: Option<String>,
    #[serde(alias = "valeurs_cibles", default)]
    pub target_values: RawValues,
    #[serde(alias = "valeurs_bloquantes", default)]
    pub blocking_values: RawValues,
    #[serde(alias = "unite", default, deserialize_with = "lenient::opt_string")]
    pub unit: Option<String>,
}

/// Kind from structure alone: a min/max/exact object on either side, or a
/// unit, means Numeric; everything else is Textual.
pub fn infer_kind(raw: &RawEquivalence) -> CharacteristicKind {
    if raw.target_values.is_numeric_shape()
        || raw.blocking_values.is_numeric_shape()
        || raw.unit.is_some()
    {
        CharacteristicKind::Numeric
    } else {
        CharacteristicKind::Textual
    }
}

impl RawEquivalence {
    /// Explicit kind when it parses, otherwise inferred.
    pub fn resolved_kind(&self) -> CharacteristicKind {
        self.kind
            .as_deref()
            .and_then(CharacteristicKind::parse)
            .unwrap_or_else(|| infer_kind(self))
    }

    pub fn resolved_priority(&self) -> Priority {
        self.poids
            .as_deref()
            .or(self.priority.as_deref())
            .map(Priority::parse)
            .unwrap_or_default()
    }
}

impl From<RawEquivalence> for Equivalence {
    fn from(raw: RawEquivalence) -> Self {
        for (side, values) in [("target", &raw.target_values), ("blocking", &raw.blocking_values)] {
            if let RawValues::Other(v) = values {
                debug!(
                    characteristic_id = raw.characteristic_id,
                    side,
                    value = %v,
                    "ignoring unsupported value shape"
                );
            }
        }
        let priority = raw.resolved_priority();
        let values = match raw.resolved_kind() {
            CharacteristicKind::Textual => CriterionValues::Textual {
                target_values: raw.target_values.ids(),
                blocking_values: raw.blocking_values.ids(),
            },
            CharacteristicKind::Numeric => {
                let t = raw.target_values.range();
                let b = raw.blocking_values.range();
                CriterionValues::Numeric {
                    target_values: NumericTarget {
                        exact: t.exact,
                        min: t.min,
                        max: t.max,
                    },
                    blocking_values: NumericBound {
                        min: b.min,
                        max: b.max,
                    },
                }
            }
        };
        Equivalence {
            characteristic_id: raw.characteristic_id,
            priority,
            values,
            unit: raw.unit,
        }
    }
}

/// All dynamic answers of one questionnaire session, keyed by question code.
///
/// Question order is the `Q<n>` ordinal when the code has one, otherwise the
/// order in which the question was first recorded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerSet {
    questions: Vec<(String, Vec<Equivalence>)>,
}

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or replace) the equivalences of one question.
    pub fn insert(&mut self, code: impl Into<String>, equivalences: Vec<Equivalence>) {
        let code = code.into();
        match self.questions.iter_mut().find(|(c, _)| *c == code) {
            Some((_, slot)) => *slot = equivalences,
            None => self.questions.push((code, equivalences)),
        }
    }

    /// Builder-style [`AnswerSet::insert`].
    pub fn with(mut self, code: impl Into<String>, equivalences: Vec<Equivalence>) -> Self {
        self.insert(code, equivalences);
        self
    }

    pub fn remove(&mut self, code: &str) -> Option<Vec<Equivalence>> {
        let pos = self.questions.iter().position(|(c, _)| c == code)?;
        Some(self.questions.remove(pos).1)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Equivalence])> {
        self.questions.iter().map(|(c, e)| (c.as_str(), e.as_slice()))
    }

    /// Questions in questionnaire order.
    fn ordered(&self) -> Vec<&(String, Vec<Equivalence>)> {
        let mut keyed: Vec<_> = self
            .questions
            .iter()
            .enumerate()
            .map(|(pos, q)| ((question_ordinal(&q.0).unwrap_or(u32::MAX), pos), q))
            .collect();
        keyed.sort_by_key(|(k, _)| *k);
        keyed.into_iter().map(|(_, q)| q).collect()
    }

    /// Flatten every equivalence, stamping it with `N - rank` where `rank` is
    /// the 0-based position of its question among the N answered questions.
    pub fn weighted(&self) -> Vec<WeightedEquivalence> {
        let total = self.questions.len() as u32;
        let mut out = Vec::new();
        for (rank, (code, equivalences)) in self.ordered().into_iter().enumerate() {
            let question_weight = total - rank as u32;
            debug!(%code, question_weight, count = equivalences.len(), "weighting question");
            out.extend(equivalences.iter().cloned().map(|equivalence| WeightedEquivalence {
                equivalence,
                question_weight,
            }));
        }
        out
    }
}

/// `Q7` → 7; anything else has no ordinal.
fn question_ordinal(code: &str) -> Option<u32> {
    let digits = code.trim().strip_prefix(['Q', 'q'])?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

impl<'de> Deserialize<'de> for AnswerSet {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        struct AnswerSetVisitor;

        impl<'de> Visitor<'de> for AnswerSetVisitor {
            type Value = AnswerSet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of question code to equivalence list")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<AnswerSet, A::Error> {
                let mut set = AnswerSet::new();
                while let Some((code, raws)) = map.next_entry::<String, Option<Vec<RawEquivalence>>>()? {
                    let equivalences = raws
                        .unwrap_or_default()
                        .into_iter()
                        .map(Equivalence::from)
                        .collect();
                    set.insert(code, equivalences);
                }
                Ok(set)
            }
        }

        d.deserialize_map(AnswerSetVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(v: serde_json::Value) -> RawEquivalence {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn infers_numeric_from_range_or_unit() {
        assert_eq!(
            infer_kind(&raw(json!({"id_caracteristique": 1, "valeurs_cibles": {"min": 3}}))),
            CharacteristicKind::Numeric
        );
        assert_eq!(
            infer_kind(&raw(json!({"id_caracteristique": 1, "valeurs_bloquantes": {"max": 3}}))),
            CharacteristicKind::Numeric
        );
        assert_eq!(
            infer_kind(&raw(json!({"id_caracteristique": 1, "valeurs_cibles": [], "unite": "mm"}))),
            CharacteristicKind::Numeric
        );
    }

    #[test]
    fn infers_textual_otherwise() {
        assert_eq!(
            infer_kind(&raw(json!({"id_caracteristique": "4", "valeurs_cibles": ["5", 6]}))),
            CharacteristicKind::Textual
        );
        // An object without any bound is not a numeric shape.
        assert_eq!(
            infer_kind(&raw(json!({"id_caracteristique": 4, "valeurs_cibles": {}}))),
            CharacteristicKind::Textual
        );
    }

    #[test]
    fn priority_prefers_poids_and_defaults_to_secondary() {
        let r = raw(json!({"id_caracteristique": 1, "poids": "Critique", "poids_caracteristique": "secondaire"}));
        assert_eq!(r.resolved_priority(), Priority::Critical);
        let r = raw(json!({"id_caracteristique": 1}));
        assert_eq!(r.resolved_priority(), Priority::Secondary);
        let r = raw(json!({"id_caracteristique": 1, "poids_caracteristique": "bizarre"}));
        assert_eq!(r.resolved_priority(), Priority::Secondary);
    }

    #[test]
    fn converts_to_typed_equivalence() {
        let e: Equivalence = raw(json!({
            "id_caracteristique": "20",
            "unite": "kg",
            "valeurs_cibles": {"min": "500"},
            "valeurs_bloquantes": {"max": 100}
        }))
        .into();
        assert_eq!(e.characteristic_id, 20);
        assert_eq!(
            e.values,
            CriterionValues::Numeric {
                target_values: NumericTarget::range(Some(500.0), None),
                blocking_values: NumericBound {
                    min: None,
                    max: Some(100.0)
                },
            }
        );
        assert_eq!(e.unit.as_deref(), Some("kg"));
    }

    #[test]
    fn odd_value_shapes_read_as_empty() {
        let set: AnswerSet = serde_json::from_value(json!({
            "Q1": [{"id_caracteristique": 10, "poids": "Critique", "valeurs_cibles": [5]}],
            "Q2": [
                {"id_caracteristique": 11, "valeurs_cibles": "7"},
                {"id_caracteristique": 12, "valeurs_cibles": true, "valeurs_bloquantes": 3}
            ]
        }))
        .unwrap();
        assert_eq!(set.len(), 2);
        let weighted = set.weighted();
        assert_eq!(weighted.len(), 3);
        assert_eq!(
            weighted[0].equivalence,
            Equivalence::textual(10, Priority::Critical, vec![5], vec![])
        );
        assert_eq!(
            weighted[2].equivalence,
            Equivalence::textual(12, Priority::Secondary, vec![], vec![])
        );
    }

    #[test]
    fn explicit_kind_beats_shape() {
        let r = raw(json!({"id_caracteristique": 1, "type_caracteristique": "Numérique", "valeurs_cibles": []}));
        assert_eq!(infer_kind(&r), CharacteristicKind::Textual);
        assert_eq!(r.resolved_kind(), CharacteristicKind::Numeric);

        let r = raw(json!({"id_caracteristique": 1, "type_caracteristique": "textuelle", "valeurs_cibles": {"min": 3}}));
        assert_eq!(r.resolved_kind(), CharacteristicKind::Textual);
        let e: Equivalence = r.into();
        assert_eq!(e.values, CriterionValues::Textual { target_values: vec![], blocking_values: vec![] });
    }

    #[test]
    fn unknown_kind_falls_back_to_inference() {
        let r = raw(json!({"id_caracteristique": 1, "type_caracteristique": "booléen", "valeurs_cibles": {"max": 9}}));
        assert_eq!(r.resolved_kind(), CharacteristicKind::Numeric);
        let r = raw(json!({"id_caracteristique": 1, "type_caracteristique": "", "valeurs_cibles": [2]}));
        assert_eq!(r.resolved_kind(), CharacteristicKind::Textual);
    }

    #[test]
    fn question_codes_order_weights() {
        let set: AnswerSet = serde_json::from_value(json!({
            "Q2": [{"id_caracteristique": 2, "valeurs_cibles": [1]}],
            "Q10": [{"id_caracteristique": 10, "valeurs_cibles": [1]}],
            "Q1": [{"id_caracteristique": 1, "valeurs_cibles": [1]}]
        }))
        .unwrap();
        let weights: Vec<(i64, u32)> = set
            .weighted()
            .iter()
            .map(|w| (w.equivalence.characteristic_id, w.question_weight))
            .collect();
        assert_eq!(weights, vec![(1, 3), (2, 2), (10, 1)]);
    }

    #[test]
    fn insert_replaces_previous_answer() {
        let mut set = AnswerSet::new();
        set.insert("Q1", vec![Equivalence::textual(1, Priority::Secondary, vec![1], vec![])]);
        set.insert("Q1", vec![Equivalence::textual(1, Priority::Secondary, vec![2], vec![])]);
        assert_eq!(set.len(), 1);
        assert!(set.remove("Q1").is_some());
        assert!(set.is_empty());
    }
}
