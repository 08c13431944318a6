// src/criteria/mod.rs
//! Buyer criteria: typed equivalences collected from questionnaire answers and
//! the consolidated requirement profile built from them.
//!
//! Raw answer payloads are validated once in [`ingest`] into the closed
//! [`CriterionValues`] union; [`consolidate`] merges them; [`tags`] renders
//! the result for "your criteria" chips.

pub mod consolidate;
pub mod ingest;
pub mod tags;

use serde::{Deserialize, Serialize};

use crate::registry::{CharacteristicKind, Registry};

pub use crate::criteria::consolidate::{consolidate, ConsolidatedCharacteristic};
pub use crate::criteria::ingest::{infer_kind, AnswerSet, RawEquivalence, RawValues};
pub use crate::criteria::tags::{criteria_tags, CriterionTag};

/// Requirement tier. Critical dominates when tiers conflict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[serde(alias = "critique", alias = "Critique", alias = "Critical")]
    Critical,
    #[default]
    #[serde(alias = "secondaire", alias = "Secondaire", alias = "Secondary")]
    Secondary,
}

impl Priority {
    /// Anything that is not a spelling of "critical" is Secondary.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "critique" | "critical" => Self::Critical,
            _ => Self::Secondary,
        }
    }

    pub fn is_critical(self) -> bool {
        matches!(self, Self::Critical)
    }
}

/// Numeric target: either an exact value or a (half-)open range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl NumericTarget {
    pub fn exact(v: f64) -> Self {
        Self {
            exact: Some(v),
            ..Self::default()
        }
    }

    pub fn range(min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            exact: None,
            min,
            max,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_none() && self.min.is_none() && self.max.is_none()
    }

    /// `5 kg`, `10–100 kg`, `≥10 kg`, `≤100 kg`; exact takes precedence.
    /// `None` when no bound is set.
    pub fn describe(&self, unit: Option<&str>) -> Option<String> {
        let suffix = unit.map(|u| format!(" {u}")).unwrap_or_default();
        let body = match (self.exact, self.min, self.max) {
            (Some(e), _, _) => format!("{e}"),
            (None, Some(lo), Some(hi)) => format!("{lo}–{hi}"),
            (None, Some(lo), None) => format!("≥{lo}"),
            (None, None, Some(hi)) => format!("≤{hi}"),
            (None, None, None) => return None,
        };
        Some(format!("{body}{suffix}"))
    }
}

/// Numeric exclusion range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericBound {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl NumericBound {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Target and blocking values, one shape per characteristic kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum CriterionValues {
    Textual {
        #[serde(default)]
        target_values: Vec<i64>,
        #[serde(default)]
        blocking_values: Vec<i64>,
    },
    Numeric {
        #[serde(default)]
        target_values: NumericTarget,
        #[serde(default)]
        blocking_values: NumericBound,
    },
}

impl CriterionValues {
    pub fn kind(&self) -> CharacteristicKind {
        match self {
            Self::Textual { .. } => CharacteristicKind::Textual,
            Self::Numeric { .. } => CharacteristicKind::Numeric,
        }
    }

    /// Human-readable target for `characteristic_id`, or `None` when nothing is resolvable.
    pub fn describe_target(
        &self,
        registry: &Registry,
        characteristic_id: i64,
        unit: Option<&str>,
    ) -> Option<String> {
        match self {
            Self::Textual { target_values, .. } => {
                if target_values.is_empty() {
                    return None;
                }
                Some(registry.value_labels(characteristic_id, target_values).join(", "))
            }
            Self::Numeric { target_values, .. } => {
                let unit = unit.or_else(|| registry.characteristic_unit(characteristic_id));
                target_values.describe(unit)
            }
        }
    }
}

/// One characteristic requirement implied by one answer, after ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct Equivalence {
    pub characteristic_id: i64,
    pub priority: Priority,
    pub values: CriterionValues,
    pub unit: Option<String>,
}

impl Equivalence {
    pub fn textual(
        characteristic_id: i64,
        priority: Priority,
        target_values: Vec<i64>,
        blocking_values: Vec<i64>,
    ) -> Self {
        Self {
            characteristic_id,
            priority,
            values: CriterionValues::Textual {
                target_values,
                blocking_values,
            },
            unit: None,
        }
    }

    pub fn numeric(
        characteristic_id: i64,
        priority: Priority,
        target_values: NumericTarget,
        blocking_values: NumericBound,
        unit: Option<&str>,
    ) -> Self {
        Self {
            characteristic_id,
            priority,
            values: CriterionValues::Numeric {
                target_values,
                blocking_values,
            },
            unit: unit.map(str::to_string),
        }
    }

    pub fn kind(&self) -> CharacteristicKind {
        self.values.kind()
    }
}

/// An equivalence stamped with the weight of the question that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedEquivalence {
    pub equivalence: Equivalence,
    pub question_weight: u32,
}
