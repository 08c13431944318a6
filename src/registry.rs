//! # Characteristic Registry
//!
//! Static lookup for one product category: characteristic id → display name,
//! unit, kind and (for textual characteristics) the enumerated value labels.
//!
//! - Loaded once per category and consumed read-only.
//! - Ingestion tolerates the backend's French field names (`nom`, `unite`,
//!   `valeurs`, `valeur`, `id_caracteristique`) and string-typed ids.
//! - Lookups never fail: unknown ids resolve to `Characteristic #<id>` /
//!   `Value #<id>` placeholders, so a missing or failed registry fetch
//!   degrades to id-based labels instead of breaking normalization.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::{collections::HashMap, fs, path::Path};

use crate::lenient;

/// Textual characteristics carry an enumerated value set; numeric ones a unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacteristicKind {
    #[default]
    #[serde(alias = "Textuelle", alias = "textuelle", alias = "Textual")]
    Textual,
    #[serde(
        alias = "Numérique",
        alias = "numérique",
        alias = "numerique",
        alias = "Numeric"
    )]
    Numeric,
}

impl CharacteristicKind {
    /// Case-insensitive parse of the spellings seen on the wire.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "textual" | "textuelle" | "text" => Some(Self::Textual),
            "numeric" | "numerique" | "numérique" | "number" => Some(Self::Numeric),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacteristicValue {
    #[serde(deserialize_with = "lenient::id")]
    pub id: i64,
    #[serde(alias = "valeur", default)]
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacteristicDefinition {
    #[serde(alias = "id_caracteristique", deserialize_with = "lenient::id")]
    pub id: i64,
    #[serde(alias = "nom", default)]
    pub name: String,
    #[serde(alias = "unite", default, deserialize_with = "lenient::opt_string")]
    pub unit: Option<String>,
    #[serde(alias = "type", default, deserialize_with = "lenient_kind")]
    pub kind: CharacteristicKind,
    #[serde(alias = "valeurs", default)]
    pub values: Vec<CharacteristicValue>,
}

fn lenient_kind<'de, D: Deserializer<'de>>(d: D) -> Result<CharacteristicKind, D::Error> {
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw
        .as_deref()
        .and_then(CharacteristicKind::parse)
        .unwrap_or_default())
}

/// Either a bare array or the backend envelope `{ "code": 200, "response": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RegistryPayload {
    List(Vec<CharacteristicDefinition>),
    Envelope { response: Vec<CharacteristicDefinition> },
}

/// Option entry for pickers (criteria edit forms, dropdowns).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueOption {
    pub id: i64,
    pub label: String,
}

/// Characteristic definitions keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    by_id: HashMap<i64, CharacteristicDefinition>,
}

impl<'de> Deserialize<'de> for Registry {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let defs = match RegistryPayload::deserialize(d)? {
            RegistryPayload::List(defs) => defs,
            RegistryPayload::Envelope { response } => response,
        };
        Ok(defs.into_iter().collect())
    }
}

impl FromIterator<CharacteristicDefinition> for Registry {
    fn from_iter<I: IntoIterator<Item = CharacteristicDefinition>>(iter: I) -> Self {
        // Later definitions win on duplicate ids.
        let by_id = iter.into_iter().map(|d| (d.id, d)).collect();
        Self { by_id }
    }
}

impl Registry {
    pub fn new(defs: impl IntoIterator<Item = CharacteristicDefinition>) -> Self {
        defs.into_iter().collect()
    }

    /// Parse a registry from JSON (array or envelope).
    pub fn from_json_str(s: &str) -> Result<Self> {
        let reg: Registry = serde_json::from_str(s).context("parsing characteristic registry")?;
        tracing::debug!(count = reg.len(), "registry parsed");
        Ok(reg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading registry from {}", path.display()))?;
        Self::from_json_str(&content)
    }

    pub fn get(&self, id: i64) -> Option<&CharacteristicDefinition> {
        self.by_id.get(&id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Display name, or `Characteristic #<id>` when unknown or unnamed.
    pub fn characteristic_label(&self, id: i64) -> String {
        match self.get(id) {
            Some(def) if !def.name.trim().is_empty() => def.name.clone(),
            _ => format!("Characteristic #{id}"),
        }
    }

    pub fn characteristic_unit(&self, id: i64) -> Option<&str> {
        self.get(id).and_then(|d| d.unit.as_deref())
    }

    pub fn characteristic_kind(&self, id: i64) -> Option<CharacteristicKind> {
        self.get(id).map(|d| d.kind)
    }

    /// Value label, or `Value #<value_id>` when the characteristic or value is unknown.
    pub fn value_label(&self, characteristic_id: i64, value_id: i64) -> String {
        self.get(characteristic_id)
            .and_then(|d| d.values.iter().find(|v| v.id == value_id))
            .map(|v| v.label.trim())
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Value #{value_id}"))
    }

    pub fn value_labels(&self, characteristic_id: i64, value_ids: &[i64]) -> Vec<String> {
        value_ids
            .iter()
            .map(|&v| self.value_label(characteristic_id, v))
            .collect()
    }

    /// All selectable values of a characteristic, in registry order.
    pub fn options(&self, characteristic_id: i64) -> Vec<ValueOption> {
        self.get(characteristic_id)
            .map(|d| {
                d.values
                    .iter()
                    .map(|v| ValueOption {
                        id: v.id,
                        label: v.label.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `12.5 kg`, or the bare number when the characteristic has no unit.
    pub fn format_numeric_value(&self, characteristic_id: i64, value: f64) -> String {
        with_unit(value, self.characteristic_unit(characteristic_id))
    }
}

pub(crate) fn with_unit(value: f64, unit: Option<&str>) -> String {
    match unit {
        Some(u) => format!("{value} {u}"),
        None => format!("{value}"),
    }
}
