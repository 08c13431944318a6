// src/matching/mod.rs
//! Scored product lists from the external matching engine, and the
//! buyer-facing records derived from them.

pub mod enrich;
pub mod normalize;

use serde::{Deserialize, Serialize};

use crate::lenient;
use crate::registry::CharacteristicKind;

pub use crate::matching::enrich::{enrich, DisplayDefaults, EnrichedProduct, ProductInfo};
pub use crate::matching::normalize::{
    normalize, normalize_response, NormalizedMatching, NormalizedProduct, SpecEntry,
};

/// Per-characteristic verdict. Wire encoding: 1=Match, 2=Gap, 3=Blocking, 4=NotProvided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MatchStatus {
    Match,
    Gap,
    Blocking,
    NotProvided,
}

impl TryFrom<u8> for MatchStatus {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Match),
            2 => Ok(Self::Gap),
            3 => Ok(Self::Blocking),
            4 => Ok(Self::NotProvided),
            other => Err(format!("unknown match status {other}")),
        }
    }
}

impl From<MatchStatus> for u8 {
    fn from(s: MatchStatus) -> u8 {
        match s {
            MatchStatus::Match => 1,
            MatchStatus::Gap => 2,
            MatchStatus::Blocking => 3,
            MatchStatus::NotProvided => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingCharacteristic {
    #[serde(alias = "id_caracteristique", deserialize_with = "lenient::id")]
    pub characteristic_id: i64,
    #[serde(alias = "statut_matching")]
    pub match_status: MatchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<CharacteristicKind>,
    #[serde(alias = "id_valeur", default, deserialize_with = "lenient::ids")]
    pub value_ids: Vec<i64>,
    #[serde(default, deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(alias = "unite", default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Contribution of this characteristic to the engine's score.
    #[serde(alias = "poids", default, deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl MatchingCharacteristic {
    pub fn new(characteristic_id: i64, match_status: MatchStatus, value_ids: Vec<i64>) -> Self {
        Self {
            characteristic_id,
            match_status,
            kind: None,
            value_ids,
            value: None,
            unit: None,
            weight: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingProduct {
    #[serde(alias = "id_produit", deserialize_with = "lenient::string_id")]
    pub product_id: String,
    #[serde(default)]
    pub score: f64,
    #[serde(alias = "rang", default)]
    pub rank: u32,
    #[serde(alias = "caracteristique", default)]
    pub characteristics: Vec<MatchingCharacteristic>,
    #[serde(alias = "top_produit", default)]
    pub is_top_pick: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_coefficients: Option<serde_json::Value>,
}

impl MatchingProduct {
    pub fn new(product_id: impl Into<String>, score: f64, rank: u32) -> Self {
        Self {
            product_id: product_id.into(),
            score,
            rank,
            characteristics: Vec::new(),
            is_top_pick: false,
            debug_coefficients: None,
        }
    }

    pub fn with_characteristic(mut self, c: MatchingCharacteristic) -> Self {
        self.characteristics.push(c);
        self
    }

    pub fn top_pick(mut self) -> Self {
        self.is_top_pick = true;
        self
    }

    /// First entry for `characteristic_id`, if the engine reported one.
    pub fn characteristic(&self, characteristic_id: i64) -> Option<&MatchingCharacteristic> {
        self.characteristics
            .iter()
            .find(|c| c.characteristic_id == characteristic_id)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MatchingPayload {
    /// Older single list, split on `top_produit`.
    Legacy { liste_produit: Vec<MatchingProduct> },
    Split {
        #[serde(alias = "topProducts", default)]
        top_products: Vec<MatchingProduct>,
        #[serde(alias = "otherProducts", default)]
        other_products: Vec<MatchingProduct>,
    },
}

/// Matching engine response: the primary recommendation set and the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "MatchingPayload", rename_all = "camelCase")]
pub struct MatchingResponse {
    pub top_products: Vec<MatchingProduct>,
    pub other_products: Vec<MatchingProduct>,
}

impl From<MatchingPayload> for MatchingResponse {
    fn from(p: MatchingPayload) -> Self {
        match p {
            MatchingPayload::Legacy { liste_produit } => {
                let (top_products, other_products) =
                    liste_produit.into_iter().partition(|p| p.is_top_pick);
                Self {
                    top_products,
                    other_products,
                }
            }
            MatchingPayload::Split {
                top_products,
                other_products,
            } => Self {
                top_products,
                other_products,
            },
        }
    }
}
