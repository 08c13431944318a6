// src/lib.rs
// Public library surface for the service binary and integration tests.

pub mod api;
pub mod config;
pub mod criteria;
pub mod matching;
pub mod metrics;
pub mod pipeline;
pub mod registry;
pub mod telemetry;

mod lenient;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::criteria::{consolidate, infer_kind, AnswerSet, ConsolidatedCharacteristic, Priority};
pub use crate::matching::{enrich, normalize, EnrichedProduct, NormalizedMatching, NormalizedProduct};
pub use crate::registry::{CharacteristicDefinition, CharacteristicKind, Registry};
