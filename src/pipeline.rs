//! # Pipeline
//! Runs the stages in their only valid order: consolidate the full answer
//! set, normalize the engine response against it, then enrich.
//! No I/O; the caller fetches the registry, matching response and product info.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing::info;

use crate::criteria::{consolidate, criteria_tags, AnswerSet, ConsolidatedCharacteristic, CriterionTag};
use crate::matching::{
    enrich, normalize_response, DisplayDefaults, EnrichedProduct, MatchingResponse, NormalizedProduct,
    ProductInfo,
};
use crate::registry::Registry;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineInput {
    #[serde(default)]
    pub answers: AnswerSet,
    /// Absent or empty registry degrades labels to `Characteristic #<id>`.
    #[serde(default)]
    pub registry: Registry,
    #[serde(default)]
    pub matching: MatchingResponse,
    #[serde(default)]
    pub info: HashMap<String, ProductInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutput {
    pub requirements: Vec<ConsolidatedCharacteristic>,
    pub tags: Vec<CriterionTag>,
    pub recommended: Vec<EnrichedProduct>,
    pub others: Vec<EnrichedProduct>,
}

pub fn run(input: &PipelineInput, display: &DisplayDefaults) -> PipelineOutput {
    let started = Instant::now();

    let requirements = consolidate(&input.answers);
    let tags = criteria_tags(&requirements, &input.registry);
    let normalized = normalize_response(&input.matching, &input.registry, &requirements);

    let wrap = |products: Vec<NormalizedProduct>| {
        let placeholders: Vec<EnrichedProduct> = products
            .into_iter()
            .map(|p| EnrichedProduct::placeholder(p, display))
            .collect();
        enrich(placeholders, &input.info)
    };
    let recommended = wrap(normalized.recommended);
    let others = wrap(normalized.others);

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    metrics::histogram!("pipeline_duration_ms").record(elapsed_ms);
    info!(
        requirements = requirements.len(),
        recommended = recommended.len(),
        others = others.len(),
        elapsed_ms,
        "pipeline run"
    );

    PipelineOutput {
        requirements,
        tags,
        recommended,
        others,
    }
}
