use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::config::FunnelConfig;
use crate::criteria::{consolidate, criteria_tags, AnswerSet, ConsolidatedCharacteristic, CriterionTag};
use crate::matching::{
    enrich, normalize, EnrichedProduct, MatchingProduct, NormalizedMatching, NormalizedProduct,
    ProductInfo,
};
use crate::pipeline::{self, PipelineInput, PipelineOutput};
use crate::registry::Registry;

#[derive(Clone)]
pub struct AppState {
    config: Arc<FunnelConfig>,
}

impl AppState {
    pub fn new(config: FunnelConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

/// Build the HTTP router (plus `/metrics`).
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/consolidate", post(consolidate_handler))
        .route("/normalize", post(normalize_handler))
        .route("/enrich", post(enrich_handler))
        .route("/pipeline", post(pipeline_handler))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
        .merge(crate::metrics::router())
}

/// Decoding failure of a request body: the caller broke the contract.
pub struct ApiError(anyhow::Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(error = %format!("{:#}", self.0), "rejected request");
        let body = serde_json::json!({ "error": format!("{:#}", self.0) });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

fn decode<T: DeserializeOwned>(body: &Bytes, what: &str) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError(anyhow::Error::new(e).context(format!("decoding {what}"))))
}

#[derive(Deserialize)]
struct ConsolidateReq {
    #[serde(default)]
    answers: AnswerSet,
    #[serde(default)]
    registry: Option<Registry>,
}

#[derive(Serialize)]
struct ConsolidateResp {
    requirements: Vec<ConsolidatedCharacteristic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<Vec<CriterionTag>>,
}

async fn consolidate_handler(body: Bytes) -> Result<Json<ConsolidateResp>, ApiError> {
    let req: ConsolidateReq = decode(&body, "consolidate request")?;
    let requirements = consolidate(&req.answers);
    let tags = req.registry.map(|r| criteria_tags(&requirements, &r));
    Ok(Json(ConsolidateResp { requirements, tags }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NormalizeReq {
    #[serde(alias = "top_products")]
    top_products: Vec<MatchingProduct>,
    #[serde(alias = "other_products", default)]
    other_products: Vec<MatchingProduct>,
    #[serde(default)]
    registry: Registry,
    #[serde(default)]
    requirements: Vec<ConsolidatedCharacteristic>,
}

async fn normalize_handler(body: Bytes) -> Result<Json<NormalizedMatching>, ApiError> {
    let req: NormalizeReq = decode(&body, "normalize request")?;
    Ok(Json(normalize(
        &req.top_products,
        &req.other_products,
        &req.registry,
        &req.requirements,
    )))
}

/// Accepts products fresh from `/normalize` or already enriched ones.
#[derive(Deserialize)]
#[serde(untagged)]
enum ProductIn {
    Enriched(Box<EnrichedProduct>),
    Normalized(NormalizedProduct),
}

#[derive(Deserialize)]
struct EnrichReq {
    products: Vec<ProductIn>,
    #[serde(default)]
    info: HashMap<String, ProductInfo>,
}

async fn enrich_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<EnrichedProduct>>, ApiError> {
    let req: EnrichReq = decode(&body, "enrich request")?;
    let products: Vec<EnrichedProduct> = req
        .products
        .into_iter()
        .map(|p| match p {
            ProductIn::Enriched(e) => *e,
            ProductIn::Normalized(n) => EnrichedProduct::placeholder(n, &state.config.display),
        })
        .collect();
    Ok(Json(enrich(products, &req.info)))
}

async fn pipeline_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PipelineOutput>, ApiError> {
    let input: PipelineInput = decode(&body, "pipeline request")?;
    Ok(Json(pipeline::run(&input, &state.config.display)))
}
