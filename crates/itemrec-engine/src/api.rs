//! Request/response payloads and the handlers that produce them.
//!
//! Empty results are successful responses; only internal failures become
//! an [`ApiError`] with a 500-class status.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::error;

use itemrec_core::analytics::{extract_keywords, summarize, CatalogSummary};
use itemrec_core::config::LimitSettings;
use itemrec_core::{ClusterAssignment, Item, RetrievalSource, SimilarityMatch};

use crate::category::by_category;
use crate::context::AppContext;
use crate::error::EngineError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Internal(_) => 500,
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody { status: self.status(), message: self.to_string() }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        error!(error = %e, "request failed");
        ApiError::Internal(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
}

/// Apply the default when `limit` is absent and clamp into `1..=max_limit`.
pub fn clamp_limit(limit: Option<usize>, limits: &LimitSettings) -> usize {
    limit.unwrap_or(limits.default_limit).clamp(1, limits.max_limit.max(1))
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecommendRequest {
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub filter: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendResponse {
    pub recommendations: Vec<SimilarityMatch>,
    pub query: String,
    pub total_found: usize,
    pub served_by: RetrievalSource,
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarResponse {
    pub item_id: String,
    pub similar_items: Vec<SimilarityMatch>,
    pub total_found: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponse {
    pub category: String,
    pub items: Vec<Item>,
    pub total_found: usize,
}

/// Runtime view of the embedding setup and the remote index wiring.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub embedder_id: String,
    pub dimension: usize,
    pub catalog_items: usize,
    pub cache_warm: bool,
    pub cache_populations: usize,
    pub degraded_vectors: usize,
    pub remote_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_index: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordsResponse {
    pub keywords: Vec<String>,
}

pub async fn recommend(ctx: &AppContext, req: RecommendRequest) -> Result<RecommendResponse, ApiError> {
    let query = req.query.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".into()));
    }
    let limit = clamp_limit(req.limit, &ctx.settings.limits);
    let recs = ctx.recommend_filtered(query, limit, req.filter.as_ref()).await?;
    Ok(RecommendResponse {
        total_found: recs.matches.len(),
        degraded: recs.matches.iter().any(|m| m.degraded),
        recommendations: recs.matches,
        query: query.to_string(),
        served_by: recs.served_by,
    })
}

/// Runs on the blocking pool: a cold cache embeds the whole catalog.
pub async fn similar(ctx: &AppContext, item_id: &str, limit: Option<usize>) -> Result<SimilarResponse, ApiError> {
    let limit = clamp_limit(limit, &ctx.settings.limits);
    let worker = ctx.clone();
    let id = item_id.to_string();
    let similar_items = tokio::task::spawn_blocking(move || worker.similar_to(&id, limit))
        .await
        .map_err(EngineError::from)?;
    Ok(SimilarResponse { item_id: item_id.to_string(), total_found: similar_items.len(), similar_items })
}

pub fn category(ctx: &AppContext, category: &str, limit: Option<usize>) -> CategoryResponse {
    let items = by_category(&ctx.catalog, category, clamp_limit(limit, &ctx.settings.limits));
    CategoryResponse { category: category.to_string(), total_found: items.len(), items }
}

/// `k` defaults to `cluster.k` from settings. Runs on the blocking pool.
pub async fn cluster(ctx: &AppContext, k: Option<usize>) -> Result<ClusterAssignment, ApiError> {
    let k = k.unwrap_or(ctx.settings.cluster.k);
    let worker = ctx.clone();
    let assignment = tokio::task::spawn_blocking(move || worker.cluster_catalog(k))
        .await
        .map_err(EngineError::from)?;
    Ok(assignment)
}

pub fn stats(ctx: &AppContext) -> CatalogSummary {
    summarize(&ctx.catalog)
}

/// Never touches the embedder; a cold cache stays cold.
pub fn status(ctx: &AppContext) -> StatusResponse {
    StatusResponse {
        embedder_id: ctx.cache.provider().embedder_id().to_string(),
        dimension: ctx.cache.dim(),
        catalog_items: ctx.catalog.len(),
        cache_warm: ctx.cache.is_warm(),
        cache_populations: ctx.cache.populations(),
        degraded_vectors: ctx.cache.degraded_count(),
        remote_configured: ctx.remote.is_some(),
        remote_index: ctx.remote.as_ref().map(|r| r.index_name().to_string()),
    }
}

pub fn keywords(text: &str, top_k: usize) -> KeywordsResponse {
    KeywordsResponse { keywords: extract_keywords(text, top_k) }
}
