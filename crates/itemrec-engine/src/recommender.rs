//! Query recommendations: remote index first, local cosine ranking on any
//! remote failure.
//!
//! Each call walks `RemoteAttempt -> {RemoteServed | LocalFallback}` afresh.
//! The local path populates the embedding cache on first use.
use serde_json::Value;
use tracing::{debug, info, warn};

use itemrec_core::{Item, RetrievalSource, SimilarityMatch};
use itemrec_vector::{rank, Embedded, RemoteError, RemoteMatch};

use crate::context::AppContext;
use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq)]
pub struct Recommendations {
    pub matches: Vec<SimilarityMatch>,
    pub served_by: RetrievalSource,
}

impl AppContext {
    /// Rank catalog items against free text. Returns at most `top_k` matches.
    ///
    /// Remote unavailability never surfaces as an error; only internal
    /// failures (a panicked worker) do.
    pub async fn recommend(&self, query: &str, top_k: usize) -> Result<Recommendations, EngineError> {
        self.recommend_filtered(query, top_k, None).await
    }

    /// As [`AppContext::recommend`], passing `filter` to the remote index.
    /// The local path does not evaluate filters.
    pub async fn recommend_filtered(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&Value>,
    ) -> Result<Recommendations, EngineError> {
        let top_k = top_k.max(1);
        let embedded = {
            let cache = self.cache.clone();
            let text = query.to_string();
            tokio::task::spawn_blocking(move || cache.embed_query(&text)).await?
        };
        if embedded.degraded {
            warn!("query embedding is a placeholder, results are degraded");
        }

        match self.remote_attempt(&embedded, top_k, filter).await {
            Ok(matches) => {
                info!(served_by = "remote", results = matches.len(), "recommendations ready");
                return Ok(Recommendations { matches, served_by: RetrievalSource::Remote });
            }
            Err(RemoteError::NotConfigured) => debug!("no remote index, using local ranking"),
            Err(e) => warn!(error = %e, "remote query failed, falling back to local ranking"),
        }

        let ctx = self.clone();
        let matches = tokio::task::spawn_blocking(move || ctx.rank_locally(&embedded, top_k)).await?;
        info!(served_by = "local", results = matches.len(), "recommendations ready");
        Ok(Recommendations { matches, served_by: RetrievalSource::Local })
    }

    async fn remote_attempt(
        &self,
        embedded: &Embedded,
        top_k: usize,
        filter: Option<&Value>,
    ) -> Result<Vec<SimilarityMatch>, RemoteError> {
        let client = self.remote.as_ref().ok_or(RemoteError::NotConfigured)?;
        let matches = client.query(&embedded.vector, top_k, filter).await?;
        Ok(matches.iter().map(|m| self.reshape(m, embedded.degraded)).collect())
    }

    /// Prefer the loaded catalog's snapshot; fall back to the stored metadata
    /// for ids the local catalog does not know.
    fn reshape(&self, m: &RemoteMatch, degraded: bool) -> SimilarityMatch {
        let source_item: Item = self.catalog.get(&m.id).cloned().unwrap_or_else(|| m.to_item());
        SimilarityMatch { item_id: m.id.clone(), score: m.score, source_item, degraded }
    }

    /// Brute-force cosine ranking of the whole catalog.
    pub fn rank_locally(&self, query: &Embedded, top_k: usize) -> Vec<SimilarityMatch> {
        let table = self.cache.get_or_populate(&self.catalog);
        let items = self.catalog.items();
        rank(&query.vector, &table.vectors(), top_k)
            .into_iter()
            .map(|r| {
                let entry = &table.entries()[r.index];
                SimilarityMatch {
                    item_id: entry.item_id.clone(),
                    score: r.score,
                    source_item: items[r.index].clone(),
                    degraded: query.degraded || entry.degraded,
                }
            })
            .collect()
    }
}
