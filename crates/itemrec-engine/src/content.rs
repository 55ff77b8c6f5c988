//! Item-to-item ranking over the embedding cache.
use tracing::warn;

use itemrec_core::SimilarityMatch;
use itemrec_vector::similarity::{score_all, top_k, EXCLUDED_SCORE};

use crate::context::AppContext;

impl AppContext {
    /// Items closest to `item_id`, never including `item_id` itself.
    /// Unknown ids produce an empty list.
    pub fn similar_to(&self, item_id: &str, limit: usize) -> Vec<SimilarityMatch> {
        let Some(pos) = self.catalog.position(item_id) else {
            warn!(item_id, "similar_to: unknown item id");
            return Vec::new();
        };
        let table = self.cache.get_or_populate(&self.catalog);
        let reference = &table.entries()[pos];

        let mut scores = score_all(&reference.vector, &table.vectors());
        scores[pos] = EXCLUDED_SCORE;
        let items = self.catalog.items();
        top_k(scores.into_iter().enumerate(), table.len())
            .into_iter()
            .filter(|r| r.index != pos)
            .take(limit)
            .map(|r| {
                let entry = &table.entries()[r.index];
                SimilarityMatch {
                    item_id: entry.item_id.clone(),
                    score: r.score,
                    source_item: items[r.index].clone(),
                    degraded: reference.degraded || entry.degraded,
                }
            })
            .collect()
    }
}
