//! Cluster the catalog's embeddings for exploratory grouping.
use std::collections::BTreeMap;

use tracing::{info, warn};

use itemrec_core::ClusterAssignment;
use itemrec_vector::{kmeans, KMeansParams};

use crate::context::AppContext;

impl AppContext {
    /// Partition the catalog into `k` groups (clamped for small catalogs).
    /// Any clustering failure yields [`ClusterAssignment::empty`].
    pub fn cluster_catalog(&self, k: usize) -> ClusterAssignment {
        let table = self.cache.get_or_populate(&self.catalog);
        let cfg = &self.settings.cluster;
        let params = KMeansParams { seed: cfg.seed, max_iter: cfg.max_iter, tolerance: cfg.tolerance };

        let clustering = match kmeans(&table.vectors(), k, &params) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, items = table.len(), k, "clustering failed");
                return ClusterAssignment::empty();
            }
        };

        let mut assignment = BTreeMap::new();
        let mut clusters: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, (entry, &label)) in table.entries().iter().zip(&clustering.labels).enumerate() {
            assignment.insert(entry.item_id.clone(), label);
            clusters.entry(label).or_default().push(i);
        }
        info!(
            n_clusters = clustering.n_clusters,
            cohesion = clustering.cohesion,
            iterations = clustering.iterations,
            "catalog clustered"
        );
        ClusterAssignment {
            n_clusters: clustering.n_clusters,
            cohesion: clustering.cohesion,
            assignment,
            clusters,
        }
    }
}
