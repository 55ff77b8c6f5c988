//! Lazily populated, process-wide table of catalog embeddings.
//!
//! The first caller on a cold cache embeds the whole catalog while holding
//! the init guard; concurrent callers wait on the guard and then read the
//! finished table. Readers only ever see a complete [`VectorTable`].
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

use tracing::{debug, info, warn};

use itemrec_core::{Catalog, ItemVector};

use crate::embed_provider::{EmbedProvider, Embedded};

/// Embeddings for one catalog, in catalog order.
#[derive(Debug, Clone)]
pub struct VectorTable {
    dim: usize,
    entries: Vec<ItemVector>,
    index_by_id: HashMap<String, usize>,
}

impl VectorTable {
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ItemVector] {
        &self.entries
    }

    pub fn get(&self, item_id: &str) -> Option<&ItemVector> {
        self.index_by_id.get(item_id).map(|&i| &self.entries[i])
    }

    pub fn vectors(&self) -> Vec<&[f32]> {
        self.entries.iter().map(|e| e.vector.as_slice()).collect()
    }

    pub fn degraded_count(&self) -> usize {
        self.entries.iter().filter(|e| e.degraded).count()
    }
}

pub struct EmbeddingCache {
    provider: Arc<dyn EmbedProvider>,
    batch_size: usize,
    state: RwLock<Option<Arc<VectorTable>>>,
    init: Mutex<()>,
    populations: AtomicUsize,
}

impl EmbeddingCache {
    pub fn new(provider: Arc<dyn EmbedProvider>, batch_size: usize) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
            state: RwLock::new(None),
            init: Mutex::new(()),
            populations: AtomicUsize::new(0),
        }
    }

    pub fn provider(&self) -> &Arc<dyn EmbedProvider> {
        &self.provider
    }

    pub fn dim(&self) -> usize {
        self.provider.dim()
    }

    pub fn is_warm(&self) -> bool {
        self.current().is_some()
    }

    /// How many times the catalog has been embedded since construction.
    pub fn populations(&self) -> usize {
        self.populations.load(Ordering::SeqCst)
    }

    /// Placeholder vectors in the current table; 0 while the cache is cold.
    pub fn degraded_count(&self) -> usize {
        self.current().map_or(0, |t| t.degraded_count())
    }

    /// Drop the table; the next access re-embeds the catalog.
    pub fn invalidate(&self) {
        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = None;
        info!("embedding cache invalidated");
    }

    /// Return the table, embedding `catalog` first if the cache is cold.
    pub fn get_or_populate(&self, catalog: &Catalog) -> Arc<VectorTable> {
        if let Some(table) = self.current() {
            return table;
        }
        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have finished while we waited on the guard.
        if let Some(table) = self.current() {
            return table;
        }
        let table = Arc::new(self.build(catalog));
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&table));
        self.populations.fetch_add(1, Ordering::SeqCst);
        table
    }

    /// Embed a free-text query with the same provider as the catalog.
    pub fn embed_query(&self, text: &str) -> Embedded {
        self.provider.embed_one(text)
    }

    fn current(&self) -> Option<Arc<VectorTable>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn build(&self, catalog: &Catalog) -> VectorTable {
        let start = Instant::now();
        let dim = self.provider.dim();
        info!(items = catalog.len(), dim, embedder = self.provider.embedder_id(), "populating embedding cache");

        let mut entries = Vec::with_capacity(catalog.len());
        for chunk in catalog.items().chunks(self.batch_size) {
            let texts: Vec<String> = chunk.iter().map(|i| i.embedding_text()).collect();
            let embedded = self.provider.embed_batch(&texts);
            if embedded.len() != chunk.len() {
                warn!(expected = chunk.len(), actual = embedded.len(), "provider returned a short batch");
            }
            for (n, item) in chunk.iter().enumerate() {
                let e = embedded.get(n).cloned().unwrap_or_else(|| Embedded {
                    vector: itemrec_embed::placeholder_vector(&texts[n], dim),
                    degraded: true,
                });
                entries.push(ItemVector {
                    item_id: item.id.clone(),
                    vector: e.vector,
                    normalized: true,
                    degraded: e.degraded,
                });
            }
            debug!(done = entries.len(), total = catalog.len(), "embedded batch");
        }

        let index_by_id = entries.iter().enumerate().map(|(i, e)| (e.item_id.clone(), i)).collect();
        let table = VectorTable { dim, entries, index_by_id };
        let degraded = table.degraded_count();
        if degraded > 0 {
            warn!(degraded, "some catalog items use placeholder vectors");
        }
        info!(
            items = table.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "embedding cache ready"
        );
        table
    }
}
