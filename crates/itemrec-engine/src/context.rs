//! Process state shared by every handler.
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use itemrec_core::config::{expand_path, Settings};
use itemrec_core::{Catalog, LoadReport};
use itemrec_vector::{EmbedProvider, EmbeddingCache, LocalProvider, RemoteIndexClient};

/// Built once at startup and passed by reference (or cheap clone) into
/// handlers. There are no globals: a test builds its own context.
#[derive(Clone)]
pub struct AppContext {
    pub settings: Arc<Settings>,
    pub catalog: Arc<Catalog>,
    pub cache: Arc<EmbeddingCache>,
    pub remote: Option<RemoteIndexClient>,
}

impl AppContext {
    pub fn new(
        settings: Settings,
        catalog: Catalog,
        provider: Arc<dyn EmbedProvider>,
        remote: Option<RemoteIndexClient>,
    ) -> Self {
        let cache = EmbeddingCache::new(provider, settings.embedding.batch_size);
        Self {
            settings: Arc::new(settings),
            catalog: Arc::new(catalog),
            cache: Arc::new(cache),
            remote,
        }
    }

    /// Load the catalog, the embedding provider and the remote client from
    /// `settings`. A remote client that cannot be built is logged and left out.
    pub fn from_settings(settings: Settings) -> Result<(Self, LoadReport)> {
        let path = expand_path(&settings.catalog.path);
        let (catalog, report) =
            Catalog::load(&path).with_context(|| format!("loading catalog from {}", path.display()))?;
        info!(
            items = report.loaded,
            quarantined = report.quarantined.len(),
            path = %path.display(),
            "catalog loaded"
        );

        let provider = LocalProvider::from_settings(&settings.embedding)?;
        let remote = match RemoteIndexClient::from_settings(&settings.remote) {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "remote index client unavailable, local ranking only");
                None
            }
        };
        Ok((Self::new(settings, catalog, Arc::new(provider), remote), report))
    }

    pub fn with_remote(mut self, remote: Option<RemoteIndexClient>) -> Self {
        self.remote = remote;
        self
    }
}
