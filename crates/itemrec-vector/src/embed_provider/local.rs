//! Provider backed by an in-process [`Embedder`] from `itemrec-embed`.
//!
//! Respects `APP_USE_FAKE_EMBEDDINGS=1` (through `get_default_embedder`) to
//! switch to the hashing embedder for fast, deterministic outputs.
use anyhow::Result;
use tracing::warn;

use itemrec_core::config::EmbeddingSettings;
use itemrec_core::Embedder;
use itemrec_embed::{get_default_embedder, placeholder_vector};

use super::{EmbedProvider, Embedded};
use crate::similarity::normalize;

pub struct LocalProvider {
    inner: Box<dyn Embedder>,
    id: String,
    dim: usize,
}

impl LocalProvider {
    /// Wrap an embedder. `dim` is the dimension every output is held to.
    pub fn new(inner: Box<dyn Embedder>, dim: usize) -> Self {
        let id = format!("local:{}", inner.embedder_id());
        Self { inner, id, dim }
    }

    /// Load the configured default embedder.
    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self> {
        let inner = get_default_embedder(settings)?;
        Ok(Self::new(inner, settings.dimension))
    }

    fn accept(&self, text: &str, produced: Result<Vec<f32>>) -> Embedded {
        match produced {
            Ok(vector) if vector.len() == self.dim && !vector.iter().all(|x| x.is_finite()) => {
                warn!("embedding has non-finite values, using placeholder");
                self.placeholder(text)
            }
            Ok(mut vector) if vector.len() == self.dim => {
                normalize(&mut vector);
                Embedded { vector, degraded: false }
            }
            Ok(vector) => {
                warn!(expected = self.dim, actual = vector.len(), "embedding has wrong dimension, using placeholder");
                self.placeholder(text)
            }
            Err(e) => {
                warn!(error = %e, "embedding failed, using placeholder");
                self.placeholder(text)
            }
        }
    }

    fn placeholder(&self, text: &str) -> Embedded {
        Embedded { vector: placeholder_vector(text, self.dim), degraded: true }
    }
}

impl EmbedProvider for LocalProvider {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Vec<Embedded> {
        if texts.is_empty() {
            return Vec::new();
        }
        match self.inner.embed_batch(texts) {
            Ok(vectors) if vectors.len() == texts.len() => texts
                .iter()
                .zip(vectors)
                .map(|(t, v)| self.accept(t, Ok(v)))
                .collect(),
            Ok(vectors) => {
                warn!(expected = texts.len(), actual = vectors.len(), "batch size mismatch, embedding one by one");
                texts.iter().map(|t| self.accept(t, self.inner.embed_text(t))).collect()
            }
            Err(e) => {
                warn!(error = %e, batch = texts.len(), "batch embedding failed, embedding one by one");
                texts.iter().map(|t| self.accept(t, self.inner.embed_text(t))).collect()
            }
        }
    }
}
