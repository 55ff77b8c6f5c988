//! Embedding provider abstraction used by the cache and the orchestrator.
//!
//! Unlike the raw [`itemrec_core::Embedder`] trait, a provider never fails:
//! it returns one L2-normalized vector of exactly `dim()` floats per input
//! and flags the ones that had to be replaced by a placeholder.

/// One provider output.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedded {
    pub vector: Vec<f32>,
    pub degraded: bool,
}

pub trait EmbedProvider: Send + Sync {
    /// Stable identifier for the provider/model (e.g., `hash:d384`).
    fn embedder_id(&self) -> &str;
    /// Embedding dimensionality (D).
    fn dim(&self) -> usize;
    /// Embed a batch; the output has the same length and order as `texts`.
    fn embed_batch(&self, texts: &[String]) -> Vec<Embedded>;

    fn embed_one(&self, text: &str) -> Embedded {
        self.embed_batch(&[text.to_string()])
            .pop()
            .unwrap_or_else(|| Embedded {
                vector: itemrec_embed::placeholder_vector(text, self.dim()),
                degraded: true,
            })
    }
}

pub mod local;

pub use local::LocalProvider;
