use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use itemrec_core::traits::Embedder;

/// Deterministic bag-of-words embedder: each lowercased alphanumeric token
/// adds 1.0 to a hashed bucket, then the vector is L2-normalized.
///
/// Fast and model-free; used in tests and when `APP_USE_FAKE_EMBEDDINGS=1`.
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        if self.dim == 0 {
            return v;
        }
        let lowered = text.to_lowercase();
        for token in lowered.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let idx = (hasher.finish() % self.dim as u64) as usize;
            v[idx] += 1.0;
        }
        l2_normalize(&mut v);
        v
    }
}

impl Embedder for HashEmbedder {
    fn embedder_id(&self) -> String {
        format!("hash:d{}", self.dim)
    }
    fn dim(&self) -> usize {
        self.dim
    }
    fn max_len(&self) -> usize {
        usize::MAX
    }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

/// Stand-in vector used when the provider fails for `text`.
///
/// Values are uniform-looking in [0, 1) and depend only on `text` and `dim`,
/// so a degraded run is reproducible. They carry no semantic signal.
pub fn placeholder_vector(text: &str, dim: usize) -> Vec<f32> {
    let mut v: Vec<f32> = (0..dim)
        .map(|i| {
            let mut hasher = XxHash64::with_seed(i as u64);
            text.hash(&mut hasher);
            ((hasher.finish() >> 40) as f32) / ((1u64 << 24) as f32)
        })
        .collect();
    l2_normalize(&mut v);
    v
}

fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-12 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
