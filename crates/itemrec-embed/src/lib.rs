//! Text embedding providers.
//!
//! [`MiniLmEmbedder`] runs a BERT-family sentence model (all-MiniLM-L6-v2,
//! 384-d) with candle: tokenize, forward, masked mean pooling, L2 norm.
//! [`HashEmbedder`] is the deterministic model-free stand-in.
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use itemrec_core::config::{expand_path, EmbeddingSettings};

pub mod device;
pub mod hashing;
pub mod pool;
pub mod tokenize;

pub use hashing::{placeholder_vector, HashEmbedder};
pub use itemrec_core::traits::Embedder;
pub use pool::masked_mean_l2;

pub struct MiniLmEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
    id: String,
}

impl MiniLmEmbedder {
    /// Load tokenizer, config and weights from `model_dir`.
    ///
    /// Weights are read from `model.safetensors`, falling back to `pytorch_model.bin`.
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = device::select_device();
        info!(model_dir = %model_dir.display(), "loading sentence embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

        let config_raw = std::fs::read_to_string(model_dir.join("config.json"))?;
        let config: BertConfig = serde_json::from_str(&config_raw)?;
        let dim = serde_json::from_str::<serde_json::Value>(&config_raw)?
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| anyhow!("config.json has no hidden_size"))? as usize;

        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DTYPE, &device);
        let model = BertModel::load(vb, &config)?;
        let id = format!(
            "minilm:{}:d{}",
            model_dir.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default(),
            dim
        );
        info!(dim, "sentence embedding model loaded");
        Ok(Self { model, tokenizer, device, dim, max_len, id })
    }

    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize::tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let emb: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        if emb.len() != self.dim {
            return Err(anyhow!("model produced {} values, expected {}", emb.len(), self.dim));
        }
        debug!(elapsed_ms = start.elapsed().as_millis() as u64, "embedded text");
        Ok(emb)
    }
}

impl Embedder for MiniLmEmbedder {
    fn embedder_id(&self) -> String {
        self.id.clone()
    }
    fn dim(&self) -> usize {
        self.dim
    }
    fn max_len(&self) -> usize {
        self.max_len
    }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_text(t)).collect()
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        return Ok(candle_core::safetensors::load(&safetensors, device)?);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    if pickle.exists() {
        let weights = candle_core::pickle::read_all(&pickle)?;
        return Ok(weights.into_iter().collect());
    }
    Err(anyhow!("No model.safetensors or pytorch_model.bin under {}", model_dir.display()))
}

/// Pick the provider from settings. `APP_USE_FAKE_EMBEDDINGS=1` (or
/// `embedding.use_fake`) selects the hashing embedder.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(settings.use_fake);
    if use_fake {
        info!(dim = settings.dimension, "using hashing embedder");
        return Ok(Box::new(HashEmbedder::new(settings.dimension)));
    }
    let model_dir = resolve_model_dir(&settings.model_dir)?;
    let model = MiniLmEmbedder::load(&model_dir, settings.max_len)?;
    if model.dim() != settings.dimension {
        return Err(anyhow!(
            "model dimension {} does not match embedding.dimension {}",
            model.dim(),
            settings.dimension
        ));
    }
    Ok(Box::new(model))
}

fn resolve_model_dir(configured: &str) -> Result<PathBuf> {
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            let p = expand_path(&dir);
            if p.exists() {
                info!(var, path = %p.display(), "using model dir from environment");
                return Ok(p);
            }
        }
    }
    let p = expand_path(configured);
    if p.exists() {
        return Ok(p);
    }
    Err(anyhow!("Could not locate embedding model directory '{}'", configured))
}
