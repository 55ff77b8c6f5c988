/// Text embedding provider.
///
/// Implementations must return vectors of exactly `dim()` floats for every
/// input, in input order.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `minilm:d384`).
    fn embedder_id(&self) -> String;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed_text(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}
