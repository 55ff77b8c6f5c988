use itemrec_core::config::EmbeddingSettings;
use itemrec_embed::{get_default_embedder, Embedder, HashEmbedder};

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[test]
fn fake_embedder_shapes_and_determinism() {
    let settings = EmbeddingSettings { use_fake: true, ..EmbeddingSettings::default() };
    let embedder = get_default_embedder(&settings).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 384, "embedding dim is 384");
    assert_eq!(embedder.dim(), 384);

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) {
        assert!((a - b).abs() <= 1e-6);
    }
}

#[test]
fn shared_tokens_score_higher_than_disjoint_text() {
    let e = HashEmbedder::new(384);
    let q = e.embed_text("wooden dining table").unwrap();
    let table = e.embed_text("Modern Wooden Dining Table, Oak Finish").unwrap();
    let sofa = e.embed_text("Premium Black Leather Sofa, 3-Seater").unwrap();
    assert!(cosine(&q, &table) > cosine(&q, &sofa));
}

#[test]
fn empty_text_yields_zero_vector_of_full_dimension() {
    let e = HashEmbedder::new(16);
    let v = e.embed_text("").unwrap();
    assert_eq!(v.len(), 16);
    assert!(v.iter().all(|x| *x == 0.0));
}
