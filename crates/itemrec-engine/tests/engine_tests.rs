use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use itemrec_core::config::Settings;
use itemrec_core::{Catalog, Embedder, Item, RetrievalSource};
use itemrec_embed::HashEmbedder;
use itemrec_engine::api::{self, RecommendRequest};
use itemrec_engine::{AppContext, PopulateOptions};
use itemrec_vector::{LocalProvider, RemoteIndexClient};

const TABLE_ID: &str = "wooden-table-001";

fn fixture() -> PathBuf {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    root.ancestors().nth(2).unwrap_or(&root).join("test_data/catalog.csv")
}

fn context(remote: Option<RemoteIndexClient>) -> AppContext {
    let (catalog, _) = Catalog::load(&fixture()).unwrap();
    let provider = Arc::new(LocalProvider::new(Box::new(HashEmbedder::new(384)), 384));
    AppContext::new(Settings::default(), catalog, provider, remote)
}

fn item(id: &str, title: &str) -> Item {
    Item {
        id: id.into(),
        title: title.into(),
        brand: String::new(),
        price: "$10.00".into(),
        material: String::new(),
        categories: vec![],
        description: String::new(),
        image_refs: vec![],
    }
}

/// Model that never produces a vector.
struct Unavailable;

impl Embedder for Unavailable {
    fn embedder_id(&self) -> String {
        "unavailable".into()
    }
    fn dim(&self) -> usize {
        384
    }
    fn max_len(&self) -> usize {
        64
    }
    fn embed_batch(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        anyhow::bail!("model weights missing")
    }
}

fn remote_for(server: &MockServer) -> RemoteIndexClient {
    RemoteIndexClient::new(&server.uri(), Some("k".into()), "catalog-items", Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn local_fallback_puts_matching_table_first() -> anyhow::Result<()> {
    let ctx = context(None);
    let recs = ctx.recommend("wooden dining table", 3).await?;
    assert_eq!(recs.served_by, RetrievalSource::Local);
    assert_eq!(recs.matches.len(), 3);
    assert_eq!(recs.matches[0].item_id, TABLE_ID);
    assert_eq!(recs.matches[0].source_item.title, "Modern Wooden Dining Table, Oak Finish");
    assert!(recs.matches.iter().all(|m| !m.degraded));
    Ok(())
}

#[tokio::test]
async fn result_count_never_exceeds_limit() -> anyhow::Result<()> {
    let ctx = context(None);
    for k in 1..=7 {
        let recs = ctx.recommend("leather", k).await?;
        assert!(recs.matches.len() <= k);
        assert!(recs.matches.windows(2).all(|w| w[0].score >= w[1].score));
    }
    Ok(())
}

#[tokio::test]
async fn identical_local_calls_are_deterministic() -> anyhow::Result<()> {
    let ctx = context(None);
    let a = ctx.recommend("black leather seating", 5).await?;
    let b = ctx.recommend("black leather seating", 5).await?;
    assert_eq!(a, b);
    assert_eq!(ctx.cache.populations(), 1);
    Ok(())
}

#[tokio::test]
async fn remote_503_falls_back_to_local() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = context(Some(remote_for(&server)));
    let resp = api::recommend(&ctx, RecommendRequest { query: "wooden dining table".into(), limit: Some(2), filter: None }).await?;
    assert_eq!(resp.served_by, RetrievalSource::Local);
    assert!(resp.total_found <= 2);
    assert_eq!(resp.recommendations[0].item_id, TABLE_ID);
    Ok(())
}

#[tokio::test]
async fn remote_success_is_served_as_is() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "matches": [
                {"id": "leather-sofa-001", "score": 0.77, "metadata": {"title": "ignored"}},
                {"id": "remote-only", "score": 0.55, "metadata": {"title": "Remote Lamp", "categories": "['Lighting']"}}
            ]
        })))
        .mount(&server)
        .await;

    let ctx = context(Some(remote_for(&server)));
    let recs = ctx.recommend("sofa", 5).await?;
    assert_eq!(recs.served_by, RetrievalSource::Remote);
    assert_eq!(recs.matches.len(), 2);
    assert_eq!(recs.matches[0].source_item.title, "Premium Black Leather Sofa, 3-Seater");
    assert_eq!(recs.matches[1].source_item.categories, vec!["Lighting"]);
    assert!(!ctx.cache.is_warm());
    Ok(())
}

#[tokio::test]
async fn slow_remote_times_out_and_falls_back_to_local() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"matches": [{"id": "leather-sofa-001", "score": 0.9}]}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let remote = RemoteIndexClient::new(&server.uri(), Some("k".into()), "catalog-items", Duration::from_millis(50))?;
    let ctx = context(Some(remote));
    let req = RecommendRequest { query: "wooden dining table".into(), limit: Some(3), filter: None };
    let resp = api::recommend(&ctx, req).await?;
    assert_eq!(resp.served_by, RetrievalSource::Local);
    assert_eq!(resp.recommendations[0].item_id, TABLE_ID);
    assert!(ctx.cache.is_warm());
    Ok(())
}

#[tokio::test]
async fn failing_embedder_marks_response_degraded() -> anyhow::Result<()> {
    let (catalog, _) = Catalog::load(&fixture())?;
    let provider = Arc::new(LocalProvider::new(Box::new(Unavailable), 384));
    let ctx = AppContext::new(Settings::default(), catalog, provider, None);

    let req = RecommendRequest { query: "oak table".into(), limit: Some(4), filter: None };
    let resp = api::recommend(&ctx, req).await?;
    assert_eq!(resp.served_by, RetrievalSource::Local);
    assert!(resp.degraded);
    assert_eq!(resp.total_found, 4);
    assert!(resp.recommendations.iter().all(|m| m.degraded && m.score.is_finite()));
    assert_eq!(api::status(&ctx).degraded_vectors, 5);
    Ok(())
}

#[tokio::test]
async fn status_reflects_cache_lifecycle() -> anyhow::Result<()> {
    let ctx = context(None);
    let cold = api::status(&ctx);
    assert_eq!(cold.embedder_id, "local:hash:d384");
    assert_eq!(cold.dimension, 384);
    assert_eq!(cold.catalog_items, 5);
    assert!(!cold.cache_warm);
    assert_eq!(cold.cache_populations, 0);
    assert!(!cold.remote_configured);
    assert!(cold.remote_index.is_none());

    ctx.recommend("leather sofa", 2).await?;
    let warm = api::status(&ctx);
    assert!(warm.cache_warm);
    assert_eq!(warm.cache_populations, 1);
    assert_eq!(warm.degraded_vectors, 0);

    let body = serde_json::to_value(&warm)?;
    assert_eq!(body["cacheWarm"], json!(true));
    assert!(body.get("remoteIndex").is_none());
    Ok(())
}

#[tokio::test]
async fn status_names_the_remote_index() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let ctx = context(Some(remote_for(&server)));
    let status = api::status(&ctx);
    assert!(status.remote_configured);
    assert_eq!(status.remote_index.as_deref(), Some("catalog-items"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_fallbacks_populate_the_cache_once() -> anyhow::Result<()> {
    let ctx = context(None);
    let calls = (0..6).map(|_| {
        let ctx = ctx.clone();
        tokio::spawn(async move { ctx.recommend("shoe rack", 2).await })
    });
    for handle in calls.collect::<Vec<_>>() {
        assert!(handle.await??.matches.len() <= 2);
    }
    assert_eq!(ctx.cache.populations(), 1);
    Ok(())
}

#[test]
fn similar_to_never_returns_the_reference() {
    let ctx = context(None);
    for item in ctx.catalog.items() {
        let similar = ctx.similar_to(&item.id, 10);
        assert_eq!(similar.len(), ctx.catalog.len() - 1);
        assert!(similar.iter().all(|m| m.item_id != item.id));
    }
    assert_eq!(ctx.similar_to(TABLE_ID, 2).len(), 2);
}

#[tokio::test]
async fn similar_to_unknown_id_is_empty() -> anyhow::Result<()> {
    let ctx = context(None);
    assert!(ctx.similar_to("unknown-id", 5).is_empty());
    let resp = api::similar(&ctx, "unknown-id", Some(5)).await?;
    assert_eq!(resp.total_found, 0);
    assert!(!ctx.cache.is_warm());
    Ok(())
}

#[tokio::test]
async fn similar_handler_ranks_on_the_blocking_pool() -> anyhow::Result<()> {
    let ctx = context(None);
    let resp = api::similar(&ctx, TABLE_ID, Some(3)).await?;
    assert_eq!(resp.item_id, TABLE_ID);
    assert_eq!(resp.total_found, 3);
    assert!(resp.similar_items.iter().all(|m| m.item_id != TABLE_ID));
    assert_eq!(ctx.cache.populations(), 1);
    Ok(())
}

#[test]
fn similar_to_excludes_reference_among_identical_vectors() {
    let catalog = Catalog::from_items(vec![
        item("twin-a", "walnut bookshelf"),
        item("twin-b", "walnut bookshelf"),
        item("twin-c", "walnut bookshelf"),
        item("other", "garden hose reel"),
    ]);
    let provider = Arc::new(LocalProvider::new(Box::new(HashEmbedder::new(64)), 64));
    let ctx = AppContext::new(Settings::default(), catalog, provider, None);

    let similar = ctx.similar_to("twin-b", 10);
    assert_eq!(similar.len(), 3);
    assert!(similar.iter().all(|m| m.item_id != "twin-b"));
    let ids: Vec<&str> = similar.iter().map(|m| m.item_id.as_str()).collect();
    assert_eq!(&ids[..2], &["twin-a", "twin-c"]);
    assert!((similar[0].score - 1.0).abs() < 1e-5);
    assert!((similar[1].score - 1.0).abs() < 1e-5);
}

#[test]
fn category_filter_only_returns_matching_items() {
    let ctx = context(None);
    let resp = api::category(&ctx, "furniture", None);
    assert_eq!(resp.total_found, 3);
    assert!(resp
        .items
        .iter()
        .all(|i| i.categories.iter().any(|c| c.to_lowercase().contains("furniture"))));
    assert_eq!(api::category(&ctx, "Lawn & Garden", Some(1)).items.len(), 1);
}

#[tokio::test]
async fn clustering_small_catalog_clamps_k() -> anyhow::Result<()> {
    let ctx = context(None);
    let result = api::cluster(&ctx, Some(10)).await?;
    assert_eq!(result.n_clusters, 2);
    assert!((-1.0..=1.0).contains(&result.cohesion));
    assert_eq!(result.assignment.len(), 5);
    assert_eq!(result.clusters.values().map(Vec::len).sum::<usize>(), 5);
    Ok(())
}

#[test]
fn clustering_a_single_item_is_empty() {
    let (catalog, _) = Catalog::load(&fixture()).unwrap();
    let one = Catalog::from_items(catalog.items()[..1].to_vec());
    let provider = Arc::new(LocalProvider::new(Box::new(HashEmbedder::new(32)), 32));
    let ctx = AppContext::new(Settings::default(), one, provider, None);
    assert!(ctx.cluster_catalog(10).is_empty());
}

#[tokio::test]
async fn populate_skips_failed_batches() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"upsertedCount": 2})))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let ctx = context(None);
    let client = remote_for(&server);
    let opts = PopulateOptions { batch_size: 2, delay: Duration::ZERO, show_progress: false };
    let report = ctx.populate_remote(&client, opts).await?;
    assert_eq!(report.total, 5);
    assert_eq!(report.batches, 3);
    assert_eq!(report.upserted, 4);
    assert_eq!(report.failed_batches, 1);
    Ok(())
}

#[test]
fn context_loads_from_settings() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let csv = dir.path().join("items.csv");
    std::fs::copy(fixture(), &csv)?;
    let mut settings = Settings::default();
    settings.catalog.path = csv.to_string_lossy().to_string();
    settings.embedding.use_fake = true;

    let (ctx, report) = AppContext::from_settings(settings)?;
    assert_eq!(report.loaded, 5);
    assert!(ctx.remote.is_none());
    assert_eq!(ctx.cache.dim(), 384);
    Ok(())
}
