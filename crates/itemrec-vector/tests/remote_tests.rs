use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use itemrec_vector::{RemoteError, RemoteIndexClient};

fn client(server: &MockServer) -> RemoteIndexClient {
    RemoteIndexClient::new(&server.uri(), Some("secret".into()), "catalog-items", Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn query_parses_matches_and_truncates() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(header("Api-Key", "secret"))
        .and(body_partial_json(json!({"topK": 2, "includeMetadata": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "matches": [
                {"id": "t1", "score": 0.92, "metadata": {"title": "Oak Table", "categories": "['Furniture', 'Tables']", "price": "$99.00"}},
                {"id": "t2", "score": 0.81, "metadata": {"title": "Pine Table"}},
                {"id": "t3", "score": 0.40, "metadata": {}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let matches = client(&server).query(&[0.1, 0.2, 0.3], 2, None).await?;
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].id, "t1");
    let item = matches[0].to_item();
    assert_eq!(item.title, "Oak Table");
    assert_eq!(item.categories, vec!["Furniture", "Tables"]);
    Ok(())
}

#[tokio::test]
async fn query_sends_filter_when_given() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({"filter": {"brand": {"$eq": "Acme"}}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"matches": []})))
        .expect(1)
        .mount(&server)
        .await;

    let filter = json!({"brand": {"$eq": "Acme"}});
    let matches = client(&server).query(&[1.0], 5, Some(&filter)).await?;
    assert!(matches.is_empty());
    Ok(())
}

#[tokio::test]
async fn service_unavailable_is_an_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = client(&server).query(&[1.0], 3, None).await.unwrap_err();
    match err {
        RemoteError::Api { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "overloaded");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let c = RemoteIndexClient::new(&server.uri(), None, "idx", Duration::from_millis(50)).unwrap();
    assert!(matches!(c.query(&[1.0], 3, None).await, Err(RemoteError::Http(_))));
}

#[tokio::test]
async fn upsert_and_stats() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"upsertedCount": 1})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/describe_index_stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dimension": 384, "indexFullness": 0.0, "totalVectorCount": 12
        })))
        .mount(&server)
        .await;

    let c = client(&server);
    let record = itemrec_vector::UpsertRecord {
        id: "a".into(),
        values: vec![0.5; 4],
        metadata: itemrec_vector::ItemMetadata::from_item(&itemrec_core::Item {
            id: "a".into(),
            title: "Oak Table".into(),
            brand: String::new(),
            price: "$1".into(),
            material: String::new(),
            categories: vec![],
            description: String::new(),
            image_refs: vec![],
        }),
    };
    assert_eq!(c.upsert(&[record]).await?, 1);
    assert_eq!(c.upsert(&[]).await?, 0);
    let stats = c.describe_stats().await?;
    assert_eq!(stats.dimension, 384);
    assert_eq!(stats.total_vector_count, 12);
    Ok(())
}
