//! REST client for the hosted nearest-neighbor index.
//!
//! Speaks the Pinecone data-plane dialect: `POST {host}/query`,
//! `POST {host}/vectors/upsert` and `POST {host}/describe_index_stats`, all
//! authenticated with an `Api-Key` header. Every request carries the
//! configured timeout.
use std::collections::HashMap;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use itemrec_core::catalog::parse_list_field;
use itemrec_core::config::RemoteSettings;
use itemrec_core::types::PRICE_NOT_AVAILABLE;
use itemrec_core::Item;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote index is not configured")]
    NotConfigured,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("remote index returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, RemoteError>;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a Value>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<RemoteMatch>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteMatch {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl RemoteMatch {
    fn text(&self, key: &str) -> String {
        match self.metadata.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    fn list(&self, key: &str) -> Vec<String> {
        match self.metadata.get(key) {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => {
                let raw = self.text(key);
                // Truncated list literals no longer parse; keep the text.
                parse_list_field(&raw).unwrap_or_else(|_| vec![raw])
            }
        }
    }

    /// Rebuild an item snapshot from the stored metadata.
    pub fn to_item(&self) -> Item {
        let price = self.text("price");
        Item {
            id: self.id.clone(),
            title: self.text("title"),
            brand: self.text("brand"),
            price: if price.trim().is_empty() { PRICE_NOT_AVAILABLE.to_string() } else { price },
            material: self.text("material"),
            categories: self.list("categories"),
            description: self.text("description"),
            image_refs: self.list("image"),
        }
    }
}

/// Metadata stored next to each vector, truncated per field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemMetadata {
    pub title: String,
    pub brand: String,
    pub material: String,
    pub categories: String,
    pub price: String,
    pub description: String,
    pub image: String,
}

impl ItemMetadata {
    pub fn from_item(item: &Item) -> Self {
        let categories = serde_json::to_string(&item.categories).unwrap_or_default();
        let images = serde_json::to_string(&item.image_refs).unwrap_or_default();
        Self {
            title: truncate(&item.title, 1000),
            brand: truncate(&item.brand, 100),
            material: truncate(&item.material, 100),
            categories: truncate(&categories, 500),
            price: truncate(&item.price, 50),
            description: truncate(&item.description, 1000),
            image: truncate(&images, 500),
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpsertRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: ItemMetadata,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [UpsertRecord],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    #[serde(default)]
    pub dimension: usize,
    #[serde(default)]
    pub index_fullness: f32,
    #[serde(default)]
    pub total_vector_count: u64,
}

/// Index consoles show bare hostnames; those are served over HTTPS.
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

#[derive(Debug, Clone)]
pub struct RemoteIndexClient {
    http: reqwest::Client,
    host: String,
    api_key: Option<String>,
    index_name: String,
}

impl RemoteIndexClient {
    pub fn new(host: &str, api_key: Option<String>, index_name: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            host: normalize_host(host),
            api_key,
            index_name: index_name.to_string(),
        })
    }

    /// `Ok(None)` when no host is configured.
    pub fn from_settings(settings: &RemoteSettings) -> Result<Option<Self>> {
        let Some(host) = settings.configured_host() else {
            debug!("remote index host not set");
            return Ok(None);
        };
        let client = Self::new(
            host,
            settings.api_key.clone().filter(|k| !k.is_empty()),
            &settings.index_name,
            Duration::from_millis(settings.timeout_ms),
        )?;
        info!(host = %client.host, index = %client.index_name, "remote index configured");
        Ok(Some(client))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let mut req = self.http.post(format!("{}{}", self.host, path)).json(body);
        if let Some(key) = &self.api_key {
            req = req.header("Api-Key", key);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Api { status: status.as_u16(), message });
        }
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| RemoteError::Parse(e.to_string()))
    }

    /// Nearest neighbors of `vector`. At most `top_k` matches are returned.
    pub async fn query(&self, vector: &[f32], top_k: usize, filter: Option<&Value>) -> Result<Vec<RemoteMatch>> {
        let body = QueryRequest { vector, top_k, include_metadata: true, filter };
        let resp: QueryResponse = self.post("/query", &body).await?;
        let mut matches = resp.matches;
        matches.truncate(top_k);
        debug!(returned = matches.len(), top_k, "remote query");
        Ok(matches)
    }

    /// Returns the number of records the index reports as written.
    pub async fn upsert(&self, records: &[UpsertRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let resp: UpsertResponse = self.post("/vectors/upsert", &UpsertRequest { vectors: records }).await?;
        Ok(resp.upserted_count)
    }

    pub async fn describe_stats(&self) -> Result<IndexStats> {
        self.post("/describe_index_stats", &serde_json::json!({})).await
    }
}
