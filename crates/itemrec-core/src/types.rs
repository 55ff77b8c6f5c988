//! Domain types shared by the catalog, vector and engine crates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type ItemId = String;

/// Placeholder used when a catalog row carries no price.
pub const PRICE_NOT_AVAILABLE: &str = "not available";

/// A catalog item. Immutable once loaded; owned by the [`crate::catalog::Catalog`].
///
/// - `categories` and `image_refs` are parsed into lists at load time
/// - `price` keeps the currency-formatted source string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub brand: String,
    pub price: String,
    pub material: String,
    pub categories: Vec<String>,
    pub description: String,
    pub image_refs: Vec<String>,
}

impl Item {
    /// Categories joined the way they appear in the source dataset.
    pub fn category_text(&self) -> String {
        self.categories.join(", ")
    }

    /// Text handed to the embedding provider: title, description, brand and
    /// material. Empty fields are left out.
    pub fn embedding_text(&self) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(4);
        if !self.title.is_empty() {
            parts.push(self.title.clone());
        }
        if !self.description.is_empty() {
            parts.push(self.description.clone());
        }
        if !self.brand.is_empty() {
            parts.push(format!("Brand: {}", self.brand));
        }
        if !self.material.is_empty() {
            parts.push(format!("Material: {}", self.material));
        }
        parts.join(" ")
    }

    /// Numeric price parsed from strings like `$1,299.99`.
    pub fn price_value(&self) -> Option<f64> {
        parse_price(&self.price)
    }
}

pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    cleaned.trim().parse::<f64>().ok().filter(|p| p.is_finite())
}

/// One embedding per catalog item.
///
/// `degraded` marks a placeholder vector substituted after a provider
/// failure; it has the right dimension but carries no meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemVector {
    pub item_id: ItemId,
    pub vector: Vec<f32>,
    pub normalized: bool,
    pub degraded: bool,
}

impl ItemVector {
    pub fn dim(&self) -> usize {
        self.vector.len()
    }
}

/// Which retrieval path produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalSource {
    Remote,
    Local,
}

/// A ranked item. Higher `score` is better; cosine range is [-1, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityMatch {
    pub item_id: ItemId,
    pub score: f32,
    pub source_item: Item,
    pub degraded: bool,
}

/// Result of partitioning the catalog vectors.
///
/// Labels are small integers and are not stable across runs with a
/// different seed or catalog. An empty assignment means clustering failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAssignment {
    pub n_clusters: usize,
    pub cohesion: f32,
    pub assignment: BTreeMap<ItemId, usize>,
    pub clusters: BTreeMap<usize, Vec<usize>>,
}

impl ClusterAssignment {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.assignment.is_empty()
    }
}
