//! Catalog summary statistics and keyword extraction.
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::catalog::Catalog;

const TOP_N: usize = 10;

const PRICE_BUCKETS: [(f64, f64, &str); 5] = [
    (0.0, 25.0, "$0-25"),
    (25.0, 50.0, "$25-50"),
    (50.0, 100.0, "$50-100"),
    (100.0, 200.0, "$100-200"),
    (200.0, f64::INFINITY, "$200+"),
];

const STOP_WORDS: [&str; 14] = [
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NameCount {
    pub name: String,
    pub value: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBucket {
    pub range: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSummary {
    pub total_items: usize,
    pub priced_items: usize,
    pub average_price: Option<f64>,
    pub median_price: Option<f64>,
    pub price_range: Option<PriceRange>,
    pub total_brands: usize,
    pub total_categories: usize,
    pub total_materials: usize,
    pub top_categories: Vec<NameCount>,
    pub top_brands: Vec<NameCount>,
    pub price_distribution: Vec<PriceBucket>,
}

pub fn summarize(catalog: &Catalog) -> CatalogSummary {
    let items = catalog.items();
    let mut prices: Vec<f64> = items.iter().filter_map(|i| i.price_value()).collect();
    prices.sort_by(f64::total_cmp);

    let average_price = (!prices.is_empty()).then(|| prices.iter().sum::<f64>() / prices.len() as f64);
    let median_price = median(&prices);
    let price_range = match (prices.first(), prices.last()) {
        (Some(&min), Some(&max)) => Some(PriceRange { min, max }),
        _ => None,
    };

    let brands = items.iter().map(|i| i.brand.as_str()).filter(|b| !b.is_empty());
    let materials: HashSet<&str> = items
        .iter()
        .map(|i| i.material.as_str())
        .filter(|m| !m.is_empty())
        .collect();
    let categories = items.iter().flat_map(|i| i.categories.iter().map(String::as_str));
    let category_counts = count(categories);
    let brand_counts = count(brands);

    let price_distribution = PRICE_BUCKETS
        .iter()
        .map(|&(lo, hi, label)| PriceBucket {
            range: label.to_string(),
            count: prices.iter().filter(|&&p| p >= lo && p < hi).count(),
        })
        .collect();

    CatalogSummary {
        total_items: items.len(),
        priced_items: prices.len(),
        average_price,
        median_price,
        price_range,
        total_brands: brand_counts.len(),
        total_categories: category_counts.len(),
        total_materials: materials.len(),
        top_categories: top_n(category_counts, TOP_N),
        top_brands: top_n(brand_counts, TOP_N),
        price_distribution,
    }
}

fn median(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0),
    }
}

fn count<'a>(values: impl Iterator<Item = &'a str>) -> HashMap<&'a str, usize> {
    let mut counts = HashMap::new();
    for v in values {
        *counts.entry(v).or_insert(0) += 1;
    }
    counts
}

/// Highest counts first; ties broken by name so output is stable.
fn top_n(counts: HashMap<&str, usize>, n: usize) -> Vec<NameCount> {
    let mut entries: Vec<(&str, usize)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    entries
        .into_iter()
        .take(n)
        .map(|(name, value)| NameCount { name: name.to_string(), value })
        .collect()
}

/// Most frequent non-stop-word tokens longer than two characters.
/// Ties keep first-occurrence order.
pub fn extract_keywords(text: &str, top_k: usize) -> Vec<String> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for word in text.to_lowercase().split_whitespace() {
        if word.chars().count() <= 2 || STOP_WORDS.contains(&word) {
            continue;
        }
        let entry = counts.entry(word.to_string()).or_insert(0);
        if *entry == 0 {
            order.push(word.to_string());
        }
        *entry += 1;
    }
    let mut ranked: Vec<(usize, String)> = order.into_iter().enumerate().collect();
    ranked.sort_by(|a, b| counts[&b.1].cmp(&counts[&a.1]).then(a.0.cmp(&b.0)));
    ranked.into_iter().take(top_k).map(|(_, w)| w).collect()
}
