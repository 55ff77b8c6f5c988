use itemrec_core::{Catalog, Item};

/// First `limit` items whose categories contain `category`
/// (case-insensitive), in catalog order. Items without categories never match.
pub fn by_category(catalog: &Catalog, category: &str, limit: usize) -> Vec<Item> {
    let needle = category.trim().to_lowercase();
    catalog
        .items()
        .iter()
        .filter(|item| !item.categories.is_empty())
        .filter(|item| item.category_text().to_lowercase().contains(&needle))
        .take(limit)
        .cloned()
        .collect()
}
