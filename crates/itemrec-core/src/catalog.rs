//! Catalog store: loads the item dataset once and serves read-only lookups.
//!
//! List-like columns (`categories`, image URLs) arrive either as a bracketed
//! literal (`['a', "b's"]`), a JSON array, or comma-delimited text. They are
//! parsed here, at load time; rows that fail validation are quarantined with
//! a reason instead of aborting the load.
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::types::{Item, ItemId, PRICE_NOT_AVAILABLE};

/// A row from the source table. Unknown columns are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRow {
    #[serde(alias = "uniq_id")]
    id: Option<String>,
    title: Option<String>,
    brand: Option<String>,
    price: Option<String>,
    material: Option<String>,
    categories: Option<String>,
    description: Option<String>,
    #[serde(alias = "images", alias = "image_refs")]
    image_urls: Option<String>,
}

/// A row that was rejected during load.
#[derive(Debug, Clone, PartialEq)]
pub struct QuarantinedRow {
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub loaded: usize,
    pub quarantined: Vec<QuarantinedRow>,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<Item>,
    by_id: HashMap<ItemId, usize>,
}

impl Catalog {
    /// Build a catalog from already-structured items. Later duplicates of an
    /// id are dropped with a warning so ids stay unique.
    pub fn from_items(items: Vec<Item>) -> Self {
        let mut catalog = Self::default();
        for item in items {
            if let Err(e) = catalog.push(item) {
                warn!(error = %e, "dropping catalog item");
            }
        }
        catalog
    }

    fn push(&mut self, item: Item) -> Result<()> {
        if self.by_id.contains_key(&item.id) {
            return Err(Error::Operation(format!("duplicate item id '{}'", item.id)));
        }
        self.by_id.insert(item.id.clone(), self.items.len());
        self.items.push(item);
        Ok(())
    }

    pub fn load(path: &Path) -> Result<(Self, LoadReport)> {
        info!(path = %path.display(), "loading catalog");
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<(Self, LoadReport)> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);
        let mut catalog = Self::default();
        let mut report = LoadReport::default();
        // Header is line 1.
        for (i, record) in csv_reader.deserialize::<RawRow>().enumerate() {
            let line = i + 2;
            let parsed = record
                .map_err(|e| Error::MalformedRow { line, reason: e.to_string() })
                .and_then(|raw| row_to_item(raw, line))
                .and_then(|item| catalog.push(item).map_err(|e| Error::MalformedRow { line, reason: e.to_string() }));
            match parsed {
                Ok(()) => report.loaded += 1,
                Err(e) => {
                    warn!(line, error = %e, "skipping catalog row");
                    let reason = match e {
                        Error::MalformedRow { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    report.quarantined.push(QuarantinedRow { line, reason });
                }
            }
        }
        info!(loaded = report.loaded, quarantined = report.quarantined.len(), "catalog loaded");
        Ok((catalog, report))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in insertion order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.by_id.get(id).map(|&idx| &self.items[idx])
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }
}

fn row_to_item(raw: RawRow, line: usize) -> Result<Item> {
    let malformed = |reason: String| Error::MalformedRow { line, reason };
    let id = non_empty(raw.id).ok_or_else(|| malformed("missing id".into()))?;
    let title = non_empty(raw.title).ok_or_else(|| malformed(format!("item '{id}' has no title")))?;
    let categories = match non_empty(raw.categories) {
        Some(text) => parse_list_field(&text).map_err(|e| malformed(format!("categories: {e}")))?,
        None => Vec::new(),
    };
    let image_refs = match non_empty(raw.image_urls) {
        Some(text) => parse_list_field(&text).map_err(|e| malformed(format!("image urls: {e}")))?,
        None => Vec::new(),
    };
    Ok(Item {
        id,
        title,
        brand: non_empty(raw.brand).unwrap_or_default(),
        price: non_empty(raw.price).unwrap_or_else(|| PRICE_NOT_AVAILABLE.to_string()),
        material: non_empty(raw.material).unwrap_or_default(),
        categories,
        description: non_empty(raw.description).unwrap_or_default(),
        image_refs,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("nan"))
}

/// Parse a list-like field.
///
/// `[...]` must be a well-formed list of quoted strings (single or double
/// quotes, backslash escapes); anything else is split on commas.
pub fn parse_list_field(text: &str) -> std::result::Result<Vec<String>, String> {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix('[') else {
        return Ok(trimmed
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect());
    };
    let inner = inner
        .strip_suffix(']')
        .ok_or_else(|| "unterminated list literal".to_string())?;

    let mut out = Vec::new();
    let mut chars = inner.chars().peekable();
    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let Some(quote) = chars.next() else { break };
        if quote != '\'' && quote != '"' {
            return Err(format!("expected quoted element, found '{quote}'"));
        }
        let mut value = String::new();
        let mut closed = false;
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        value.push(escaped);
                    }
                }
                c if c == quote => {
                    closed = true;
                    break;
                }
                c => value.push(c),
            }
        }
        if !closed {
            return Err("unterminated quoted element".to_string());
        }
        let value = value.trim().to_string();
        if !value.is_empty() {
            out.push(value);
        }
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            None => break,
            Some(',') => continue,
            Some(other) => return Err(format!("expected ',' between elements, found '{other}'")),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_literal_with_mixed_quotes() {
        let parsed = parse_list_field(r#"['Home & Kitchen', "Men's Shoes", 'Racks']"#).unwrap();
        assert_eq!(parsed, vec!["Home & Kitchen", "Men's Shoes", "Racks"]);
    }

    #[test]
    fn json_array_parses_like_literal() {
        let parsed = parse_list_field(r#"["https://a/1.jpg","https://a/2.jpg"]"#).unwrap();
        assert_eq!(parsed, vec!["https://a/1.jpg", "https://a/2.jpg"]);
    }

    #[test]
    fn plain_text_is_comma_split() {
        let parsed = parse_list_field("Furniture, Tables , Dining Room").unwrap();
        assert_eq!(parsed, vec!["Furniture", "Tables", "Dining Room"]);
    }

    #[test]
    fn broken_literal_is_rejected() {
        assert!(parse_list_field("['a', 'b").is_err());
        assert!(parse_list_field("['a' 'b']").is_err());
        assert!(parse_list_field("[a, b]").is_err());
    }

    #[test]
    fn empty_literal_is_empty_list() {
        assert_eq!(parse_list_field("[]").unwrap(), Vec::<String>::new());
    }
}
