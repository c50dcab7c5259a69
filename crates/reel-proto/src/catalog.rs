//! Catalog types: configured rows and the items the upstream hands back.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Base URL for upstream poster/backdrop images.
pub const IMAGE_BASE: &str = "https://image.tmdb.org/t/p";

/// One configured catalog row, e.g. `{ id: "878", name: "Sci-Fi" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogBucket {
    /// Upstream genre id.
    pub id: String,
    /// Row heading.
    pub name: String,
}

impl CatalogBucket {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A catalog entry as the upstream describes it.  Everything except the id
/// may be missing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
}

impl Item {
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(t) if !t.trim().is_empty() => t,
            _ => "Untitled",
        }
    }

    pub fn overview(&self) -> &str {
        self.overview.as_deref().unwrap_or_default()
    }

    /// Full-size still for the hero pane: backdrop first, poster second.
    pub fn still_url(&self) -> Option<String> {
        let usable = |p: &Option<String>| p.as_deref().filter(|p| !p.is_empty()).map(str::to_owned);
        usable(&self.backdrop_path)
            .or_else(|| usable(&self.poster_path))
            .map(|p| image_url("original", &p))
    }
}

pub fn image_url(size: &str, path: &str) -> String {
    format!("{}/{}/{}", IMAGE_BASE, size, path.trim_start_matches('/'))
}

/// Decode the `results` array of a discovery page.  Entries that are not
/// objects with a numeric `id` are skipped rather than failing the page, and
/// a repeated id keeps only its first entry.
pub fn items_from_page(page: &serde_json::Value) -> Vec<Item> {
    page.get("results")
        .and_then(|r| r.as_array())
        .map(|results| {
            let mut seen = HashSet::new();
            results
                .iter()
                .filter_map(|v| serde_json::from_value::<Item>(v.clone()).ok())
                .filter(|item| seen.insert(item.id))
                .collect()
        })
        .unwrap_or_default()
}
