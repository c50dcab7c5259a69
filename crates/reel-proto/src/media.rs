//! Preview media (trailers, teasers, clips) and the rule that picks one.

use serde::{Deserialize, Deserializer, Serialize};

/// The only site whose keys we know how to play.
pub const PREVIEW_SITE: &str = "YouTube";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Trailer,
    Teaser,
    Clip,
    Other,
}

impl MediaKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Trailer" => MediaKind::Trailer,
            "Teaser" => MediaKind::Teaser,
            "Clip" => MediaKind::Clip,
            _ => MediaKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewMedia {
    #[serde(rename = "site", default)]
    pub site_name: String,
    #[serde(rename = "type", default = "other_kind", deserialize_with = "kind_from_str")]
    pub kind: MediaKind,
    #[serde(default)]
    pub key: String,
}

fn other_kind() -> MediaKind {
    MediaKind::Other
}

fn kind_from_str<'de, D: Deserializer<'de>>(deserializer: D) -> Result<MediaKind, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().map(MediaKind::parse).unwrap_or(MediaKind::Other))
}

impl PreviewMedia {
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.key)
    }

    pub fn label(&self) -> &'static str {
        match self.kind {
            MediaKind::Trailer => "Trailer",
            MediaKind::Teaser => "Teaser",
            MediaKind::Clip => "Clip",
            MediaKind::Other => "Video",
        }
    }
}

/// Where a preview is going to be shown.  The hero banner is pickier than a
/// hovered card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewContext {
    Hero,
    Card,
}

impl PreviewContext {
    pub fn accepts(self, kind: MediaKind) -> bool {
        match self {
            PreviewContext::Hero => matches!(kind, MediaKind::Trailer | MediaKind::Teaser),
            PreviewContext::Card => matches!(
                kind,
                MediaKind::Trailer | MediaKind::Teaser | MediaKind::Clip
            ),
        }
    }
}

/// First playable entry in list order.  `None` means "no preview available",
/// which callers render differently from a failed fetch.
pub fn select_preview(media: &[PreviewMedia], context: PreviewContext) -> Option<&PreviewMedia> {
    media
        .iter()
        .find(|m| m.site_name == PREVIEW_SITE && !m.key.is_empty() && context.accepts(m.kind))
}

/// Decode the `results` array of a video listing.  Malformed entries are
/// dropped.
pub fn media_from_listing(listing: &serde_json::Value) -> Vec<PreviewMedia> {
    listing
        .get("results")
        .and_then(|r| r.as_array())
        .map(|results| {
            results
                .iter()
                .filter_map(|v| serde_json::from_value::<PreviewMedia>(v.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}
