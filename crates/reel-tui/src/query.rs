//! Client side of the dispatcher: one query function that every loader
//! (rows, hero, card previews) goes through.
use std::time::Duration;

use async_trait::async_trait;
use reel_proto::catalog::{items_from_page, CatalogBucket, Item};
use reel_proto::media::{media_from_listing, PreviewMedia};
use reel_proto::query::TypedQuery;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error("dispatcher returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("dispatcher unreachable: {0}")]
    Transport(String),
    #[error("unreadable dispatcher reply: {0}")]
    Decode(String),
}

#[async_trait]
pub trait CatalogQuery: Send + Sync {
    async fn query(&self, query: &TypedQuery) -> Result<Value, QueryError>;
}

/// Talks to `reel-dispatch` over HTTP.  The client never sees the upstream
/// or its key; it only sends the query-string map.
pub struct HttpCatalog {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpCatalog {
    pub fn new(endpoint: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl CatalogQuery for HttpCatalog {
    async fn query(&self, query: &TypedQuery) -> Result<Value, QueryError> {
        debug!("query: {} {:?}", query.kind.as_str(), query.item_id.as_ref().or(query.genre_id.as_ref()));
        let response = self
            .client
            .get(&self.endpoint)
            .query(&query.to_params())
            .send()
            .await
            .map_err(|e| QueryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QueryError::Status {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| QueryError::Decode(e.to_string()))
    }
}

/// One catalog row's worth of items, cut to the query's page limit.
pub async fn discover_items(
    client: &dyn CatalogQuery,
    bucket: &CatalogBucket,
    limit: usize,
) -> Result<Vec<Item>, QueryError> {
    let query = TypedQuery::discover(Some(&bucket.id), limit);
    let page = client.query(&query).await?;
    let mut items = items_from_page(&page);
    items.truncate(query.page_limit());
    Ok(items)
}

pub async fn preview_media(
    client: &dyn CatalogQuery,
    item_id: u64,
) -> Result<Vec<PreviewMedia>, QueryError> {
    let listing = client.query(&TypedQuery::videos(item_id)).await?;
    Ok(media_from_listing(&listing))
}
