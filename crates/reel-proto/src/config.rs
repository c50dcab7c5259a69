use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::catalog::CatalogBucket;
use super::platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Base URL of the upstream metadata API, without a trailing slash.
    #[serde(default = "default_upstream_base")]
    pub upstream_base: String,
    /// Name of the environment variable holding the upstream API key.
    /// The key itself never lives in this file.
    #[serde(default = "default_credential_env")]
    pub credential_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Full URL of the dispatcher endpoint the client queries.
    #[serde(default = "default_dispatcher_url")]
    pub dispatcher_url: String,
    /// Quiet period before a hovered card fetches its preview.
    #[serde(default = "default_hover_delay_ms")]
    pub hover_delay_ms: u64,
    /// Items shown per catalog row.
    #[serde(default = "default_row_limit")]
    pub row_limit: usize,
}

/// Catalog rows, in display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_buckets")]
    pub buckets: Vec<CatalogBucket>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            upstream_base: default_upstream_base(),
            credential_env: default_credential_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            dispatcher_url: default_dispatcher_url(),
            hover_delay_ms: default_hover_delay_ms(),
            row_limit: default_row_limit(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            buckets: default_buckets(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_upstream_base() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_credential_env() -> String {
    "TMDB_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_dispatcher_url() -> String {
    format!("http://{}:{}/api/tmdb", default_bind_address(), default_port())
}

fn default_hover_delay_ms() -> u64 {
    350
}

fn default_row_limit() -> usize {
    crate::query::DEFAULT_PAGE_LIMIT
}

fn default_buckets() -> Vec<CatalogBucket> {
    [
        ("28", "Action"),
        ("35", "Comedy"),
        ("878", "Sci-Fi"),
        ("27", "Horror"),
        ("10749", "Romance"),
        ("99", "Documentaries"),
    ]
    .into_iter()
    .map(|(id, name)| CatalogBucket::new(id, name))
    .collect()
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.dispatch.port, 8787);
        assert_eq!(config.dispatch.bind_address, "127.0.0.1");
        assert_eq!(config.dispatch.credential_env, "TMDB_API_KEY");
        assert!(config.dispatch.upstream_base.starts_with("https://"));
        assert_eq!(config.client.hover_delay_ms, 350);
        assert_eq!(config.client.dispatcher_url, "http://127.0.0.1:8787/api/tmdb");
        assert_eq!(config.catalog.buckets.len(), 6);
        assert_eq!(config.catalog.buckets[2].id, "878");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [client]
            hover_delay_ms = 500

            [[catalog.buckets]]
            id = "16"
            name = "Animation"
            "#,
        )
        .unwrap();
        assert_eq!(config.client.hover_delay_ms, 500);
        assert_eq!(config.client.row_limit, 20);
        assert_eq!(config.dispatch.port, 8787);
        assert_eq!(config.catalog.buckets, vec![CatalogBucket::new("16", "Animation")]);
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.catalog.buckets, config.catalog.buckets);
        assert_eq!(back.dispatch.upstream_base, config.dispatch.upstream_base);
    }
}
