mod app;
mod hero;
mod preview;
mod query;
mod rows;
mod theme;
mod widgets;

use std::sync::Arc;

use reel_proto::config::Config;

use crate::query::HttpCatalog;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = reel_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("tui.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; default to debug for app code but suppress noisy
    // connection-level DEBUG from HTTP client internals (hyper_util, reqwest).
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("reel log: {}", log_path.display());
    tracing::info!("reel starting…");

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("config unreadable, using defaults: {}", e);
            Config::default()
        }
    };
    tracing::info!(
        "dispatcher {}, {} rows",
        config.client.dispatcher_url,
        config.catalog.buckets.len()
    );

    let client = Arc::new(HttpCatalog::new(config.client.dispatcher_url.clone())?);
    let (app, channels) = app::App::new(client, &config.client, &config.catalog.buckets);
    app.run(channels).await?;

    Ok(())
}
