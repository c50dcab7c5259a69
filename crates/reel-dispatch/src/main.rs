mod dispatcher;
mod envelope;
mod http;
mod upstream;

use std::sync::Arc;
use std::time::Duration;

use reel_proto::config::Config;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::dispatcher::Dispatcher;
use crate::upstream::{Credential, TmdbClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // File logging; stdout stays free for whoever launched us.
    let data_dir = reel_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("dispatch.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,reel_dispatch=debug")),
        )
        .init();

    eprintln!("reel-dispatch: logging to {}", log_path.display());
    info!("Log file: {:?}", log_path);

    let config = Config::load()?;
    info!("Config loaded from: {:?}", Config::config_path());

    // A missing key is not fatal: every request answers 500 until redeployed.
    let credential = Credential::from_env(&config.dispatch.credential_env);
    if credential.is_none() {
        error!(
            "{} is not set; all queries will fail with 500",
            config.dispatch.credential_env
        );
    }

    let upstream = TmdbClient::new(
        &config.dispatch.upstream_base,
        Duration::from_secs(config.dispatch.timeout_secs),
    )?;
    let dispatcher = Arc::new(Dispatcher::new(credential, Arc::new(upstream)));
    info!(
        "Dispatcher initialised (upstream {}, credential {})",
        config.dispatch.upstream_base,
        if dispatcher.has_credential() { "present" } else { "missing" }
    );

    http::serve(&config.dispatch.bind_address, config.dispatch.port, dispatcher).await
}
