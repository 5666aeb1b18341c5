use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tone_analyzer::server::{make_app, run_server};
use tone_analyzer::{CompletionBackend, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; the environment may already be set.
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let config = Config::parse();
    config.validate()?;
    info!(
        "Starting with profile={} model={} backend={}",
        config.profile, config.model, config.base_url
    );

    let backend: Arc<dyn CompletionBackend> = Arc::new(config.backend());
    let analyzer = Arc::new(config.analyzer(backend));

    let static_dir = if config.static_dir.is_dir() {
        Some(config.static_dir.clone())
    } else {
        warn!(
            "Static directory {:?} not found, serving the API only",
            config.static_dir
        );
        None
    };

    let app = make_app(analyzer, static_dir);
    run_server(app, config.socket_addr())
        .await
        .with_context(|| format!("Server on {} failed", config.socket_addr()))?;

    info!("Server stopped");
    Ok(())
}
