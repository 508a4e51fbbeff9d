//! SUSTAIN server binary
//!
//! Loads configuration, builds the optimization pipeline around the hosted
//! completion client and serves the HTTP API until Ctrl+C or SIGTERM.

use anyhow::Context;
use std::{path::Path, sync::Arc};
use sustain::{
    api::{build_router, AppState},
    completion::{CompletionClient, CompletionProvider},
    config::Config,
    observability::{init_observability, MetricsCollector},
    optimizer::StopwordList,
    pipeline::OptimizationPipeline,
    server::start_server,
};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let config = if Path::new(&config_path).exists() {
        Config::from_file_with_env(&config_path)
            .with_context(|| format!("loading configuration from {}", config_path))?
    } else {
        let config = Config::default_config();
        config.validate().context("validating default configuration")?;
        config
    };

    init_observability(&config.logging.level, &config.logging.format);
    info!("Starting SUSTAIN server v{}", env!("CARGO_PKG_VERSION"));
    if Path::new(&config_path).exists() {
        info!("Configuration loaded and validated from {}", config_path);
    } else {
        info!("No configuration file at {}, using defaults", config_path);
    }

    let stopwords = StopwordList::load(&config.optimizer.stopwords_path).into_list();

    let provider: Arc<dyn CompletionProvider> =
        Arc::new(CompletionClient::new(config.completion.clone())?);
    let metrics = Arc::new(MetricsCollector::new());

    let pipeline = OptimizationPipeline::from_config(&config, &stopwords, provider)?
        .with_metrics(metrics.clone());
    info!(
        "Pipeline ready (default model {}, cache {})",
        config.completion.default_model,
        if config.completion.cache_enabled { "enabled" } else { "disabled" }
    );

    let state = AppState {
        pipeline: Arc::new(pipeline),
        metrics,
    };
    let app = build_router(state, &config.server);

    start_server(&config.server, app).await
}
