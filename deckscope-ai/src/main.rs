//! deckscope-ai - deck analysis service
//!
//! Startup order: logging, build banner, configuration, database, model
//! client, HTTP server.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

use deckscope_ai::config::{Cli, ServiceConfig};
use deckscope_ai::db::{init_database_pool, SqliteDeckStore, SqliteIdentityProvider};
use deckscope_ai::model::OpenAiCompatibleModel;
use deckscope_ai::services::analysis_pipeline::PipelineDeps;
use deckscope_ai::services::{AnalysisPipeline, CurveCompressor};
use deckscope_ai::{build_router, AppState};

fn log_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!(
        "deckscope_ai={level},deckscope_common={level},deckscope={level},tower_http=info"
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise start at the CLI/env level and switch to the
    // configured level once the TOML file has been read
    let env_filter = EnvFilter::try_from_default_env().ok();
    let env_filter_set = env_filter.is_some();
    let initial = env_filter
        .unwrap_or_else(|| log_filter(cli.log_level.as_deref().unwrap_or("info")));
    let (filter, reload_handle) = reload::Layer::new(initial);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting deckscope analysis service (deckscope-ai) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = ServiceConfig::load(&cli).context("Failed to load configuration")?;
    if !env_filter_set {
        if let Err(e) = reload_handle.reload(log_filter(&config.logging.level)) {
            warn!("Failed to apply configured log level: {}", e);
        }
    }

    let db_path = config.database_path();
    info!("Database path: {}", db_path.display());
    let pool = init_database_pool(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    info!("✓ Connected to database");

    let model = OpenAiCompatibleModel::new(
        config.model.base_url.clone(),
        config.model.model.clone(),
        config.model.api_key.clone(),
        config.model_timeout(),
    )
    .context("Failed to create model client")?;
    info!(
        base_url = %config.model.base_url,
        model = %config.model.model,
        "Model client ready"
    );

    let store = Arc::new(SqliteDeckStore::new(pool.clone()));
    let pipeline = Arc::new(AnalysisPipeline::new(
        PipelineDeps {
            store: store.clone(),
            identity: Arc::new(SqliteIdentityProvider::new(pool)),
            compressor: Arc::new(CurveCompressor),
            model: Arc::new(model),
        },
        config.pipeline_settings(),
    ));

    let app = build_router(AppState::new(pipeline, store));

    let listener = tokio::net::TcpListener::bind(config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!("deckscope-ai listening on http://{}", config.server.bind_addr);
    info!("Health check: http://{}/health", config.server.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
