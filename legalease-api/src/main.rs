//! legalease-api - LegalEase document analysis service
//!
//! Startup order:
//! 1. Tracing, then build identification
//! 2. Configuration (CLI → environment → TOML → defaults)
//! 3. Root folder and database
//! 4. Analyst, event bus and analysis pipeline
//! 5. Requeue work interrupted by the previous run
//! 6. HTTP server

use anyhow::{Context, Result};
use clap::Parser;
use legalease_api::ai::build_analyst;
use legalease_api::pipeline::AnalysisPipeline;
use legalease_api::{build_router, db, AppState, HttpSettings};
use legalease_common::config::{
    self, AiProvider, CliOverrides, RootFolderInitializer, ServiceConfig, ENV_BIND, ENV_PORT,
    ENV_ROOT_FOLDER,
};
use legalease_common::db::init_database;
use legalease_common::events::EventBus;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

/// Expired sessions are removed on this interval
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);
const EVENT_BUS_CAPACITY: usize = 256;

/// Command-line arguments for legalease-api
#[derive(Parser, Debug)]
#[command(name = "legalease-api")]
#[command(about = "LegalEase legal document analysis service")]
#[command(version)]
struct Args {
    /// Folder holding the database
    #[arg(short, long, env = ENV_ROOT_FOLDER)]
    root_folder: Option<PathBuf>,

    /// Address to bind
    #[arg(short, long, env = ENV_BIND)]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = ENV_PORT)]
    port: Option<u16>,

    /// TOML config file (defaults to the platform config locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Analyst backend: auto, gemini or mock
    #[arg(long)]
    ai_provider: Option<AiProvider>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG wins; otherwise the configured level is applied once known
    let explicit_filter = EnvFilter::try_from_default_env().ok();
    let has_explicit_filter = explicit_filter.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(explicit_filter.unwrap_or_else(|| EnvFilter::new("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    info!(
        "Starting LegalEase API (legalease-api) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();
    let toml = config::load_toml_or_default(args.config.as_deref());
    let cli = CliOverrides {
        root_folder: args.root_folder,
        bind: args.bind,
        port: args.port,
        ai_provider: args.ai_provider,
    };
    let config = ServiceConfig::resolve(&cli, &toml)?;

    if !has_explicit_filter {
        match EnvFilter::try_new(&config.log_level) {
            Ok(level) => {
                if let Err(e) = filter_handle.reload(level) {
                    warn!("Failed to apply log level {}: {}", config.log_level, e);
                }
            }
            Err(e) => warn!("Invalid log level {}: {}", config.log_level, e),
        }
    }

    let initializer = RootFolderInitializer::new(config.root_folder.clone());
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .context("Failed to open database")?;

    let analyst = build_analyst(&config).context("Failed to configure analyst")?;
    info!("Analyst: {}", analyst.name());

    let event_bus = EventBus::new(EVENT_BUS_CAPACITY);
    let pipeline = AnalysisPipeline::new(
        pool.clone(),
        analyst,
        event_bus.clone(),
        config.max_concurrent_analyses,
        Duration::from_secs(config.analysis_timeout_secs),
    );

    let resumed = pipeline
        .resume_interrupted()
        .await
        .context("Failed to requeue pending documents")?;
    if resumed > 0 {
        info!("Requeued {} documents", resumed);
    }

    let purge_pool = pool.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match db::purge_expired_sessions(&purge_pool).await {
                Ok(0) => {}
                Ok(n) => info!("Purged {} expired sessions", n),
                Err(e) => warn!("Session purge failed: {}", e),
            }
        }
    });

    let state = AppState::new(pool, event_bus, pipeline, HttpSettings::from_config(&config));
    let app = build_router(state);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("legalease-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
