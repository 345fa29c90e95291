//! SQLSage HTTP Server
//!
//! Answers natural-language questions over the attached SQLite databases.

use anyhow::Result;
use sqlsage_server::config::{LogFormat, ServerConfig};
use sqlsage_server::{api, engine};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = ServerConfig::load()?;

    // Initialize tracing
    init_tracing(&config)?;
    info!(
        "Loaded configuration: {}:{}, {} database(s) under {}",
        config.host,
        config.port,
        config.databases.attached.len(),
        config.databases.base_dir.display()
    );

    // Initialize gateway
    let gateway = Arc::new(engine::init_gateway(&config).await?);

    // Startup failures leave the server up; /health reports them
    match gateway.warm_up().await {
        Ok(count) => info!("Vector store initialized with {} tables", count),
        Err(e) => error!("Error initializing vector store: {}", e),
    }

    let app = api::create_router(gateway);

    // Start server
    let addr = config.addr();
    info!("Starting server on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    info!("  Health check: http://{}/health", addr);
    info!("  Ask API: POST http://{}/ask-sql", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Initialize tracing subscriber
fn init_tracing(config: &ServerConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.log_level;
        format!(
            "sqlsage_server={level},sqlsage_runtime={level},sqlsage_llm={level},tower_http=debug"
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.log_format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))
}
