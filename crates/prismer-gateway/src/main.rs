//! Prismer Gateway - HTTP/SSE API for the research workspace
//!
//! This is the main entry point for the gateway service.
//!
//! # Environment
//!
//! - `LISTEN_ADDR` - listen address (default `0.0.0.0:8080`)
//! - `WORKSPACE_ROOT` - workspace served to the agent and the file endpoints
//! - `AGENT_PROGRAM` - agent executable (default `openclaw`)
//! - `CORS_ORIGINS` - comma-separated allowed origins (default `*`)
//! - `DATA_DIR` - keep sessions in `RocksDB` here; in memory when unset

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use prismer_agent::{AgentService, CommandSpawner};
use prismer_gateway::{create_router, GatewayConfig, GatewayState};
use prismer_store::{MemoryStore, RocksStore, SessionStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,prismer_gateway=debug,prismer_agent=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Prismer Gateway");

    // Load configuration from environment
    let mut config = GatewayConfig::default();
    if let Ok(addr) = std::env::var("LISTEN_ADDR") {
        config.listen_addr = addr;
    }
    if let Ok(root) = std::env::var("WORKSPACE_ROOT") {
        config.workspace_root = root.into();
    }
    if let Ok(program) = std::env::var("AGENT_PROGRAM") {
        config.agent.program = program;
    }
    if let Ok(origins) = std::env::var("CORS_ORIGINS") {
        config.cors_origins = origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();
    }
    config.data_dir = std::env::var("DATA_DIR").ok().map(Into::into);
    config.agent = config
        .agent
        .clone()
        .with_workspace_root(config.workspace_root.clone());

    tracing::info!(
        listen_addr = %config.listen_addr,
        workspace_root = %config.workspace_root.display(),
        agent_program = %config.agent.program,
        cors_origins = ?config.cors_origins,
        data_dir = ?config.data_dir,
        "Gateway configuration loaded"
    );

    match config.data_dir.clone() {
        Some(data_dir) => {
            tracing::info!(path = %data_dir.display(), "Opening RocksDB session store");
            let store = Arc::new(RocksStore::open(&data_dir)?);
            serve(config, store).await
        }
        None => {
            tracing::warn!("No DATA_DIR set - sessions are kept in memory");
            serve(config, Arc::new(MemoryStore::new())).await
        }
    }
}

async fn serve<S>(config: GatewayConfig, sessions: Arc<S>) -> Result<(), Box<dyn std::error::Error>>
where
    S: SessionStore + 'static,
{
    let agent = Arc::new(AgentService::new(CommandSpawner, config.agent.clone()));
    let listen_addr = config.listen_addr.clone();

    let app = create_router(GatewayState::new(agent, sessions, config));
    tracing::info!("Router configured with all API endpoints");

    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
