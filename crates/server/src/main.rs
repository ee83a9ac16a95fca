//! offcache server entry point.
//!
//! Loads configuration, opens the cache database, installs and activates the
//! current worker version, then serves MCP on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use offcache_client::{CacheManager, FetchClient, FetchConfig, WorkerConfig};
use offcache_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    tracing::info!(origin = %config.origin, version = %config.cache_version, "starting offcache server on stdio transport");

    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache database {}", config.db_path.display()))?;
    let network = FetchClient::new(FetchConfig::from(&config)).context("building HTTP client")?;
    let worker = WorkerConfig::from_app(&config).context("building worker configuration")?;

    let manager = Arc::new(CacheManager::new(db, Arc::new(network), worker));
    manager.install().await.context("install failed")?;
    let activation = manager.activate().await.context("activate failed")?;
    if !activation.deleted.is_empty() {
        tracing::info!(deleted = ?activation.deleted, "purged old cache generations");
    }

    let handler = handler::OffcacheServer::new(Arc::clone(&manager));
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    manager.wait_until_idle().await;
    manager.db().close().await.context("closing cache database")?;
    tracing::info!("offcache server stopped");

    Ok(())
}
