//! OutMirror MCP Server
//!
//! Standalone MCP (Model Context Protocol) server giving AI agents access
//! to a locally mirrored outline. JSON-RPC 2.0 over stdio.
//!
//! Startup sequence:
//!
//! 1. Read configuration from the environment
//! 2. Open (or create) the mirror database
//! 3. Validate the API credential with a cheap authenticated request -
//!    a rejected key is reported as an authentication failure up front
//!    instead of surfacing later as a mysterious sync failure
//! 4. Kick off a best-effort background sync so first reads usually hit a
//!    warm mirror
//! 5. Serve requests until stdin closes
//!
//! # Usage
//!
//! ```bash
//! OUTLINE_API_KEY=... outmirror-mcp
//! ```
//!
//! Optional: `OUTLINE_API_URL`, `OUTMIRROR_DB`, `OUTMIRROR_STALENESS_SECS`.

mod config;

use config::ServerConfig;
use outmirror_core::db::DatabaseService;
use outmirror_core::mcp::{run_mcp_server, McpContext};
use outmirror_core::remote::{HttpOutlineClient, OutlineRemote, RemoteError};
use outmirror_core::services::SyncConfig;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr - stdout belongs to the JSON-RPC transport
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "outmirror_mcp=info,outmirror_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ServerConfig::from_env()?;
    info!("Opening mirror database at {:?}", config.database_path);
    let db = Arc::new(DatabaseService::new(config.database_path.clone()).await?);

    let remote: Arc<dyn OutlineRemote> =
        Arc::new(HttpOutlineClient::new(&config.api_url, &config.api_key)?);

    match remote.validate_credentials().await {
        Ok(()) => info!("Outline API credential validated"),
        Err(RemoteError::Unauthorized) => {
            anyhow::bail!("The outline API rejected the credential - check OUTLINE_API_KEY");
        }
        Err(e) => {
            // The service may just be unreachable right now; the mirror can
            // still serve cached reads, so start anyway.
            warn!("Could not validate the API credential yet: {}", e);
        }
    }

    let sync_config = SyncConfig {
        staleness_threshold: config.staleness_threshold,
        ..SyncConfig::default()
    };
    let ctx = Arc::new(McpContext::new(db, remote, sync_config));

    // Best-effort startup sync; failures are logged and the server starts
    // against whatever the mirror already holds.
    let startup_sync = Arc::clone(&ctx.sync);
    tokio::spawn(async move {
        let freshness = startup_sync.ensure_fresh().await;
        info!("Startup sync finished: {:?}", freshness);
    });

    run_mcp_server(ctx).await
}
