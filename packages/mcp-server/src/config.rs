//! Runtime server configuration
//!
//! Derived from environment variables at startup and immutable for the
//! process lifetime. There is no config file: the server is typically
//! launched by an MCP client that passes environment through.

use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the outline API bearer credential (required)
const ENV_API_KEY: &str = "OUTLINE_API_KEY";

/// Environment variable overriding the outline API base URL
const ENV_API_URL: &str = "OUTLINE_API_URL";

/// Environment variable overriding the mirror database path
const ENV_DB_PATH: &str = "OUTMIRROR_DB";

/// Environment variable overriding the staleness threshold, in seconds
const ENV_STALENESS_SECS: &str = "OUTMIRROR_STALENESS_SECS";

const DEFAULT_API_URL: &str = "https://api.outline.example/v1";
const DEFAULT_DB_FILE: &str = "outmirror.db";

/// Runtime configuration for the MCP server process
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Outline API bearer credential
    pub api_key: String,

    /// Outline API base URL
    pub api_url: String,

    /// Resolved path to the mirror database file
    pub database_path: PathBuf,

    /// Mirror age beyond which reads trigger an opportunistic full sync
    pub staleness_threshold: Duration,
}

impl ServerConfig {
    /// Build the configuration from the process environment
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var(ENV_API_KEY)
            .map_err(|_| anyhow::anyhow!("{} must be set", ENV_API_KEY))?;
        if api_key.trim().is_empty() {
            anyhow::bail!("{} must not be empty", ENV_API_KEY);
        }

        let api_url =
            std::env::var(ENV_API_URL).unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let database_path = match std::env::var(ENV_DB_PATH) {
            Ok(path) => PathBuf::from(path),
            Err(_) => default_database_path(),
        };

        let staleness_threshold = std::env::var(ENV_STALENESS_SECS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(3600));

        Ok(Self {
            api_key,
            api_url,
            database_path,
            staleness_threshold,
        })
    }
}

/// Default mirror location under the user's data directory, falling back to
/// the working directory when no home is resolvable
fn default_database_path() -> PathBuf {
    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join("outmirror")
            .join(DEFAULT_DB_FILE);
    }
    PathBuf::from(DEFAULT_DB_FILE)
}
