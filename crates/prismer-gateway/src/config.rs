//! Gateway configuration types.

use std::path::PathBuf;
use std::time::Duration;

use prismer_agent::AgentConfig;
use serde::Deserialize;

/// Configuration for the gateway service.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Listen address (e.g., "0.0.0.0:8080").
    #[serde(default = "GatewayConfig::default_listen_addr")]
    pub listen_addr: String,

    /// Allowed CORS origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    #[serde(default = "GatewayConfig::default_max_body")]
    pub max_body_bytes: usize,

    /// Time allowed until response headers are sent, in seconds.
    #[serde(default = "GatewayConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Interval between SSE keep-alive comments, in seconds.
    #[serde(default = "GatewayConfig::default_keep_alive")]
    pub keep_alive_seconds: u64,

    /// Workspace root served by the file and artifact endpoints.
    #[serde(default = "GatewayConfig::default_workspace_root")]
    pub workspace_root: PathBuf,

    /// Artifact directory name under the workspace root.
    #[serde(default = "GatewayConfig::default_output_dir")]
    pub output_dir: String,

    /// `RocksDB` directory for sessions. Sessions stay in memory when unset.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Agent invocation settings.
    #[serde(default)]
    pub agent: AgentConfig,
}

impl GatewayConfig {
    fn default_listen_addr() -> String {
        "0.0.0.0:8080".to_string()
    }

    const fn default_max_body() -> usize {
        10 * 1024 * 1024 // 10 MB
    }

    const fn default_request_timeout() -> u64 {
        300 // buffered chat waits for the agent
    }

    const fn default_keep_alive() -> u64 {
        15
    }

    fn default_workspace_root() -> PathBuf {
        PathBuf::from("/workspace")
    }

    fn default_output_dir() -> String {
        "output".to_string()
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Get the SSE keep-alive interval as a `Duration`.
    #[must_use]
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_seconds.max(1))
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: Self::default_listen_addr(),
            cors_origins: vec!["*".to_string()],
            max_body_bytes: Self::default_max_body(),
            request_timeout_seconds: Self::default_request_timeout(),
            keep_alive_seconds: Self::default_keep_alive(),
            workspace_root: Self::default_workspace_root(),
            output_dir: Self::default_output_dir(),
            data_dir: None,
            agent: AgentConfig::default(),
        }
    }
}
