//! Shared fixtures for handler tests.

use std::sync::Arc;

use axum_test::TestServer;
use prismer_agent::{AgentConfig, AgentService, ScriptedSpawner};
use prismer_store::MemoryStore;
use tempfile::TempDir;

use crate::config::GatewayConfig;
use crate::routes::create_router;
use crate::state::GatewayState;

pub(crate) struct TestApp {
    pub server: TestServer,
    pub agent: Arc<AgentService<ScriptedSpawner>>,
    pub sessions: Arc<MemoryStore>,
    pub workspace: TempDir,
}

/// A gateway over a scripted agent, an in-memory session store and a
/// temporary workspace. Artifact detection keeps the default `/workspace` root.
pub(crate) fn test_app(spawner: ScriptedSpawner) -> TestApp {
    let workspace = TempDir::new().unwrap();
    let config = GatewayConfig {
        workspace_root: workspace.path().to_path_buf(),
        ..GatewayConfig::default()
    };
    let agent = Arc::new(AgentService::new(spawner, AgentConfig::default()));
    let sessions = Arc::new(MemoryStore::new());
    let state = GatewayState::new(Arc::clone(&agent), Arc::clone(&sessions), config);
    let server = TestServer::new(create_router(state)).unwrap();
    TestApp {
        server,
        agent,
        sessions,
        workspace,
    }
}

/// The `data:` payloads of an SSE body, in order.
pub(crate) fn sse_payloads(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")))
        .map(str::to_string)
        .collect()
}
