//! Gateway application state.
//!
//! This module defines the shared state that is available to all request handlers.

use std::sync::Arc;

use prismer_agent::AgentRunner;
use prismer_store::{SessionStore, WorkspaceFs};

use crate::config::GatewayConfig;

/// Shared application state for the gateway.
pub struct GatewayState<R, S>
where
    R: AgentRunner,
    S: SessionStore,
{
    /// Runs agent invocations.
    pub agent: Arc<R>,
    /// Session bookkeeping.
    pub sessions: Arc<S>,
    /// Workspace files and artifacts.
    pub workspace: Arc<WorkspaceFs>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl<R, S> GatewayState<R, S>
where
    R: AgentRunner,
    S: SessionStore,
{
    /// Create a new gateway state.
    ///
    /// The workspace is derived from `config.workspace_root` and
    /// `config.output_dir`.
    #[must_use]
    pub fn new(agent: Arc<R>, sessions: Arc<S>, config: GatewayConfig) -> Self {
        let workspace = Arc::new(WorkspaceFs::with_output_dir(
            config.workspace_root.clone(),
            &config.output_dir,
        ));
        Self {
            agent,
            sessions,
            workspace,
            config,
        }
    }
}

impl<R, S> Clone for GatewayState<R, S>
where
    R: AgentRunner,
    S: SessionStore,
{
    fn clone(&self) -> Self {
        Self {
            agent: Arc::clone(&self.agent),
            sessions: Arc::clone(&self.sessions),
            workspace: Arc::clone(&self.workspace),
            config: self.config.clone(),
        }
    }
}
