//! The agent runner seam used by the gateway.

use std::sync::Arc;

use async_trait::async_trait;
use prismer_core::StreamEvent;
use tokio::sync::mpsc;

use crate::buffered::{run_buffered, BufferedReply};
use crate::config::AgentConfig;
use crate::emitter::run_streaming;
use crate::error::Result;
use crate::process::ProcessSpawner;
use crate::request::AgentRequest;

/// Runs agent invocations.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// Start a streaming invocation.
    ///
    /// The receiver yields events in order and always ends with
    /// [`StreamEvent::Done`]. Dropping it stops the invocation.
    fn stream(&self, request: AgentRequest) -> mpsc::Receiver<StreamEvent>;

    /// Run a buffered invocation.
    ///
    /// # Errors
    ///
    /// Returns an error if the agent cannot be started or exits unsuccessfully.
    async fn complete(&self, request: AgentRequest) -> Result<BufferedReply>;
}

/// [`AgentRunner`] backed by a [`ProcessSpawner`].
pub struct AgentService<P> {
    spawner: Arc<P>,
    config: Arc<AgentConfig>,
}

impl<P> AgentService<P> {
    /// Create a service.
    pub fn new(spawner: P, config: AgentConfig) -> Self {
        Self {
            spawner: Arc::new(spawner),
            config: Arc::new(config),
        }
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// The spawner in use.
    #[must_use]
    pub fn spawner(&self) -> &P {
        &self.spawner
    }
}

#[async_trait]
impl<P: ProcessSpawner> AgentRunner for AgentService<P> {
    fn stream(&self, request: AgentRequest) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let spawner = Arc::clone(&self.spawner);
        let config = Arc::clone(&self.config);
        tokio::spawn(async move {
            run_streaming(spawner.as_ref(), &config, &request, tx).await;
        });
        rx
    }

    async fn complete(&self, request: AgentRequest) -> Result<BufferedReply> {
        run_buffered(self.spawner.as_ref(), &self.config, &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::mock::ScriptedSpawner;

    #[tokio::test]
    async fn stream_ends_with_done() {
        let service = AgentService::new(
            ScriptedSpawner::new().stdout("hello"),
            AgentConfig::default(),
        );
        let mut rx = service.stream(AgentRequest::new("hi"));
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(events, vec![StreamEvent::content("hello"), StreamEvent::Done]);
        assert_eq!(service.spawner().invocations().len(), 1);
    }

    #[tokio::test]
    async fn complete_returns_reply() {
        let service = AgentService::new(
            ScriptedSpawner::new().stdout("answer [[UI:open_panel]]"),
            AgentConfig::default(),
        );
        let reply = service.complete(AgentRequest::new("q")).await.unwrap();
        assert_eq!(reply.content, "answer");
        assert_eq!(reply.directives.len(), 1);
        assert!(reply.session_id.is_none());
    }
}
