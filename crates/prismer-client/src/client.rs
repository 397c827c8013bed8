//! HTTP client for the gateway REST API.

use futures::stream::{BoxStream, StreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use tracing::debug;

use prismer_core::{Artifact, SessionId, StreamEvent};

use crate::error::{ClientError, Result};
use crate::sse::decode_stream;
use crate::types::{
    ApiErrorResponse, ArtifactList, BufferedReply, ChatRequest, CreateSessionRequest,
    DeleteResponse, HealthResponse, ListSessionsResponse, ProviderSettings, SessionRecord,
};

/// Events of one streamed chat response.
pub type EventStream = BoxStream<'static, Result<StreamEvent>>;

/// Client for the gateway REST API.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
    provider: Option<ProviderSettings>,
}

impl GatewayClient {
    /// Create a new gateway client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the gateway (e.g., "http://localhost:8080")
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            provider: None,
        }
    }

    /// Send these provider credentials with every chat request.
    #[must_use]
    pub fn with_provider(mut self, provider: ProviderSettings) -> Self {
        self.provider = Some(provider);
        self
    }

    /// The base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Handle API error responses.
    async fn handle_error(response: Response) -> ClientError {
        let status = response.status().as_u16();
        let message = match response.json::<ApiErrorResponse>().await {
            Ok(err) => err.error.message,
            Err(_) => "Unknown error".to_string(),
        };
        ClientError::Api { status, message }
    }

    fn chat_request(&self, content: &str, session_id: Option<&SessionId>, stream: bool) -> ChatRequest {
        ChatRequest {
            content: content.to_string(),
            session_id: session_id.cloned(),
            stream,
            config: self.provider.clone(),
        }
    }

    /// Check that the gateway is up.
    pub async fn health(&self) -> Result<HealthResponse> {
        let url = format!("{}/api/v1/status/health", self.base_url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    // =========================================================================
    // Chat
    // =========================================================================

    /// Send a message and stream the response.
    ///
    /// The returned stream ends after `done` or when the connection closes.
    /// Dropping it aborts the request.
    pub async fn chat_stream(
        &self,
        content: &str,
        session_id: Option<&SessionId>,
    ) -> Result<EventStream> {
        let url = format!("{}/api/v1/chat", self.base_url);
        let request = self.chat_request(content, session_id, true);

        let response = self
            .client
            .post(&url)
            .header(ACCEPT, "text/event-stream")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        if let Some(content_type) = response.headers().get(CONTENT_TYPE) {
            debug!(content_type = ?content_type, "Chat stream opened");
        }

        let body = Box::pin(response.bytes_stream());
        Ok(decode_stream(body).map(|item| item.map_err(ClientError::from)).boxed())
    }

    /// Send a message and wait for the whole response.
    pub async fn chat(&self, content: &str, session_id: Option<&SessionId>) -> Result<BufferedReply> {
        let url = format!("{}/api/v1/chat", self.base_url);
        let request = self.chat_request(content, session_id, false);

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// List known sessions.
    pub async fn list_sessions(&self) -> Result<Vec<SessionRecord>> {
        let url = format!("{}/api/v1/sessions", self.base_url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        let body: ListSessionsResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        Ok(body.sessions)
    }

    /// Create a session, letting the gateway pick the id when none is given.
    pub async fn create_session(&self, session_id: Option<&SessionId>) -> Result<SessionRecord> {
        let url = format!("{}/api/v1/sessions", self.base_url);
        let request = CreateSessionRequest {
            session_id: session_id.cloned(),
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    /// Fetch one session.
    pub async fn get_session(&self, session_id: &SessionId) -> Result<SessionRecord> {
        let url = format!("{}/api/v1/sessions/{}", self.base_url, session_id);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    /// Delete a session.
    pub async fn delete_session(&self, session_id: &SessionId) -> Result<()> {
        let url = format!("{}/api/v1/sessions/{}", self.base_url, session_id);

        let response = self.client.delete(&url).send().await?;

        if response.status() != StatusCode::NO_CONTENT && !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        Ok(())
    }

    // =========================================================================
    // Artifacts
    // =========================================================================

    /// List artifacts under `path` (the output directory when `None`).
    pub async fn list_artifacts(&self, path: Option<&str>, recursive: bool) -> Result<Vec<Artifact>> {
        let url = format!("{}/api/v1/artifacts", self.base_url);

        let mut query: Vec<(&str, String)> = vec![("recursive", recursive.to_string())];
        if let Some(path) = path {
            query.push(("path", path.to_string()));
        }

        let response = self.client.get(&url).query(&query).send().await?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        let body: ArtifactList = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        debug!(path = %body.path, total = body.total, "Artifacts listed");
        Ok(body.artifacts)
    }

    /// Delete one artifact.
    pub async fn delete_artifact(&self, path: &str) -> Result<()> {
        let url = format!("{}/api/v1/artifacts", self.base_url);

        let response = self
            .client
            .delete(&url)
            .query(&[("path", path)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        let body: DeleteResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        if !body.success {
            return Err(ClientError::Api {
                status: 500,
                message: format!("Failed to delete {}", body.path),
            });
        }
        Ok(())
    }
}
