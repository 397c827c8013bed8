//! Chat controller: owns the client state and the single in-flight send.
//!
//! Network work runs on spawned tasks that report back through a channel
//! as [`ControllerEvent`]s. The owner pulls them with
//! [`ChatController::recv`] and applies them with
//! [`ChatController::handle`], so all state mutation happens on one task.
//!
//! Every send gets a generation number. Cancelling aborts the task, which
//! drops the response body and closes the connection; any event from an
//! older generation still sitting in the channel is discarded.
//!
//! An `error` event from the agent does not end a send: it is recorded on
//! the message and later events keep applying. A send ends on `done`, when
//! the stream closes, or when the transport fails.

use futures::StreamExt;
use prismer_core::{Artifact, MessageId, SessionId, StreamEvent};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::client::GatewayClient;
use crate::conversation::Message;
use crate::executor::{execute, Effect};
use crate::snapshot::ClientState;
use crate::ui::AgentStatus;

/// Capacity of the controller's event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Results of background work.
#[derive(Debug)]
pub enum ControllerEvent {
    /// An event of the streamed response.
    Stream {
        /// Send this event belongs to.
        generation: u64,
        /// The event.
        event: StreamEvent,
    },
    /// The send failed before or during streaming.
    Failed {
        /// Send this failure belongs to.
        generation: u64,
        /// Human-readable message.
        message: String,
    },
    /// The response stream ended.
    Closed {
        /// Send that ended.
        generation: u64,
    },
    /// An artifact fetch completed.
    Artifacts(Result<Vec<Artifact>, String>),
}

#[derive(Debug)]
struct InFlight {
    generation: u64,
    message_id: MessageId,
    abort: AbortHandle,
    /// The agent reported an error on this send.
    errored: bool,
}

/// Drives conversations against a gateway.
#[derive(Debug)]
pub struct ChatController {
    client: GatewayClient,
    state: ClientState,
    generation: u64,
    in_flight: Option<InFlight>,
    tx: mpsc::Sender<ControllerEvent>,
    rx: mpsc::Receiver<ControllerEvent>,
}

impl ChatController {
    /// Create a controller over existing state.
    #[must_use]
    pub fn new(client: GatewayClient, state: ClientState) -> Self {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            client,
            state,
            generation: 0,
            in_flight: None,
            tx,
            rx,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &ClientState {
        &self.state
    }

    /// Mutable state, for user actions outside the chat flow.
    pub fn state_mut(&mut self) -> &mut ClientState {
        &mut self.state
    }

    /// The gateway client.
    #[must_use]
    pub const fn client(&self) -> &GatewayClient {
        &self.client
    }

    /// Whether a response is in flight.
    #[must_use]
    pub const fn is_sending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Id of the assistant message being streamed.
    #[must_use]
    pub fn in_flight_message(&self) -> Option<MessageId> {
        self.in_flight.as_ref().map(|f| f.message_id)
    }

    // =========================================================================
    // User Actions
    // =========================================================================

    /// Send a message, cancelling any response still in flight.
    ///
    /// Returns the id of the assistant message the response streams into,
    /// or `None` for blank input.
    pub fn send(&mut self, content: &str) -> Option<MessageId> {
        let content = content.trim();
        if content.is_empty() {
            return None;
        }
        self.cancel();

        let session_id = self
            .state
            .session_id
            .get_or_insert_with(SessionId::generate)
            .clone();

        let conversation = &mut self.state.conversation;
        conversation.add_message(Message::user(content));
        let message_id = conversation.add_message(Message::assistant_placeholder());
        conversation.set_streaming(true, Some(message_id));
        self.state.ui.agent_status = AgentStatus::Running;
        self.state.ui.last_error = None;

        self.generation += 1;
        let generation = self.generation;
        let client = self.client.clone();
        let tx = self.tx.clone();
        let content = content.to_string();

        let task = tokio::spawn(async move {
            let mut events = match client.chat_stream(&content, Some(&session_id)).await {
                Ok(events) => events,
                Err(e) => {
                    let _ = tx
                        .send(ControllerEvent::Failed {
                            generation,
                            message: e.user_message(),
                        })
                        .await;
                    return;
                }
            };
            while let Some(item) = events.next().await {
                let event = match item {
                    Ok(event) => ControllerEvent::Stream { generation, event },
                    Err(e) => ControllerEvent::Failed {
                        generation,
                        message: e.user_message(),
                    },
                };
                if tx.send(event).await.is_err() {
                    return;
                }
            }
            let _ = tx.send(ControllerEvent::Closed { generation }).await;
        });

        info!(generation, message_id = %message_id, "Message sent");
        self.in_flight = Some(InFlight {
            generation,
            message_id,
            abort: task.abort_handle(),
            errored: false,
        });
        Some(message_id)
    }

    /// Cancel the in-flight response. A no-op when nothing is in flight.
    ///
    /// Partial content stays; the message gets a cancellation marker.
    pub fn cancel(&mut self) {
        let Some(in_flight) = self.in_flight.take() else {
            return;
        };
        in_flight.abort.abort();
        self.state.conversation.cancel(in_flight.message_id);
        self.state.ui.agent_status = AgentStatus::Idle;
        info!(generation = in_flight.generation, "Response cancelled");
    }

    /// Start a fresh conversation with a new session id.
    pub fn new_session(&mut self) -> SessionId {
        self.cancel();
        self.state.conversation.clear_messages();
        self.state.ui.selected_artifact = None;
        self.state.ui.last_error = None;
        let session_id = SessionId::generate();
        self.state.session_id = Some(session_id.clone());
        info!(session_id = %session_id, "New session");
        session_id
    }

    /// Re-fetch the artifact list unless a fetch is already running.
    pub fn refresh_artifacts(&mut self) {
        if self.state.ui.artifacts_loading {
            return;
        }
        self.state.ui.artifacts_loading = true;
        self.spawn_artifact_fetch();
    }

    fn spawn_artifact_fetch(&self) {
        let client = self.client.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = client
                .list_artifacts(None, false)
                .await
                .map_err(|e| e.user_message());
            let _ = tx.send(ControllerEvent::Artifacts(result)).await;
        });
    }

    // =========================================================================
    // Event Loop
    // =========================================================================

    /// Wait for the next background event.
    pub async fn recv(&mut self) -> Option<ControllerEvent> {
        self.rx.recv().await
    }

    /// Apply one background event. Returns whether anything changed.
    pub fn handle(&mut self, event: ControllerEvent) -> bool {
        match event {
            ControllerEvent::Artifacts(result) => {
                self.state.ui.finish_artifact_refresh(result);
                true
            }
            ControllerEvent::Stream { generation, event } => {
                let Some(message_id) = self.current(generation) else {
                    return false;
                };
                self.apply(message_id, event);
                true
            }
            ControllerEvent::Failed { generation, message } => {
                let Some(message_id) = self.current(generation) else {
                    return false;
                };
                self.fail(message_id, &message);
                true
            }
            ControllerEvent::Closed { generation } => {
                let Some(message_id) = self.current(generation) else {
                    return false;
                };
                debug!(generation, "Stream closed without done");
                self.complete(message_id);
                true
            }
        }
    }

    /// Process events until no response or artifact fetch is outstanding.
    pub async fn wait_idle(&mut self) {
        while self.is_sending() || self.state.ui.artifacts_loading {
            let Some(event) = self.recv().await else {
                return;
            };
            self.handle(event);
        }
    }

    fn current(&self, generation: u64) -> Option<MessageId> {
        match &self.in_flight {
            Some(f) if f.generation == generation => Some(f.message_id),
            _ => {
                debug!(generation, "Dropping event from a finished send");
                None
            }
        }
    }

    fn apply(&mut self, message_id: MessageId, event: StreamEvent) {
        match event {
            StreamEvent::ContentDelta { content } => {
                self.state.conversation.append_stream_chunk(message_id, &content);
            }
            StreamEvent::UiDirective(directive) => {
                if execute(&mut self.state.ui, &directive) == Effect::FetchArtifacts {
                    self.spawn_artifact_fetch();
                }
            }
            StreamEvent::ToolUse { tool_call } | StreamEvent::ToolResult { tool_call } => {
                self.state.conversation.upsert_tool_call(message_id, tool_call);
            }
            StreamEvent::Error { error } => self.record_error(message_id, error),
            StreamEvent::Done => self.complete(message_id),
        }
    }

    fn complete(&mut self, message_id: MessageId) {
        self.state.conversation.finish(message_id);
        let errored = self.in_flight.take().is_some_and(|f| f.errored);
        self.state.ui.agent_status = if errored {
            AgentStatus::Error
        } else {
            AgentStatus::Idle
        };
    }

    fn record_error(&mut self, message_id: MessageId, error: String) {
        warn!(error = %error, "Agent reported an error");
        self.state.conversation.record_error(message_id, &error);
        self.state.ui.agent_status = AgentStatus::Error;
        self.state.ui.last_error = Some(error);
        if let Some(in_flight) = self.in_flight.as_mut() {
            in_flight.errored = true;
        }
    }

    fn fail(&mut self, message_id: MessageId, error: &str) {
        warn!(error = %error, "Response failed");
        self.state.conversation.fail(message_id, error);
        self.state.ui.agent_status = AgentStatus::Error;
        self.state.ui.last_error = Some(error.to_string());
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.abort.abort();
        }
    }
}
