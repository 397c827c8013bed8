//! Conversation state: the message list and its streaming flags.
//!
//! Mutated only from the controller's event loop and from user actions,
//! never concurrently. Operations on unknown message ids are no-ops.

use chrono::{DateTime, Utc};
use prismer_core::{MessageId, ToolCall};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Appended to a message whose response was cancelled.
pub const CANCELLED_MARKER: &str = "[Cancelled]";

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The person at the keyboard.
    User,
    /// The agent.
    Assistant,
    /// The client itself.
    System,
}

/// How a message should be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Plain text.
    Text,
    /// Markdown.
    #[default]
    Markdown,
    /// A failed response.
    Error,
    /// Client notice.
    System,
}

/// One entry of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique within the conversation.
    pub id: MessageId,
    /// Author.
    pub role: Role,
    /// Rendering hint.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Text so far.
    pub content: String,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// A response is still arriving for this message.
    #[serde(default)]
    pub streaming: bool,
    /// Tool invocations, in first-seen order.
    #[serde(default, rename = "toolCalls", skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Text streamed after an error line starts a new paragraph.
    #[serde(skip)]
    break_before_next: bool,
}

impl Message {
    /// A finished user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, MessageKind::Text, content.into(), false)
    }

    /// An empty assistant message that is about to stream.
    #[must_use]
    pub fn assistant_placeholder() -> Self {
        Self::new(Role::Assistant, MessageKind::Markdown, String::new(), true)
    }

    fn new(role: Role, kind: MessageKind, content: String, streaming: bool) -> Self {
        Self {
            id: MessageId::generate(),
            role,
            kind,
            content,
            timestamp: Utc::now(),
            streaming,
            tool_calls: Vec::new(),
            break_before_next: false,
        }
    }

    fn append_line(&mut self, line: &str) {
        if !self.content.is_empty() {
            self.content.push_str("\n\n");
        }
        self.content.push_str(line);
        self.break_before_next = false;
    }

    fn append_terminal(&mut self, line: &str) {
        self.append_line(line);
        self.streaming = false;
    }
}

/// Partial update for [`Conversation::update_message`]. `None` fields are
/// left alone.
#[derive(Debug, Clone, Default)]
pub struct MessageUpdate {
    /// Replace the content.
    pub content: Option<String>,
    /// Replace the rendering hint.
    pub kind: Option<MessageKind>,
    /// Set the streaming flag.
    pub streaming: Option<bool>,
}

/// The ordered message list.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    streaming: bool,
    streaming_id: Option<MessageId>,
}

impl Conversation {
    /// An empty conversation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted messages. Nothing is streaming afterwards.
    #[must_use]
    pub fn from_messages(messages: Vec<Message>) -> Self {
        let messages = messages
            .into_iter()
            .map(|mut m| {
                m.streaming = false;
                m
            })
            .collect();
        Self {
            messages,
            ..Self::default()
        }
    }

    /// All messages, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Look up a message.
    #[must_use]
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    fn get_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        let found = self.messages.iter_mut().find(|m| m.id == id);
        if found.is_none() {
            debug!(message_id = %id, "Update for unknown message ignored");
        }
        found
    }

    /// Whether a response is streaming.
    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// The message currently streaming, if any.
    #[must_use]
    pub const fn streaming_id(&self) -> Option<MessageId> {
        self.streaming_id
    }

    /// Append a message and return its id.
    pub fn add_message(&mut self, message: Message) -> MessageId {
        let id = message.id;
        self.messages.push(message);
        id
    }

    /// Apply a partial update.
    pub fn update_message(&mut self, id: MessageId, update: MessageUpdate) {
        let Some(message) = self.get_mut(id) else {
            return;
        };
        if let Some(content) = update.content {
            message.content = content;
        }
        if let Some(kind) = update.kind {
            message.kind = kind;
        }
        if let Some(streaming) = update.streaming {
            message.streaming = streaming;
        }
    }

    /// Append streamed text to a message.
    pub fn append_stream_chunk(&mut self, id: MessageId, text: &str) {
        if let Some(message) = self.get_mut(id) {
            if message.break_before_next && !text.is_empty() {
                message.content.push_str("\n\n");
                message.break_before_next = false;
            }
            message.content.push_str(text);
        }
    }

    /// Set the conversation-level streaming flag.
    pub fn set_streaming(&mut self, streaming: bool, id: Option<MessageId>) {
        self.streaming = streaming;
        self.streaming_id = if streaming { id } else { None };
    }

    /// Drop every message.
    pub fn clear_messages(&mut self) {
        self.messages.clear();
        self.set_streaming(false, None);
    }

    /// Record a tool call: create it on first sight, otherwise update its
    /// status and output in place.
    pub fn upsert_tool_call(&mut self, id: MessageId, call: ToolCall) {
        let Some(message) = self.get_mut(id) else {
            return;
        };
        match message.tool_calls.iter_mut().find(|c| c.id == call.id) {
            Some(existing) => {
                existing.status = call.status;
                if call.output.is_some() {
                    existing.output = call.output;
                }
                if !call.input.is_empty() {
                    existing.input = call.input;
                }
            }
            None => message.tool_calls.push(call),
        }
    }

    /// The response for `id` completed.
    pub fn finish(&mut self, id: MessageId) {
        if let Some(message) = self.get_mut(id) {
            message.streaming = false;
        }
        self.end_stream(id);
    }

    /// The agent reported an error while the response for `id` keeps
    /// streaming. The message is marked as an error; later text follows
    /// the error line as a new paragraph.
    pub fn record_error(&mut self, id: MessageId, error: &str) {
        if let Some(message) = self.get_mut(id) {
            message.append_line(&format!("Error: {error}"));
            message.kind = MessageKind::Error;
            message.break_before_next = true;
        }
    }

    /// The response for `id` failed. Partial content is kept.
    pub fn fail(&mut self, id: MessageId, error: &str) {
        if let Some(message) = self.get_mut(id) {
            message.append_terminal(&format!("Error: {error}"));
            message.kind = MessageKind::Error;
        }
        self.end_stream(id);
    }

    /// The response for `id` was cancelled. Partial content is kept.
    pub fn cancel(&mut self, id: MessageId) {
        if let Some(message) = self.get_mut(id) {
            message.append_terminal(CANCELLED_MARKER);
        }
        self.end_stream(id);
    }

    fn end_stream(&mut self, id: MessageId) {
        if self.streaming_id == Some(id) {
            self.set_streaming(false, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prismer_core::ToolStatus;

    fn streaming_turn(conversation: &mut Conversation) -> MessageId {
        conversation.add_message(Message::user("hi"));
        let id = conversation.add_message(Message::assistant_placeholder());
        conversation.set_streaming(true, Some(id));
        id
    }

    #[test]
    fn append_and_finish() {
        let mut conversation = Conversation::new();
        let id = streaming_turn(&mut conversation);
        conversation.append_stream_chunk(id, "Hel");
        conversation.append_stream_chunk(id, "lo");
        conversation.finish(id);

        let message = conversation.get(id).unwrap();
        assert_eq!(message.content, "Hello");
        assert!(!message.streaming);
        assert!(!conversation.is_streaming());
    }

    #[test]
    fn unknown_id_is_a_no_op() {
        let mut conversation = Conversation::new();
        conversation.append_stream_chunk(MessageId::generate(), "x");
        conversation.update_message(
            MessageId::generate(),
            MessageUpdate {
                content: Some("y".into()),
                ..MessageUpdate::default()
            },
        );
        assert!(conversation.messages().is_empty());
    }

    #[test]
    fn cancel_keeps_partial_content() {
        let mut conversation = Conversation::new();
        let id = streaming_turn(&mut conversation);
        conversation.append_stream_chunk(id, "partial");
        conversation.cancel(id);

        let message = conversation.get(id).unwrap();
        assert_eq!(message.content, "partial\n\n[Cancelled]");
        assert!(!message.streaming);
        assert!(!conversation.is_streaming());
    }

    #[test]
    fn fail_marks_error() {
        let mut conversation = Conversation::new();
        let id = streaming_turn(&mut conversation);
        conversation.fail(id, "Agent exited with code 1");
        let message = conversation.get(id).unwrap();
        assert_eq!(message.content, "Error: Agent exited with code 1");
        assert_eq!(message.kind, MessageKind::Error);
    }

    #[test]
    fn recorded_error_keeps_streaming() {
        let mut conversation = Conversation::new();
        let id = streaming_turn(&mut conversation);
        conversation.append_stream_chunk(id, "partial");
        conversation.record_error(id, "API key not recognized.");
        assert!(conversation.get(id).unwrap().streaming);
        assert_eq!(conversation.streaming_id(), Some(id));

        conversation.append_stream_chunk(id, "Result ");
        conversation.append_stream_chunk(id, "ready");
        conversation.finish(id);

        let message = conversation.get(id).unwrap();
        assert_eq!(
            message.content,
            "partial\n\nError: API key not recognized.\n\nResult ready"
        );
        assert_eq!(message.kind, MessageKind::Error);
        assert!(!message.streaming);
        assert!(!conversation.is_streaming());
    }

    #[test]
    fn update_message_is_partial() {
        let mut conversation = Conversation::new();
        let id = conversation.add_message(Message::user("a"));
        conversation.update_message(
            id,
            MessageUpdate {
                kind: Some(MessageKind::System),
                ..MessageUpdate::default()
            },
        );
        let message = conversation.get(id).unwrap();
        assert_eq!(message.content, "a");
        assert_eq!(message.kind, MessageKind::System);
    }

    #[test]
    fn tool_calls_upsert_in_place() {
        let mut conversation = Conversation::new();
        let id = streaming_turn(&mut conversation);
        let mut call = ToolCall {
            id: "t1".into(),
            tool: "python".into(),
            input: serde_json::Map::new(),
            output: None,
            status: ToolStatus::Running,
        };
        conversation.upsert_tool_call(id, call.clone());
        call.status = ToolStatus::Completed;
        call.output = Some(serde_json::json!("2"));
        conversation.upsert_tool_call(id, call);

        let calls = &conversation.get(id).unwrap().tool_calls;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].status, ToolStatus::Completed);
        assert_eq!(calls[0].output, Some(serde_json::json!("2")));
    }

    #[test]
    fn clear_resets_streaming() {
        let mut conversation = Conversation::new();
        streaming_turn(&mut conversation);
        conversation.clear_messages();
        assert!(conversation.messages().is_empty());
        assert!(conversation.streaming_id().is_none());
    }
}
