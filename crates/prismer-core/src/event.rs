//! Stream events carried on the SSE wire.
//!
//! Each event is one `data:` line followed by a blank line:
//!
//! ```text
//! data: {"type":"content_delta","data":{"content":"Hello"}}
//!
//! data: {"type":"ui_directive","data":{"type":"open_file","payload":"/output/a.png"}}
//!
//! data: {"type":"error","data":{"error":"Agent exited with code 1"}}
//!
//! data: [DONE]
//!
//! ```

use serde::{Deserialize, Serialize};

use crate::directive::Directive;

/// Payload of the terminal event.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One event of a chat response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A chunk of user-visible text.
    ContentDelta {
        /// The text to append.
        #[serde(default)]
        content: String,
    },
    /// A UI command.
    UiDirective(Directive),
    /// A tool invocation started.
    ToolUse {
        /// The tool call as first observed.
        tool_call: ToolCall,
    },
    /// A tool invocation produced output or changed status.
    ToolResult {
        /// The updated tool call.
        tool_call: ToolCall,
    },
    /// An error. Advisory unless the consumer decides otherwise.
    Error {
        /// Human-readable message.
        error: String,
    },
    /// End of the response. Always last.
    Done,
}

impl StreamEvent {
    /// A `content_delta` event.
    #[must_use]
    pub fn content(text: impl Into<String>) -> Self {
        Self::ContentDelta {
            content: text.into(),
        }
    }

    /// An `error` event.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    /// Whether this is the terminal sentinel.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// The `type` tag used on the wire.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::ContentDelta { .. } => "content_delta",
            Self::UiDirective(_) => "ui_directive",
            Self::ToolUse { .. } => "tool_use",
            Self::ToolResult { .. } => "tool_result",
            Self::Error { .. } => "error",
            Self::Done => "done",
        }
    }

    /// Encode the payload of the `data:` line.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be serialized as JSON.
    pub fn to_sse_data(&self) -> crate::Result<String> {
        if self.is_done() {
            return Ok(DONE_SENTINEL.to_string());
        }
        Ok(serde_json::to_string(self)?)
    }
}

impl From<Directive> for StreamEvent {
    fn from(directive: Directive) -> Self {
        Self::UiDirective(directive)
    }
}

/// Lifecycle of a tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    /// Announced but not started.
    #[default]
    Pending,
    /// Executing.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Error,
}

/// A tool invocation attached to an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique within its message.
    pub id: String,
    /// Tool name.
    pub tool: String,
    /// Tool arguments.
    #[serde(default)]
    pub input: serde_json::Map<String, serde_json::Value>,
    /// Tool output, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    /// Current status.
    #[serde(default)]
    pub status: ToolStatus,
}
