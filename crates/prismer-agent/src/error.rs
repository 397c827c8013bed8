//! Error types for agent invocations.

use thiserror::Error;

/// A result type using `AgentError`.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors surfaced by buffered invocations.
///
/// Streaming invocations never return these; every failure becomes an
/// `error` event on the stream instead.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The request was rejected before anything was spawned.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The agent process could not be started.
    #[error("failed to start agent: {0}")]
    Spawn(String),

    /// The agent process exited unsuccessfully.
    #[error("{message}")]
    Exited {
        /// Exit code, `None` when terminated by a signal.
        code: Option<i32>,
        /// Human-readable failure description.
        message: String,
    },

    /// Reading the agent's output or waiting for it failed.
    #[error("agent io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentError {
    /// Returns true if the failure happened before the agent ran.
    #[must_use]
    pub const fn is_spawn_failure(&self) -> bool {
        matches!(self, Self::Spawn(_))
    }
}

/// Describe a non-zero or missing exit code.
#[must_use]
pub fn exit_message(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("Agent exited with code {code}"),
        None => "Agent was terminated by a signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_messages() {
        assert_eq!(exit_message(Some(1)), "Agent exited with code 1");
        assert_eq!(exit_message(None), "Agent was terminated by a signal");
    }

    #[test]
    fn exited_displays_message_only() {
        let err = AgentError::Exited {
            code: Some(2),
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "boom");
        assert!(!err.is_spawn_failure());
        assert!(AgentError::Spawn("nope".into()).is_spawn_failure());
    }
}
