//! Agent invocation configuration.

use std::collections::BTreeMap;
use std::path::PathBuf;

use prismer_core::ArtifactPatterns;
use serde::Deserialize;

/// How to launch the agent and how to interpret its output.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Agent executable.
    #[serde(default = "AgentConfig::default_program")]
    pub program: String,

    /// Arguments placed before the conversation arguments.
    #[serde(default = "AgentConfig::default_base_args")]
    pub base_args: Vec<String>,

    /// Arguments used when the request carries no session id.
    #[serde(default = "AgentConfig::default_new_conversation_args")]
    pub new_conversation_args: Vec<String>,

    /// Flag that introduces the session id.
    #[serde(default = "AgentConfig::default_session_flag")]
    pub session_flag: String,

    /// Flag that introduces the prompt.
    #[serde(default = "AgentConfig::default_message_flag")]
    pub message_flag: String,

    /// Working directory of the agent process.
    #[serde(default = "AgentConfig::default_working_dir")]
    pub working_dir: PathBuf,

    /// Extra environment for the agent process.
    #[serde(default = "AgentConfig::default_env")]
    pub env: BTreeMap<String, String>,

    /// Stderr substring that signals rejected credentials.
    #[serde(default = "AgentConfig::default_auth_failure_marker")]
    pub auth_failure_marker: String,

    /// Error sent to the client when the marker is seen.
    #[serde(default = "AgentConfig::default_auth_failure_message")]
    pub auth_failure_message: String,

    /// Capacity of the event queue between the process task and the wire.
    #[serde(default = "AgentConfig::default_channel_capacity")]
    pub channel_capacity: usize,

    /// Artifact detection patterns.
    #[serde(default)]
    pub patterns: ArtifactPatterns,

    /// Strip the workspace root from path payloads before deduplication.
    #[serde(default = "AgentConfig::default_canonicalize_paths")]
    pub canonicalize_paths: bool,
}

impl AgentConfig {
    fn default_program() -> String {
        "openclaw".to_string()
    }

    fn default_base_args() -> Vec<String> {
        vec!["agent".to_string(), "--local".to_string()]
    }

    fn default_new_conversation_args() -> Vec<String> {
        vec!["--to".to_string(), "+10000000000".to_string()]
    }

    fn default_session_flag() -> String {
        "--session-id".to_string()
    }

    fn default_message_flag() -> String {
        "--message".to_string()
    }

    fn default_working_dir() -> PathBuf {
        PathBuf::from("/workspace")
    }

    fn default_env() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("HOME".to_string(), "/home/user".to_string()),
            (
                "OPENCLAW_HOME".to_string(),
                "/workspace/.openclaw".to_string(),
            ),
        ])
    }

    fn default_auth_failure_marker() -> String {
        "No API key found".to_string()
    }

    fn default_auth_failure_message() -> String {
        "API key not recognized. Please check your API key and provider settings.".to_string()
    }

    const fn default_channel_capacity() -> usize {
        64
    }

    const fn default_canonicalize_paths() -> bool {
        true
    }

    /// Point the agent and artifact detection at a different workspace root.
    #[must_use]
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        self.patterns = ArtifactPatterns::with_root(root.to_string_lossy());
        self.working_dir = root;
        self
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            program: Self::default_program(),
            base_args: Self::default_base_args(),
            new_conversation_args: Self::default_new_conversation_args(),
            session_flag: Self::default_session_flag(),
            message_flag: Self::default_message_flag(),
            working_dir: Self::default_working_dir(),
            env: Self::default_env(),
            auth_failure_marker: Self::default_auth_failure_marker(),
            auth_failure_message: Self::default_auth_failure_message(),
            channel_capacity: Self::default_channel_capacity(),
            patterns: ArtifactPatterns::default(),
            canonicalize_paths: Self::default_canonicalize_paths(),
        }
    }
}
