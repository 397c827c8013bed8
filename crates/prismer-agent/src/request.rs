//! Chat requests and the process invocation they turn into.

use std::collections::BTreeMap;
use std::path::PathBuf;

use prismer_core::SessionId;
use serde::{Deserialize, Serialize};

use crate::config::AgentConfig;
use crate::error::{AgentError, Result};

/// Provider credentials forwarded to the agent process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// API key for the provider.
    pub api_key: String,
    /// Provider name, such as `google` or `anthropic`.
    #[serde(default = "Credentials::default_provider")]
    pub provider: String,
    /// Requested model. Passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Credentials {
    fn default_provider() -> String {
        "google".to_string()
    }

    /// Environment variable the provider conventionally reads its key from.
    #[must_use]
    pub fn env_var(&self) -> String {
        match self.provider.to_ascii_lowercase().as_str() {
            "google" | "gemini" => "GEMINI_API_KEY".to_string(),
            "anthropic" => "ANTHROPIC_API_KEY".to_string(),
            "openai" => "OPENAI_API_KEY".to_string(),
            "venice" => "VENICE_API_KEY".to_string(),
            "openrouter" => "OPENROUTER_API_KEY".to_string(),
            "groq" => "GROQ_API_KEY".to_string(),
            "deepseek" => "DEEPSEEK_API_KEY".to_string(),
            other => format!("{}_API_KEY", other.to_ascii_uppercase().replace('-', "_")),
        }
    }
}

/// One prompt for the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRequest {
    /// Prompt text.
    pub content: String,
    /// Conversation to continue; `None` starts a new one.
    pub session_id: Option<SessionId>,
    /// Provider credentials, if the caller supplied any.
    pub credentials: Option<Credentials>,
}

impl AgentRequest {
    /// A request with no session and no credentials.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            session_id: None,
            credentials: None,
        }
    }

    /// Continue an existing conversation.
    #[must_use]
    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Attach provider credentials.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

/// A fully resolved command line for the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Executable.
    pub program: String,
    /// Arguments, in order.
    pub args: Vec<String>,
    /// Extra environment on top of the inherited one.
    pub env: BTreeMap<String, String>,
    /// Working directory.
    pub working_dir: PathBuf,
}

impl Invocation {
    /// Build the command line for `request`.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::InvalidRequest` if the prompt is blank.
    pub fn build(config: &AgentConfig, request: &AgentRequest) -> Result<Self> {
        if request.content.trim().is_empty() {
            return Err(AgentError::InvalidRequest("Content is required".to_string()));
        }

        let mut args = config.base_args.clone();
        match &request.session_id {
            Some(id) => {
                args.push(config.session_flag.clone());
                args.push(id.to_string());
            }
            None => args.extend(config.new_conversation_args.iter().cloned()),
        }
        args.push(config.message_flag.clone());
        args.push(request.content.clone());

        let mut env = config.env.clone();
        if let Some(credentials) = &request.credentials {
            env.insert(credentials.env_var(), credentials.api_key.clone());
            env.insert("OPENCLAW_API_KEY".to_string(), credentials.api_key.clone());
        }

        Ok(Self {
            program: config.program.clone(),
            args,
            env,
            working_dir: config.working_dir.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(provider: &str) -> Credentials {
        Credentials {
            api_key: "sk-test".to_string(),
            provider: provider.to_string(),
            model: None,
        }
    }

    #[test]
    fn new_conversation_args() {
        let invocation =
            Invocation::build(&AgentConfig::default(), &AgentRequest::new("hello")).unwrap();
        assert_eq!(invocation.program, "openclaw");
        assert_eq!(
            invocation.args,
            vec!["agent", "--local", "--to", "+10000000000", "--message", "hello"]
        );
        assert!(!invocation.env.contains_key("OPENCLAW_API_KEY"));
    }

    #[test]
    fn session_args() {
        let request = AgentRequest::new("next").with_session("s-1".parse().unwrap());
        let invocation = Invocation::build(&AgentConfig::default(), &request).unwrap();
        assert_eq!(
            invocation.args,
            vec!["agent", "--local", "--session-id", "s-1", "--message", "next"]
        );
    }

    #[test]
    fn prompt_is_a_single_argument() {
        let request = AgentRequest::new("--help; rm -rf /");
        let invocation = Invocation::build(&AgentConfig::default(), &request).unwrap();
        assert_eq!(invocation.args.last().unwrap(), "--help; rm -rf /");
    }

    #[test]
    fn blank_prompt_rejected() {
        let err = Invocation::build(&AgentConfig::default(), &AgentRequest::new("  \n")).unwrap_err();
        assert!(matches!(err, AgentError::InvalidRequest(_)));
    }

    #[test]
    fn credentials_injected_into_env() {
        let request = AgentRequest::new("hi").with_credentials(creds("anthropic"));
        let invocation = Invocation::build(&AgentConfig::default(), &request).unwrap();
        assert_eq!(invocation.env["ANTHROPIC_API_KEY"], "sk-test");
        assert_eq!(invocation.env["OPENCLAW_API_KEY"], "sk-test");
        assert_eq!(invocation.env["HOME"], "/home/user");
    }

    #[test]
    fn provider_env_vars() {
        assert_eq!(creds("google").env_var(), "GEMINI_API_KEY");
        assert_eq!(creds("OpenAI").env_var(), "OPENAI_API_KEY");
        assert_eq!(creds("deepseek").env_var(), "DEEPSEEK_API_KEY");
        assert_eq!(creds("together-ai").env_var(), "TOGETHER_AI_API_KEY");
    }

    #[test]
    fn provider_defaults_to_google() {
        let credentials: Credentials = serde_json::from_str(r#"{"api_key":"k"}"#).unwrap();
        assert_eq!(credentials.provider, "google");
        assert_eq!(credentials.env_var(), "GEMINI_API_KEY");
    }
}
