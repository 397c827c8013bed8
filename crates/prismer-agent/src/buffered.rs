//! Buffered invocation: run to completion, answer once.

use futures::{Stream, StreamExt};
use prismer_core::{parse_directives, Directive, SessionId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AgentConfig;
use crate::emitter::DirectiveEmitter;
use crate::error::{exit_message, AgentError, Result};
use crate::framer::OutputFramer;
use crate::process::{AgentProcess, ProcessSpawner};
use crate::request::{AgentRequest, Invocation};

/// The single response of a buffered invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferedReply {
    /// Output with directive markers removed.
    pub content: String,
    /// The session the request belonged to.
    pub session_id: Option<SessionId>,
    /// Directives in the order they appeared.
    pub directives: Vec<Directive>,
}

/// Run `request` to completion and parse its output once.
///
/// # Errors
///
/// - `AgentError::InvalidRequest` for a blank prompt
/// - `AgentError::Spawn` if the process cannot be started
/// - `AgentError::Exited` for a non-zero exit
/// - `AgentError::Io` if reading stdout or waiting fails
pub async fn run_buffered<P>(
    spawner: &P,
    config: &AgentConfig,
    request: &AgentRequest,
) -> Result<BufferedReply>
where
    P: ProcessSpawner + ?Sized,
{
    let invocation = Invocation::build(config, request)?;
    let AgentProcess {
        stdout,
        stderr,
        exit,
    } = spawner.spawn(&invocation).map_err(|e| {
        warn!(program = %invocation.program, error = %e, "failed to start agent");
        AgentError::Spawn(e.to_string())
    })?;

    let (stdout, stderr) = tokio::join!(read_all(stdout), read_all(stderr));
    let outcome = exit.await?;
    let stdout = stdout?;
    let stderr = stderr.unwrap_or_default();

    if !outcome.success() {
        let message = if !config.auth_failure_marker.is_empty()
            && stderr.contains(&config.auth_failure_marker)
        {
            config.auth_failure_message.clone()
        } else if !stderr.trim().is_empty() {
            stderr.trim().to_string()
        } else {
            exit_message(outcome.code)
        };
        warn!(code = ?outcome.code, "agent exited unsuccessfully");
        return Err(AgentError::Exited {
            code: outcome.code,
            message,
        });
    }

    let parsed = parse_directives(&stdout);
    let directives = DirectiveEmitter::from_config(config).collect(parsed.directives, &stdout);
    info!(directives = directives.len(), "agent finished");
    Ok(BufferedReply {
        content: parsed.clean_text,
        session_id: request.session_id.clone(),
        directives,
    })
}

async fn read_all<S>(mut stream: S) -> std::io::Result<String>
where
    S: Stream<Item = std::io::Result<bytes::Bytes>> + Unpin,
{
    let mut framer = OutputFramer::default();
    while let Some(chunk) = stream.next().await {
        framer.push(&chunk?);
    }
    framer.finish();
    Ok(framer.into_accumulated())
}
