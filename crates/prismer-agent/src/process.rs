//! The agent process seen as two byte streams and an exit status.
//!
//! [`ProcessSpawner`] is the seam between the emitter and the operating
//! system. [`CommandSpawner`] starts a real child process; the `mock` module
//! (behind `test-utils`) replays scripted output.

use std::io;
use std::process::Stdio;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::debug;

use crate::request::Invocation;

/// Bytes read from one of the agent's output pipes.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

const READ_CHUNK: usize = 8 * 1024;

/// How the agent process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    /// Exit code; `None` when the process was killed by a signal.
    pub code: Option<i32>,
}

impl ExitOutcome {
    /// Returns true for exit code 0.
    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// A running agent.
///
/// Dropping the exit future before it resolves must stop the process.
pub struct AgentProcess {
    /// Standard output.
    pub stdout: ByteStream,
    /// Standard error.
    pub stderr: ByteStream,
    /// Resolves once the process has exited.
    pub exit: BoxFuture<'static, io::Result<ExitOutcome>>,
}

/// Starts agent processes.
pub trait ProcessSpawner: Send + Sync + 'static {
    /// Start a process for `invocation`.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be started.
    fn spawn(&self, invocation: &Invocation) -> io::Result<AgentProcess>;
}

/// Spawns real child processes with tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandSpawner;

impl ProcessSpawner for CommandSpawner {
    fn spawn(&self, invocation: &Invocation) -> io::Result<AgentProcess> {
        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .envs(&invocation.env)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        debug!(pid = ?child.id(), program = %invocation.program, "spawned agent process");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "stderr not captured"))?;

        let exit = async move {
            let status = child.wait().await?;
            Ok(ExitOutcome {
                code: status.code(),
            })
        }
        .boxed();

        Ok(AgentProcess {
            stdout: reader_stream(stdout),
            stderr: reader_stream(stderr),
            exit,
        })
    }
}

/// Turn a pipe into a stream of chunks. The stream ends after the first error.
fn reader_stream<R>(reader: R) -> ByteStream
where
    R: AsyncRead + Unpin + Send + 'static,
{
    stream::unfold(Some(reader), |state| async move {
        let mut reader = state?;
        let mut buf = vec![0u8; READ_CHUNK];
        match reader.read(&mut buf).await {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some((Ok(Bytes::from(buf)), Some(reader)))
            }
            Err(e) => Some((Err(e), None)),
        }
    })
    .boxed()
}

/// A scripted spawner for testing without an agent binary.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Replays the same scripted output for every spawn.
    #[derive(Default)]
    pub struct ScriptedSpawner {
        stdout: Vec<Bytes>,
        stderr: Vec<Bytes>,
        exit_code: Option<i32>,
        spawn_error: Option<String>,
        hang: bool,
        invocations: Mutex<Vec<Invocation>>,
        abandoned: Arc<AtomicBool>,
    }

    struct AbandonGuard(Arc<AtomicBool>);

    impl Drop for AbandonGuard {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    impl ScriptedSpawner {
        /// A process that prints nothing and exits with code 0.
        #[must_use]
        pub fn new() -> Self {
            Self {
                exit_code: Some(0),
                ..Self::default()
            }
        }

        /// Append one stdout chunk.
        #[must_use]
        pub fn stdout(mut self, chunk: impl AsRef<[u8]>) -> Self {
            self.stdout.push(Bytes::copy_from_slice(chunk.as_ref()));
            self
        }

        /// Append one stderr chunk.
        #[must_use]
        pub fn stderr(mut self, chunk: impl AsRef<[u8]>) -> Self {
            self.stderr.push(Bytes::copy_from_slice(chunk.as_ref()));
            self
        }

        /// Set the exit code; `None` simulates a signal.
        #[must_use]
        pub fn exit_code(mut self, code: Option<i32>) -> Self {
            self.exit_code = code;
            self
        }

        /// Make every spawn fail with `message`.
        #[must_use]
        pub fn fail_spawn(mut self, message: impl Into<String>) -> Self {
            self.spawn_error = Some(message.into());
            self
        }

        /// Keep stdout open and never exit after the scripted chunks.
        #[must_use]
        pub fn hang(mut self) -> Self {
            self.hang = true;
            self
        }

        /// Invocations seen so far.
        #[must_use]
        pub fn invocations(&self) -> Vec<Invocation> {
            self.invocations.lock().clone()
        }

        /// Whether a hanging process was dropped before it exited.
        #[must_use]
        pub fn abandoned(&self) -> bool {
            self.abandoned.load(Ordering::SeqCst)
        }
    }

    impl ProcessSpawner for ScriptedSpawner {
        fn spawn(&self, invocation: &Invocation) -> io::Result<AgentProcess> {
            self.invocations.lock().push(invocation.clone());
            if let Some(message) = &self.spawn_error {
                return Err(io::Error::new(io::ErrorKind::NotFound, message.clone()));
            }

            let stdout = stream::iter(self.stdout.clone().into_iter().map(Ok));
            let stderr = stream::iter(self.stderr.clone().into_iter().map(Ok)).boxed();

            if self.hang {
                let guard = AbandonGuard(Arc::clone(&self.abandoned));
                return Ok(AgentProcess {
                    stdout: stdout.chain(stream::pending()).boxed(),
                    stderr,
                    exit: async move {
                        let _guard = guard;
                        futures::future::pending::<io::Result<ExitOutcome>>().await
                    }
                    .boxed(),
                });
            }

            let code = self.exit_code;
            Ok(AgentProcess {
                stdout: stdout.boxed(),
                stderr,
                exit: async move { Ok(ExitOutcome { code }) }.boxed(),
            })
        }
    }
}
