//! Agent process lifecycle for prismer.
//!
//! This crate owns one agent invocation from spawn to exit:
//!
//! - **Invocation**: turning a chat request into a command line and environment
//! - **Process**: the [`ProcessSpawner`] seam over stdout, stderr and exit status
//! - **Framing**: incremental UTF-8 decoding and output accumulation
//! - **Emission**: per-chunk parsing, path detection, per-response
//!   deduplication and the final refresh, as ordered [`StreamEvent`]s
//! - **Buffered mode**: run to completion and answer with one reply
//!
//! # Example
//!
//! ```no_run
//! use prismer_agent::{AgentConfig, AgentRequest, AgentRunner, AgentService, CommandSpawner};
//!
//! # async fn example() {
//! let service = AgentService::new(CommandSpawner, AgentConfig::default());
//! let mut events = service.stream(AgentRequest::new("plot the data"));
//! while let Some(event) = events.recv().await {
//!     println!("{}", event.type_name());
//! }
//! # }
//! ```
//!
//! # Testing
//!
//! Enable the `test-utils` feature for [`ScriptedSpawner`], which replays
//! canned output instead of starting a process.
//!
//! [`StreamEvent`]: prismer_core::StreamEvent

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod buffered;
pub mod config;
pub mod emitter;
pub mod error;
pub mod framer;
pub mod process;
pub mod request;
pub mod service;

pub use buffered::{run_buffered, BufferedReply};
pub use config::AgentConfig;
pub use emitter::{run_streaming, DirectiveEmitter};
pub use error::{exit_message, AgentError, Result};
pub use framer::{OutputFramer, StderrCollector, Utf8Decoder};
pub use process::{AgentProcess, ByteStream, CommandSpawner, ExitOutcome, ProcessSpawner};
pub use request::{AgentRequest, Credentials, Invocation};
pub use service::{AgentRunner, AgentService};

#[cfg(any(test, feature = "test-utils"))]
pub use process::mock::ScriptedSpawner;
