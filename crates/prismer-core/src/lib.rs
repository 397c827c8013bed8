//! Core types and pure functions for prismer.
//!
//! This crate holds everything that both ends of the chat stream agree on:
//!
//! - **Identifiers**: opaque session tokens and message ids
//! - **Directives**: the `[[UI:...]]` grammar embedded in agent output
//! - **Artifact detection**: implicit `open_file` directives inferred from workspace paths
//! - **Stream events**: the tagged union carried on the SSE wire
//! - **Editor mapping**: the fixed extension to viewer table
//!
//! Nothing in here performs I/O.
//!
//! # Example
//!
//! ```
//! use prismer_core::directive::parse_directives;
//!
//! let parsed = parse_directives("Done. [[UI:show_artifact:/output/plot.png]]");
//! assert_eq!(parsed.clean_text, "Done.");
//! assert_eq!(parsed.directives[0].kind, "show_artifact");
//! assert_eq!(parsed.directives[0].payload, "/output/plot.png");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod artifact;
pub mod detect;
pub mod directive;
pub mod editor;
pub mod error;
pub mod event;
pub mod ids;

pub use artifact::{file_type, sort_artifacts, Artifact, ArtifactKind};
pub use detect::{canonicalize_path, detect_paths, ArtifactPatterns};
pub use directive::{format_directive, parse_directives, Directive, DirectiveKind, ParsedOutput};
pub use editor::{editor_for_path, EditorKind};
pub use error::{CoreError, Result};
pub use event::{StreamEvent, ToolCall, ToolStatus, DONE_SENTINEL};
pub use ids::{IdError, MessageId, SessionId};
