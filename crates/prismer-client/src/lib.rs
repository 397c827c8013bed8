//! Client library for the prismer gateway.
//!
//! - **HTTP client**: [`GatewayClient`] for chat, sessions and artifacts
//! - **SSE reader**: chunk-safe decoding of the chat event stream
//! - **Directive executor**: [`execute`] maps `ui_directive` events onto [`UiState`]
//! - **Conversation**: the message list with streaming, failure and cancellation
//! - **Controller**: [`ChatController`] ties it together with one in-flight send
//! - **Snapshots**: persisting the allowlisted state between runs
//!
//! # Example
//!
//! ```no_run
//! use prismer_client::{ChatController, ClientState, GatewayClient};
//!
//! # async fn example() {
//! let client = GatewayClient::new("http://localhost:8080");
//! let mut controller = ChatController::new(client, ClientState::default());
//!
//! let id = controller.send("plot the data").unwrap();
//! controller.wait_idle().await;
//!
//! let reply = controller.state().conversation.get(id).unwrap();
//! println!("{}", reply.content);
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod client;
pub mod controller;
pub mod conversation;
pub mod error;
pub mod executor;
pub mod snapshot;
pub mod sse;
pub mod types;
pub mod ui;

pub use client::{EventStream, GatewayClient};
pub use controller::{ChatController, ControllerEvent};
pub use conversation::{Conversation, Message, MessageKind, MessageUpdate, Role};
pub use error::{ClientError, Result};
pub use executor::{execute, Effect};
pub use snapshot::{ClientState, Snapshot};
pub use sse::{decode_payload, decode_stream, SseDecoder};
pub use types::{BufferedReply, ProviderSettings, SessionRecord};
pub use ui::{AgentStatus, PanelState, UiState};
