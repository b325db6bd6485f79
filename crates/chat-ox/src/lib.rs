//! Provider-agnostic chat-completion model and tool-calling loop
//!
//! This crate holds the pieces of an OpenAI-style chat exchange that do not
//! depend on a particular provider:
//! - Messages, tool descriptors and tool calls in the chat-completions wire format
//! - Request options with defaults and overrides, and a validating request builder
//! - An append-only conversation that enforces the tool-call protocol
//! - A registry of local tool handlers and a resolver that answers tool calls
//! - A loop driving send, resolve, send over any [`ChatTransport`]
//!
//! # Example
//!
//! ```rust,no_run
//! use chat_ox::{ChatOptions, ChatTransport, Conversation, Message, ToolCallResolver, ToolLoop, ToolRegistry};
//!
//! async fn ask<T: ChatTransport>(transport: T) -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = ToolRegistry::new().with_fn("getCurrentWeather", |_args: &str| {
//!         Ok::<_, std::convert::Infallible>("15c")
//!     });
//!
//!     let tool_loop = ToolLoop::builder()
//!         .transport(transport)
//!         .resolver(ToolCallResolver::new(registry))
//!         .options(ChatOptions::for_model("gpt-4-1106-preview"))
//!         .build();
//!
//!     let conversation = Conversation::from_messages([Message::user("Weather in Paris?")])?;
//!     let outcome = tool_loop.run(conversation).await?;
//!     println!("{}", outcome.content().unwrap_or_default());
//!     Ok(())
//! }
//! ```

pub mod conversation;
pub mod error;
pub mod message;
pub mod options;
pub mod registry;
pub mod request;
pub mod resolver;
pub mod response;
pub mod tool;
pub mod tool_loop;
pub mod transport;
pub mod usage;

// Re-export commonly used types
pub use conversation::Conversation;
pub use error::{BoxedError, ConversationError, RequestError, ResolveError, ToolError, ToolLoopError};
pub use message::{Message, Role};
pub use options::{ChatOptions, ResponseFormat};
pub use registry::{ToolFuture, ToolHandler, ToolRegistry};
pub use request::{ChatRequest, ChatRequestBuilder};
pub use resolver::{Resolution, ToolCallResolver, ToolExecution, ToolFailurePolicy};
pub use response::{ChatResponse, Choice, FinishReason};
pub use tool::{FunctionCall, Tool, ToolCall, ToolChoice, ToolChoiceFunction, ToolFunction, ToolType};
pub use tool_loop::{ToolLoop, ToolLoopOutcome};
pub use transport::ChatTransport;
pub use usage::Usage;

#[cfg(feature = "schema")]
pub use tool::schema_for_type;

pub use futures_util::future::BoxFuture;
