//! OpenAI chat-completions transport for `chat-ox`
//!
//! This crate provides:
//! - An [`OpenAI`] client implementing [`chat_ox::ChatTransport`]
//! - Error decoding for OpenAI error payloads, rate limiting and authentication
//! - Rate-limit header parsing
//! - A model catalogue
//! - Settings binding from defaults, TOML files, environment and overrides
//!
//! # Example
//!
//! ```rust,no_run
//! use openai_ox::{Message, OpenAI, OpenAiSettings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = OpenAiSettings::new()?;
//!     let client = OpenAI::from_settings(&settings)?;
//!
//!     let request = client
//!         .chat()
//!         .message(Message::user("Hello, world!"))
//!         .build()?;
//!
//!     let response = client.send(&request).await?;
//!     println!("{}", response.content().unwrap_or("No content"));
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod rate_limit;

// Re-export main types
pub use client::OpenAI;
pub use config::{ConfigError, Metadata, OpenAiChatProperties, OpenAiSettings};
pub use error::OpenAIRequestError;
pub use model::Model;
pub use rate_limit::RateLimit;

// Re-export shared types from chat-ox
pub use chat_ox;
pub use chat_ox::{
    ChatOptions, ChatRequest, ChatResponse, Message, Role, Tool, ToolCall, ToolChoice, Usage,
};
