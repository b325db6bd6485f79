use std::error::Error as StdError;

use thiserror::Error;

/// A type alias for a boxed error that is thread-safe.
pub type BoxedError = Box<dyn StdError + Send + Sync>;

/// Structural problems detected while assembling a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Request has no model")]
    MissingModel,

    #[error("Tool '{0}' is declared more than once")]
    DuplicateToolName(String),
}

/// Violations of the tool-call ordering rules of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("Tool message has no tool_call_id")]
    MissingToolCallId,

    #[error("Tool result '{id}' does not answer any pending tool call")]
    UnexpectedToolResult { id: String },

    #[error("Tool call id '{id}' is used more than once")]
    DuplicateToolCallId { id: String },

    #[error("Tool calls still waiting for results: {}", ids.join(", "))]
    UnansweredToolCalls { ids: Vec<String> },
}

/// Represents errors that can occur during tool invocation.
///
/// Under the default failure policy these never leave the resolver: their
/// text becomes the content of the tool message answering the call.
#[derive(Debug, Error)]
pub enum ToolError {
    /// No handler is registered under the requested name.
    #[error("Tool not found: {name}")]
    NotFound { name: String },

    /// The handler could not make sense of the model's arguments.
    #[error("Invalid arguments for tool '{name}': {error}")]
    InvalidArguments {
        name: String,
        #[source]
        error: BoxedError,
    },

    /// The tool ran and failed.
    #[error("Tool execution failed for tool '{name}': {error}")]
    Execution {
        name: String,
        #[source]
        error: BoxedError,
    },
}

impl ToolError {
    /// Creates a "not found" error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Creates an "invalid arguments" error, wrapping the parse failure.
    pub fn invalid_arguments(
        name: impl Into<String>,
        error: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::InvalidArguments {
            name: name.into(),
            error: Box::new(error),
        }
    }

    /// Creates an "execution" error, wrapping the tool's own error.
    pub fn execution(name: impl Into<String>, error: impl Into<BoxedError>) -> Self {
        Self::Execution {
            name: name.into(),
            error: error.into(),
        }
    }

    /// Name of the tool that failed.
    pub fn tool_name(&self) -> &str {
        match self {
            Self::NotFound { name }
            | Self::InvalidArguments { name, .. }
            | Self::Execution { name, .. } => name,
        }
    }

    /// Content of the tool message that stands in for a failed call.
    pub fn to_tool_content(&self) -> String {
        format!("Error: {self}")
    }
}

/// Errors of a single resolution step.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Response has no choices")]
    EmptyResponse,

    #[error(transparent)]
    Conversation(#[from] ConversationError),

    /// Only produced under [`ToolFailurePolicy::Abort`](crate::ToolFailurePolicy::Abort).
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Request(#[from] RequestError),
}

/// Errors of a complete tool-calling exchange.
#[derive(Debug, Error)]
pub enum ToolLoopError<E>
where
    E: StdError + Send + Sync + 'static,
{
    /// The transport failed; forwarded untouched.
    #[error("Transport error: {0}")]
    Transport(#[source] E),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("Tool loop did not finish within {0} iterations")]
    MaxIterationsReached(u32),
}

impl<E> ToolLoopError<E>
where
    E: StdError + Send + Sync + 'static,
{
    /// The transport error, if that is what stopped the loop.
    pub fn transport(&self) -> Option<&E> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}
