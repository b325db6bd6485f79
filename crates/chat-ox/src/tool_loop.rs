use bon::Builder;
use tracing::{debug, warn};

use crate::conversation::Conversation;
use crate::error::{ResolveError, ToolLoopError};
use crate::message::Message;
use crate::options::ChatOptions;
use crate::request::ChatRequest;
use crate::resolver::{Resolution, ToolCallResolver};
use crate::response::ChatResponse;
use crate::transport::ChatTransport;
use crate::usage::Usage;

/// Result of a completed tool-calling exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolLoopOutcome {
    /// The final response, which requested no tools.
    pub response: ChatResponse,
    /// Every message of the exchange, ending with the final assistant message.
    pub conversation: Conversation,
    /// Number of requests sent.
    pub iterations: u32,
    /// Usage summed over every response that reported it.
    pub usage: Usage,
}

impl ToolLoopOutcome {
    /// Text of the final assistant message.
    pub fn content(&self) -> Option<&str> {
        self.response.content()
    }
}

/// Drives send, resolve, send until the model stops asking for tools.
#[derive(Debug, Clone, Builder)]
pub struct ToolLoop<T: ChatTransport> {
    /// Provider client used for every turn.
    transport: T,
    /// Runs the tools requested by each response.
    #[builder(default)]
    resolver: ToolCallResolver,
    /// Options of the first request; later requests inherit them.
    options: ChatOptions,
    /// Options replaced in every follow-up request.
    follow_up_options: Option<ChatOptions>,
    /// Maximum number of requests sent by one run.
    #[builder(default = 12)]
    max_iterations: u32,
}

impl<T: ChatTransport> ToolLoop<T> {
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn resolver(&self) -> &ToolCallResolver {
        &self.resolver
    }

    pub fn options(&self) -> &ChatOptions {
        &self.options
    }

    /// Returns the maximum number of iterations.
    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Sends the conversation once, without handling tool calls.
    pub async fn generate(
        &self,
        conversation: &Conversation,
    ) -> Result<ChatResponse, ToolLoopError<T::Error>> {
        let request = ChatRequest::with_defaults(&self.options)
            .conversation(conversation)
            .build()?;
        self.transport
            .send(&request)
            .await
            .map_err(ToolLoopError::Transport)
    }

    /// Runs the exchange to completion.
    ///
    /// Fails with [`ToolLoopError::MaxIterationsReached`] when the model is
    /// still requesting tools after `max_iterations` requests.
    pub async fn run(
        &self,
        conversation: Conversation,
    ) -> Result<ToolLoopOutcome, ToolLoopError<T::Error>> {
        let mut request = ChatRequest::with_defaults(&self.options)
            .conversation(&conversation)
            .build()?;
        let mut conversation = conversation;
        let mut usage = Usage::default();
        let follow_up_options = self.follow_up_options.clone().unwrap_or_default();

        for iteration in 1..=self.max_iterations {
            debug!(
                iteration,
                model = request.model(),
                messages = request.messages().len(),
                "sending chat request"
            );
            let response = self
                .transport
                .send(&request)
                .await
                .map_err(ToolLoopError::Transport)?;
            if let Some(turn_usage) = response.usage {
                usage += turn_usage;
            }

            let resolution = self
                .resolver
                .resolve_with(&conversation, &response, request.options(), &follow_up_options)
                .await?;

            match resolution {
                Resolution::Complete {
                    conversation: mut finished,
                    message,
                } => {
                    finished.push(message).map_err(ResolveError::from)?;
                    debug!(iterations = iteration, total_tokens = usage.total_tokens(), "tool loop finished");
                    return Ok(ToolLoopOutcome {
                        response,
                        conversation: finished,
                        iterations: iteration,
                        usage,
                    });
                }
                Resolution::FollowUp {
                    conversation: next,
                    request: follow_up,
                } => {
                    conversation = next;
                    request = follow_up;
                }
            }
        }

        warn!(max_iterations = self.max_iterations, "tool loop gave up");
        Err(ToolLoopError::MaxIterationsReached(self.max_iterations))
    }

    /// Runs the exchange starting from plain messages.
    pub async fn run_messages(
        &self,
        messages: impl IntoIterator<Item = Message>,
    ) -> Result<ToolLoopOutcome, ToolLoopError<T::Error>> {
        let conversation = Conversation::from_messages(messages).map_err(ResolveError::from)?;
        self.run(conversation).await
    }
}
