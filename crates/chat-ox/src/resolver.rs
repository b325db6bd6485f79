use bon::Builder;
use futures_util::future::join_all;
use strum::{AsRefStr, Display};
use tracing::{debug, trace, warn};

use crate::conversation::Conversation;
use crate::error::{ResolveError, ToolError};
use crate::message::Message;
use crate::options::ChatOptions;
use crate::registry::ToolRegistry;
use crate::request::ChatRequest;
use crate::response::ChatResponse;
use crate::tool::ToolCall;

/// What happens when a tool call cannot be answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ToolFailurePolicy {
    /// Answer the call with a tool message describing the error.
    #[default]
    Continue,
    /// Stop resolving and return the error.
    Abort,
}

/// How the handlers of one assistant turn are run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ToolExecution {
    /// One after another, in request order.
    #[default]
    Sequential,
    /// All at once. Results are still appended in request order.
    Concurrent,
}

/// Outcome of resolving one response.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The response requested no tools. The conversation is returned as it
    /// was given; `message` is the final assistant message.
    Complete {
        conversation: Conversation,
        message: Message,
    },
    /// Tools were run. The conversation now ends with the assistant turn and
    /// one tool message per call, and `request` continues it.
    FollowUp {
        conversation: Conversation,
        request: ChatRequest,
    },
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    pub fn conversation(&self) -> &Conversation {
        match self {
            Self::Complete { conversation, .. } | Self::FollowUp { conversation, .. } => {
                conversation
            }
        }
    }

    /// The follow-up request, if tools were run.
    pub fn follow_up(&self) -> Option<&ChatRequest> {
        match self {
            Self::FollowUp { request, .. } => Some(request),
            Self::Complete { .. } => None,
        }
    }

    pub fn into_conversation(self) -> Conversation {
        match self {
            Self::Complete { conversation, .. } | Self::FollowUp { conversation, .. } => {
                conversation
            }
        }
    }
}

/// Turns the tool calls of a response into tool messages and a follow-up request.
///
/// A resolver performs a single step. It never sends anything and never
/// recurses: when the follow-up response asks for more tools, resolve again.
#[derive(Debug, Clone, Default, Builder)]
pub struct ToolCallResolver {
    #[builder(default)]
    registry: ToolRegistry,
    #[builder(default)]
    failure_policy: ToolFailurePolicy,
    #[builder(default)]
    execution: ToolExecution,
}

impl ToolCallResolver {
    /// A resolver with the default policies.
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            ..Self::default()
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn failure_policy(&self) -> ToolFailurePolicy {
        self.failure_policy
    }

    pub fn execution(&self) -> ToolExecution {
        self.execution
    }

    /// Resolves `response`, reusing `options` for the follow-up request.
    ///
    /// `conversation` is left untouched; the updated history is returned in
    /// the [`Resolution`]. On error the caller still holds its snapshot.
    pub async fn resolve(
        &self,
        conversation: &Conversation,
        response: &ChatResponse,
        options: &ChatOptions,
    ) -> Result<Resolution, ResolveError> {
        self.resolve_with(conversation, response, options, &ChatOptions::default())
            .await
    }

    /// Resolves `response`; options set in `overrides` replace those of the
    /// previous turn in the follow-up request.
    pub async fn resolve_with(
        &self,
        conversation: &Conversation,
        response: &ChatResponse,
        options: &ChatOptions,
        overrides: &ChatOptions,
    ) -> Result<Resolution, ResolveError> {
        let message = response.message().ok_or(ResolveError::EmptyResponse)?;

        if !message.has_tool_calls() {
            trace!(response_id = %response.id, "response requested no tools");
            return Ok(Resolution::Complete {
                conversation: conversation.clone(),
                message: message.clone(),
            });
        }

        let mut conversation = conversation.clone();
        conversation.push(message.clone())?;

        let calls = message.requested_tool_calls();
        debug!(
            count = calls.len(),
            execution = %self.execution,
            "resolving tool calls"
        );

        for (call, content) in calls.iter().zip(self.run_calls(calls).await?) {
            conversation.push(Message::tool(call.id.clone(), content))?;
        }

        let request = ChatRequest::with_defaults(options)
            .options(overrides)
            .conversation(&conversation)
            .build()?;

        Ok(Resolution::FollowUp {
            conversation,
            request,
        })
    }

    /// Runs every call and returns the tool message content for each, in order.
    async fn run_calls(&self, calls: &[ToolCall]) -> Result<Vec<String>, ToolError> {
        match self.execution {
            ToolExecution::Sequential => {
                let mut contents = Vec::with_capacity(calls.len());
                for call in calls {
                    contents.push(self.settle(self.invoke(call).await)?);
                }
                Ok(contents)
            }
            ToolExecution::Concurrent => join_all(calls.iter().map(|call| self.invoke(call)))
                .await
                .into_iter()
                .map(|outcome| self.settle(outcome))
                .collect(),
        }
    }

    async fn invoke(&self, call: &ToolCall) -> Result<String, ToolError> {
        debug!(tool = call.name(), id = %call.id, "invoking tool");
        trace!(tool = call.name(), arguments = call.arguments(), "tool arguments");

        let outcome = self.registry.invoke(call.name(), call.arguments()).await;
        if let Err(err) = &outcome {
            warn!(tool = call.name(), id = %call.id, error = %err, "tool call failed");
        }
        outcome
    }

    fn settle(&self, outcome: Result<String, ToolError>) -> Result<String, ToolError> {
        match (outcome, self.failure_policy) {
            (Ok(content), _) => Ok(content),
            (Err(err), ToolFailurePolicy::Continue) => Ok(err.to_tool_content()),
            (Err(err), ToolFailurePolicy::Abort) => Err(err),
        }
    }
}
