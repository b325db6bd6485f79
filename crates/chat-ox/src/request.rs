use std::collections::HashSet;

use serde::Serialize;

use crate::conversation::Conversation;
use crate::error::RequestError;
use crate::message::Message;
use crate::options::ChatOptions;
use crate::tool::{Tool, ToolChoice};

/// An immutable, validated chat completion request.
///
/// Serializes to the OpenAI chat-completions wire format: the messages
/// followed by every option that is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    messages: Vec<Message>,
    #[serde(flatten)]
    options: ChatOptions,
}

impl ChatRequest {
    /// Starts an empty request builder.
    pub fn builder() -> ChatRequestBuilder {
        ChatRequestBuilder::default()
    }

    /// Starts a builder seeded with a set of default options.
    pub fn with_defaults(defaults: &ChatOptions) -> ChatRequestBuilder {
        ChatRequestBuilder {
            options: defaults.clone(),
            messages: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn options(&self) -> &ChatOptions {
        &self.options
    }

    /// The model this request targets. Never empty.
    pub fn model(&self) -> &str {
        self.options.model.as_deref().unwrap_or_default()
    }

    pub fn tools(&self) -> &[Tool] {
        self.options.tools()
    }

    pub fn is_stream(&self) -> bool {
        self.options.stream.unwrap_or(false)
    }

    /// Copy of this request with streaming switched off.
    #[must_use]
    pub fn without_stream(&self) -> ChatRequest {
        let mut request = self.clone();
        request.options.stream = None;
        request
    }

    pub fn into_parts(self) -> (Vec<Message>, ChatOptions) {
        (self.messages, self.options)
    }
}

/// Assembles a [`ChatRequest`] from defaults, overrides and messages.
#[derive(Debug, Clone, Default)]
pub struct ChatRequestBuilder {
    options: ChatOptions,
    messages: Vec<Message>,
}

impl ChatRequestBuilder {
    /// Overlay caller options on top of what is already set
    pub fn options(mut self, overrides: &ChatOptions) -> Self {
        self.options = self.options.merge(overrides);
        self
    }

    /// Set the model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.options.model = Some(model.into());
        self
    }

    /// Set the sampling temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options.temperature = Some(temperature);
        self
    }

    /// Set the maximum number of generated tokens
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.options.max_tokens = Some(max_tokens);
        self
    }

    /// Add a tool
    pub fn tool(mut self, tool: Tool) -> Self {
        self.options.tools.get_or_insert_with(Vec::new).push(tool);
        self
    }

    /// Replace the tool list
    pub fn tools(mut self, tools: Vec<Tool>) -> Self {
        self.options.tools = Some(tools);
        self
    }

    /// Set the tool choice policy
    pub fn tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.options.tool_choice = Some(tool_choice);
        self
    }

    /// Add a message
    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Add several messages
    pub fn messages(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.messages.extend(messages);
        self
    }

    /// Add every message of a conversation, in order
    pub fn conversation(self, conversation: &Conversation) -> Self {
        self.messages(conversation.messages().iter().cloned())
    }

    /// Add a system message
    pub fn system_message(self, content: impl Into<String>) -> Self {
        self.message(Message::system(content))
    }

    /// Add a user message
    pub fn user_message(self, content: impl Into<String>) -> Self {
        self.message(Message::user(content))
    }

    /// Add an assistant message
    pub fn assistant_message(self, content: impl Into<String>) -> Self {
        self.message(Message::assistant(content))
    }

    /// Validates and freezes the request.
    pub fn build(self) -> Result<ChatRequest, RequestError> {
        match self.options.model.as_deref() {
            Some(model) if !model.trim().is_empty() => {}
            _ => return Err(RequestError::MissingModel),
        }

        if let Some(name) = first_duplicate_name(self.options.tools()) {
            return Err(RequestError::DuplicateToolName(name.to_string()));
        }

        Ok(ChatRequest {
            messages: self.messages,
            options: self.options,
        })
    }
}

fn first_duplicate_name(tools: &[Tool]) -> Option<&str> {
    let mut seen = HashSet::new();
    tools.iter().map(Tool::name).find(|name| !seen.insert(*name))
}
