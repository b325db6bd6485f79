use crate::error::ConversationError;
use crate::message::{Message, Role};

/// An append-only message history.
///
/// Appending enforces the tool-call discipline of the chat-completions
/// protocol: every tool message answers exactly one call requested by the
/// preceding assistant turn, and no other message may be appended while
/// calls are still unanswered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    messages: Vec<Message>,
    pending: Vec<String>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a conversation from an existing history, validating every message.
    pub fn from_messages(
        messages: impl IntoIterator<Item = Message>,
    ) -> Result<Self, ConversationError> {
        let mut conversation = Self::new();
        conversation.extend(messages)?;
        Ok(conversation)
    }

    /// Appends a message.
    ///
    /// On error the conversation is left untouched.
    pub fn push(&mut self, message: Message) -> Result<(), ConversationError> {
        match message.role {
            Role::Tool => {
                let id = message
                    .tool_call_id
                    .as_deref()
                    .ok_or(ConversationError::MissingToolCallId)?;
                let position = self
                    .pending
                    .iter()
                    .position(|pending| pending == id)
                    .ok_or_else(|| ConversationError::UnexpectedToolResult { id: id.to_string() })?;
                self.pending.remove(position);
            }
            _ => {
                if !self.pending.is_empty() {
                    return Err(ConversationError::UnansweredToolCalls {
                        ids: self.pending.clone(),
                    });
                }
                let mut requested: Vec<String> = Vec::new();
                for call in message.requested_tool_calls() {
                    if requested.contains(&call.id) {
                        return Err(ConversationError::DuplicateToolCallId {
                            id: call.id.clone(),
                        });
                    }
                    requested.push(call.id.clone());
                }
                self.pending = requested;
            }
        }
        self.messages.push(message);
        Ok(())
    }

    /// Appends messages in order, stopping at the first invalid one.
    pub fn extend(
        &mut self,
        messages: impl IntoIterator<Item = Message>,
    ) -> Result<(), ConversationError> {
        messages.into_iter().try_for_each(|message| self.push(message))
    }

    /// Appends a message, consuming and returning the conversation.
    pub fn with(mut self, message: Message) -> Result<Self, ConversationError> {
        self.push(message)?;
        Ok(self)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Ids of tool calls that have not been answered yet, in request order.
    pub fn pending_tool_calls(&self) -> &[String] {
        &self.pending
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

impl<'a> IntoIterator for &'a Conversation {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for Conversation {
    type Item = Message;
    type IntoIter = std::vec::IntoIter<Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}
