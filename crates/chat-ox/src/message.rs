use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display};

use crate::tool::ToolCall;

/// The role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    /// System message (instructions to the model)
    System,
    /// User message (human input)
    User,
    /// Assistant message (model output, possibly carrying tool calls)
    Assistant,
    /// Tool response message
    Tool,
}

/// One turn of a conversation.
///
/// Messages are plain values: once built they are appended to a
/// [`Conversation`](crate::Conversation) and never rewritten. The
/// `properties` side channel travels with the message inside the process
/// but is never sent to the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender
    pub role: Role,

    /// The content of the message
    ///
    /// Assistant messages that only request tool calls carry no content.
    #[serde(default)]
    pub content: Option<String>,

    /// Tool calls requested by the assistant, in the order the model emitted them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,

    /// Id of the tool call this message answers (tool messages only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Name of the function that produced this result (tool messages only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Opaque metadata, carried but not interpreted
    #[serde(skip)]
    pub properties: BTreeMap<String, Value>,
}

impl Message {
    fn new(role: Role, content: Option<String>) -> Self {
        Self {
            role,
            content,
            tool_calls: None,
            tool_call_id: None,
            name: None,
            properties: BTreeMap::new(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, Some(content.into()))
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, Some(content.into()))
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, Some(content.into()))
    }

    /// Create an assistant message carrying tool calls
    pub fn assistant_with_tool_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: Some(tool_calls),
            ..Self::new(Role::Assistant, content)
        }
    }

    /// Create a tool response message answering the call with `tool_call_id`
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::new(Role::Tool, Some(content.into()))
        }
    }

    /// Create a tool response message with function name
    pub fn tool_with_name(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::tool(tool_call_id, content)
        }
    }

    /// Replace the metadata of this message
    pub fn with_properties(mut self, properties: BTreeMap<String, Value>) -> Self {
        self.properties = properties;
        self
    }

    /// Attach a single metadata entry
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// The textual content, if any
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Tool calls requested by this message; empty when there are none
    pub fn requested_tool_calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }

    /// Whether this message asks the caller to run at least one tool
    pub fn has_tool_calls(&self) -> bool {
        !self.requested_tool_calls().is_empty()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.role, self.content.as_deref().unwrap_or(""))?;
        if let Some(id) = &self.tool_call_id {
            write!(f, " [tool_call_id={id}]")?;
        }
        for call in self.requested_tool_calls() {
            write!(f, " [{}({})#{}]", call.function.name, call.function.arguments, call.id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_tool_message() {
        let msg = Message::tool("call_123", "Result: 42");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.text(), Some("Result: 42"));
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_123"));
        assert!(!msg.has_tool_calls());
    }

    #[test]
    fn test_properties_stay_off_the_wire() {
        let msg = Message::user("hi").with_property("trace", "abc");
        assert_eq!(msg.properties.get("trace"), Some(&json!("abc")));

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn test_assistant_tool_calls_serialize_with_null_content() {
        let msg = Message::assistant_with_tool_calls(
            None,
            vec![ToolCall::new("call_1", "getCurrentWeather", r#"{"location":"Paris"}"#)],
        );
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "assistant");
        assert!(value["content"].is_null());
        assert_eq!(value["tool_calls"][0]["id"], "call_1");
        assert_eq!(value["tool_calls"][0]["type"], "function");
        assert_eq!(value["tool_calls"][0]["function"]["name"], "getCurrentWeather");
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Tool.to_string(), "tool");
        assert_eq!(Role::Assistant.as_ref(), "assistant");
    }

    #[test]
    fn test_display_mentions_tool_call_id() {
        let msg = Message::tool("call_9", "15c");
        assert_eq!(msg.to_string(), "tool: 15c [tool_call_id=call_9]");
    }
}
