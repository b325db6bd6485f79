use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::message::Message;
use crate::tool::ToolCall;
use crate::usage::Usage;

/// Response from chat completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Unique identifier for the response
    #[serde(default)]
    pub id: String,

    /// Object type (usually "chat.completion")
    #[serde(default)]
    pub object: String,

    /// Unix timestamp of creation
    #[serde(default)]
    pub created: u64,

    /// Model used for the completion
    #[serde(default)]
    pub model: String,

    /// List of completion choices
    #[serde(default)]
    pub choices: Vec<Choice>,

    /// Usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// System fingerprint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_fingerprint: Option<String>,
}

/// A completion choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    /// Index of this choice
    #[serde(default)]
    pub index: u32,

    /// The completion message
    pub message: Message,

    /// Reason for stopping
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    FunctionCall,
    #[serde(other)]
    Other,
}

impl ChatResponse {
    /// A response with a single choice holding `message`.
    pub fn from_message(model: impl Into<String>, message: Message) -> Self {
        let finish_reason = if message.has_tool_calls() {
            FinishReason::ToolCalls
        } else {
            FinishReason::Stop
        };
        Self {
            id: String::new(),
            object: "chat.completion".to_string(),
            created: 0,
            model: model.into(),
            choices: vec![Choice {
                index: 0,
                message,
                finish_reason: Some(finish_reason),
            }],
            usage: None,
            system_fingerprint: None,
        }
    }

    /// Attach usage statistics
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Get the first choice, if available
    pub fn first_choice(&self) -> Option<&Choice> {
        self.choices.first()
    }

    /// The message of the first choice, if available
    pub fn message(&self) -> Option<&Message> {
        self.first_choice().map(|choice| &choice.message)
    }

    /// Get the content of the first choice, if available
    pub fn content(&self) -> Option<&str> {
        self.message().and_then(Message::text)
    }

    /// Tool calls requested by the first choice; empty when there are none
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.message()
            .map(Message::requested_tool_calls)
            .unwrap_or_default()
    }

    /// Get the finish reason of the first choice
    pub fn finish_reason(&self) -> Option<&FinishReason> {
        self.first_choice()
            .and_then(|choice| choice.finish_reason.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_tool_call_response() {
        let response: ChatResponse = serde_json::from_value(json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "created": 1_699_896_916,
            "model": "gpt-4-1106-preview",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {
                            "name": "getCurrentWeather",
                            "arguments": "{\"location\":\"Paris\",\"unit\":\"c\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 82, "completion_tokens": 17, "total_tokens": 99}
        }))
        .unwrap();

        assert_eq!(response.content(), None);
        assert_eq!(response.tool_calls().len(), 1);
        assert_eq!(response.tool_calls()[0].name(), "getCurrentWeather");
        assert_eq!(response.finish_reason(), Some(&FinishReason::ToolCalls));
        assert_eq!(response.usage.map(|u| u.total_tokens()), Some(99));
    }

    #[test]
    fn test_unknown_finish_reason() {
        let choice: Choice = serde_json::from_value(json!({
            "index": 0,
            "message": {"role": "assistant", "content": "hi"},
            "finish_reason": "something_new"
        }))
        .unwrap();
        assert_eq!(choice.finish_reason, Some(FinishReason::Other));
    }

    #[test]
    fn test_empty_response_has_no_tool_calls() {
        let response: ChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(response.message().is_none());
        assert!(response.tool_calls().is_empty());
    }
}
