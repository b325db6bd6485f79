use serde::{Deserialize, Serialize};
use std::fmt;

/// Available models for OpenAI
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Model {
    #[default]
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt3_5Turbo,

    #[serde(rename = "gpt-4")]
    Gpt4,

    /// First GPT-4 Turbo preview with parallel function calling
    #[serde(rename = "gpt-4-1106-preview")]
    Gpt4_1106Preview,

    /// Custom model (for models not in this enum)
    #[serde(untagged)]
    Custom(String),
}

impl Model {
    /// Get the string representation of the model
    pub fn as_str(&self) -> &str {
        match self {
            Model::Gpt3_5Turbo => "gpt-3.5-turbo",
            Model::Gpt4 => "gpt-4",
            Model::Gpt4_1106Preview => "gpt-4-1106-preview",
            Model::Custom(s) => s,
        }
    }

    /// Get the maximum context length for this model
    pub fn max_context_length(&self) -> Option<usize> {
        match self {
            Model::Gpt3_5Turbo => Some(4096),
            Model::Gpt4 => Some(8192),
            Model::Gpt4_1106Preview => Some(128_000),
            Model::Custom(_) => None, // Unknown for custom models
        }
    }

    /// Check if this model supports tool/function calling
    pub fn supports_tools(&self) -> bool {
        match self {
            Model::Gpt3_5Turbo | Model::Gpt4 | Model::Gpt4_1106Preview => true,
            Model::Custom(_) => false, // Conservative assumption
        }
    }

    /// Whether the model may request several tool calls in one turn
    pub fn supports_parallel_tool_calls(&self) -> bool {
        matches!(self, Model::Gpt4_1106Preview)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Model {
    fn from(s: String) -> Self {
        match s.as_str() {
            "gpt-3.5-turbo" => Model::Gpt3_5Turbo,
            "gpt-4" => Model::Gpt4,
            "gpt-4-1106-preview" => Model::Gpt4_1106Preview,
            _ => Model::Custom(s),
        }
    }
}

impl From<&str> for Model {
    fn from(s: &str) -> Self {
        Model::from(s.to_string())
    }
}

impl From<Model> for String {
    fn from(model: Model) -> Self {
        match model {
            Model::Custom(s) => s,
            other => other.as_str().to_string(),
        }
    }
}
