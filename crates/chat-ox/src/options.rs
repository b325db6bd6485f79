use std::collections::BTreeMap;

use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tool::{Tool, ToolChoice};

/// Output format requested from the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    #[serde(alias = "json")]
    JsonObject,
    JsonSchema { json_schema: Value },
}

impl ResponseFormat {
    #[must_use]
    pub fn json_schema(json_schema: Value) -> Self {
        Self::JsonSchema { json_schema }
    }
}

/// Model and sampling options for a chat request.
///
/// Every field is optional so that a set of defaults can be overlaid with
/// caller overrides via [`ChatOptions::merge`]. Only `model` is mandatory by
/// the time a request is built. Numeric ranges are left to the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Builder)]
pub struct ChatOptions {
    /// The model to use for completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub model: Option<String>,

    /// Frequency penalty (-2.0 to 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,

    /// Token id to bias (-100 to 100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logit_bias: Option<BTreeMap<String, i32>>,

    /// Maximum number of tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Number of completions to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,

    /// Presence penalty (-2.0 to 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,

    /// Response format (for structured output)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,

    /// Random seed for deterministic output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Stop sequences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,

    /// Whether to stream the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,

    /// Sampling temperature (0.0 to 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Top-p sampling parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Tools available to the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,

    /// Tool choice preference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,

    /// User identifier for abuse monitoring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub user: Option<String>,
}

impl ChatOptions {
    /// Options with only the model set.
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            ..Self::default()
        }
    }

    /// Returns a copy of `self` with every option set in `overrides` replaced.
    #[must_use]
    pub fn merge(&self, overrides: &ChatOptions) -> ChatOptions {
        fn pick<T: Clone>(base: &Option<T>, over: &Option<T>) -> Option<T> {
            over.as_ref().or(base.as_ref()).cloned()
        }

        ChatOptions {
            model: pick(&self.model, &overrides.model),
            frequency_penalty: pick(&self.frequency_penalty, &overrides.frequency_penalty),
            logit_bias: pick(&self.logit_bias, &overrides.logit_bias),
            max_tokens: pick(&self.max_tokens, &overrides.max_tokens),
            n: pick(&self.n, &overrides.n),
            presence_penalty: pick(&self.presence_penalty, &overrides.presence_penalty),
            response_format: pick(&self.response_format, &overrides.response_format),
            seed: pick(&self.seed, &overrides.seed),
            stop: pick(&self.stop, &overrides.stop),
            stream: pick(&self.stream, &overrides.stream),
            temperature: pick(&self.temperature, &overrides.temperature),
            top_p: pick(&self.top_p, &overrides.top_p),
            tools: pick(&self.tools, &overrides.tools),
            tool_choice: pick(&self.tool_choice, &overrides.tool_choice),
            user: pick(&self.user, &overrides.user),
        }
    }

    /// Tools advertised by these options; empty when none are set.
    pub fn tools(&self) -> &[Tool] {
        self.tools.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_merge_prefers_overrides() {
        let defaults = ChatOptions::builder()
            .model("gpt-3.5-turbo")
            .temperature(0.7)
            .max_tokens(100)
            .build();
        let overrides = ChatOptions::builder()
            .temperature(0.8)
            .stop(vec!["END".to_string()])
            .build();

        let merged = defaults.merge(&overrides);
        assert_eq!(merged.model.as_deref(), Some("gpt-3.5-turbo"));
        assert_eq!(merged.temperature, Some(0.8));
        assert_eq!(merged.max_tokens, Some(100));
        assert_eq!(merged.stop, Some(vec!["END".to_string()]));
    }

    #[test]
    fn test_merge_with_empty_overrides_is_identity() {
        let defaults = ChatOptions::builder()
            .model("gpt-4")
            .seed(66)
            .tool_choice(ToolChoice::Auto)
            .build();
        assert_eq!(defaults.merge(&ChatOptions::default()), defaults);
    }

    #[test]
    fn test_response_format_wire_format() {
        assert_eq!(
            serde_json::to_value(ResponseFormat::JsonObject).unwrap(),
            json!({"type": "json_object"})
        );
        assert_eq!(
            serde_json::to_value(ResponseFormat::json_schema(json!({"name": "x"}))).unwrap(),
            json!({"type": "json_schema", "json_schema": {"name": "x"}})
        );
    }

    #[test]
    fn test_response_format_accepts_json_shorthand() {
        let format: ResponseFormat = serde_json::from_value(json!({"type": "json"})).unwrap();
        assert_eq!(format, ResponseFormat::JsonObject);
        assert_eq!(
            serde_json::to_value(format).unwrap(),
            json!({"type": "json_object"})
        );
    }

    #[test]
    fn test_unset_options_are_omitted() {
        let options = ChatOptions::for_model("gpt-4");
        assert_eq!(serde_json::to_value(&options).unwrap(), json!({"model": "gpt-4"}));
    }
}
