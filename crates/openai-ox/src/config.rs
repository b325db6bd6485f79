//! Binds external settings to the client connection and default chat options.
//!
//! Sources, lowest to highest precedence: built-in defaults, an optional TOML
//! file, `OPENAI_*` environment variables (`__` between nested keys, e.g.
//! `OPENAI_CHAT__OPTIONS__MODEL`) and explicit key/value overrides such as
//! `chat.options.max_tokens=123`.
//!
//! Configuration keys are matched without regard to case, so `logit_bias`
//! token keys are bound from a value instead: a JSON object given as text
//! (`logit_bias = '{"myTokenId": -5}'`), or `chat.options.logit_bias.<token>`
//! overrides, which are collected with their case intact.

use std::collections::BTreeMap;
use std::path::Path;

use chat_ox::{ChatOptions, ResponseFormat, Tool, ToolChoice, ToolFunction, ToolType};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

const ENV_PREFIX: &str = "OPENAI";
const LOGIT_BIAS_KEY: &str = "chat.options.logit_bias";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Binding(#[from] config::ConfigError),

    #[error("Invalid JSON schema for tool '{name}': {source}")]
    InvalidToolSchema {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Connection and chat settings for the OpenAI client.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub chat: OpenAiChatProperties,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpenAiChatProperties {
    /// Options every request starts from.
    pub options: ChatOptions,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Metadata {
    /// Log the `x-ratelimit-*` headers of every response.
    #[serde(default)]
    pub rate_limit_metrics_enabled: bool,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            chat: OpenAiChatProperties {
                options: ChatOptions::builder()
                    .model(DEFAULT_MODEL)
                    .temperature(DEFAULT_TEMPERATURE as f32)
                    .build(),
                metadata: Metadata::default(),
            },
        }
    }
}

impl OpenAiSettings {
    /// Loads settings from the defaults and the environment.
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(None, std::iter::empty::<(&str, &str)>())
    }

    /// Loads settings from every source.
    ///
    /// `file` must exist when given. `overrides` are `(key, value)` pairs
    /// using dotted keys, e.g. `("chat.options.stop", "boza,koza")`.
    pub fn load<K, V>(
        file: Option<&Path>,
        overrides: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self, ConfigError>
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut builder = Self::defaults()?;
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(Self::environment());

        let mut logit_bias = serde_json::Map::new();
        for (key, value) in overrides {
            let key = key.as_ref();
            match key
                .strip_prefix(LOGIT_BIAS_KEY)
                .and_then(|token| token.strip_prefix('.'))
            {
                Some(token) => {
                    logit_bias.insert(token.to_string(), Value::String(value.into()));
                }
                None => builder = builder.set_override(key, value.into())?,
            }
        }
        if !logit_bias.is_empty() {
            builder = builder.set_override(LOGIT_BIAS_KEY, Value::Object(logit_bias).to_string())?;
        }

        Self::from_config(builder.build()?)
    }

    /// A configuration builder holding only the built-in defaults.
    ///
    /// Add further sources to it and pass the result to [`Self::from_config`].
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Ok(Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("chat.options.model", DEFAULT_MODEL)?
            .set_default("chat.options.temperature", DEFAULT_TEMPERATURE)?
            .set_default("chat.metadata.rate_limit_metrics_enabled", false)?)
    }

    /// The `OPENAI_*` environment source.
    pub fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Binds an already assembled configuration.
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let raw: RawSettings = config.try_deserialize().inspect_err(|err| {
            tracing::debug!("Configuration error: {:?}", err);
        })?;
        raw.try_into()
    }
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    base_url: String,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    chat: RawChatProperties,
}

#[derive(Debug, Default, Deserialize)]
struct RawChatProperties {
    #[serde(default)]
    options: RawChatOptions,
    #[serde(default)]
    metadata: Metadata,
}

#[derive(Debug, Default, Deserialize)]
struct RawChatOptions {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    frequency_penalty: Option<f32>,
    #[serde(default, deserialize_with = "logit_bias")]
    logit_bias: Option<BTreeMap<String, i32>>,
    #[serde(default)]
    max_tokens: Option<u32>,
    #[serde(default)]
    n: Option<u32>,
    #[serde(default)]
    presence_penalty: Option<f32>,
    #[serde(default)]
    response_format: Option<ResponseFormat>,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default, deserialize_with = "string_or_list")]
    stop: Option<Vec<String>>,
    #[serde(default)]
    stream: Option<bool>,
    #[serde(default)]
    temperature: Option<f32>,
    #[serde(default)]
    top_p: Option<f32>,
    #[serde(default)]
    tool_choice: Option<ToolChoiceProperties>,
    #[serde(default)]
    tools: Vec<ToolProperties>,
    #[serde(default)]
    user: Option<String>,
}

/// `tool_choice.mode` selects a policy, `tool_choice.function_name` forces a function.
#[derive(Debug, Default, Deserialize)]
struct ToolChoiceProperties {
    #[serde(default)]
    mode: Option<ToolChoiceMode>,
    #[serde(default)]
    function_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ToolChoiceMode {
    None,
    Auto,
    Required,
}

#[derive(Debug, Deserialize)]
struct ToolProperties {
    #[serde(default)]
    r#type: ToolType,
    function: FunctionProperties,
}

#[derive(Debug, Deserialize)]
struct FunctionProperties {
    name: String,
    #[serde(default)]
    description: Option<String>,
    /// Parameter schema as JSON text.
    #[serde(default)]
    json_schema: Option<String>,
    #[serde(default)]
    strict: Option<bool>,
}

impl TryFrom<RawSettings> for OpenAiSettings {
    type Error = ConfigError;

    fn try_from(raw: RawSettings) -> Result<Self, Self::Error> {
        Ok(Self {
            base_url: raw.base_url,
            api_key: raw.api_key.filter(|key| !key.trim().is_empty()),
            chat: OpenAiChatProperties {
                options: raw.chat.options.try_into()?,
                metadata: raw.chat.metadata,
            },
        })
    }
}

impl TryFrom<RawChatOptions> for ChatOptions {
    type Error = ConfigError;

    fn try_from(raw: RawChatOptions) -> Result<Self, Self::Error> {
        let tools = raw
            .tools
            .into_iter()
            .map(Tool::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ChatOptions {
            model: raw.model,
            frequency_penalty: raw.frequency_penalty,
            logit_bias: raw.logit_bias,
            max_tokens: raw.max_tokens,
            n: raw.n,
            presence_penalty: raw.presence_penalty,
            response_format: raw.response_format,
            seed: raw.seed,
            stop: raw.stop,
            stream: raw.stream,
            temperature: raw.temperature,
            top_p: raw.top_p,
            tools: (!tools.is_empty()).then_some(tools),
            tool_choice: raw.tool_choice.and_then(ToolChoiceProperties::into_tool_choice),
            user: raw.user,
        })
    }
}

impl ToolChoiceProperties {
    /// A forced function wins over a mode.
    fn into_tool_choice(self) -> Option<ToolChoice> {
        if let Some(name) = self.function_name {
            return Some(ToolChoice::function(name));
        }
        self.mode.map(|mode| match mode {
            ToolChoiceMode::None => ToolChoice::None,
            ToolChoiceMode::Auto => ToolChoice::Auto,
            ToolChoiceMode::Required => ToolChoice::Required,
        })
    }
}

impl TryFrom<ToolProperties> for Tool {
    type Error = ConfigError;

    fn try_from(raw: ToolProperties) -> Result<Self, Self::Error> {
        let FunctionProperties {
            name,
            description,
            json_schema,
            strict,
        } = raw.function;

        let parameters = json_schema
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|source| ConfigError::InvalidToolSchema {
                name: name.clone(),
                source,
            })?;

        Ok(Tool {
            r#type: raw.r#type,
            function: ToolFunction {
                name,
                description,
                parameters,
                strict,
            },
        })
    }
}

/// Accepts `stop = "a,b"` as well as `stop = ["a", "b"]`.
fn string_or_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        List(Vec<String>),
        String(String),
    }

    Ok(
        Option::<StringOrList>::deserialize(deserializer)?.map(|value| match value {
            StringOrList::List(list) => list,
            StringOrList::String(text) => text
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect(),
        }),
    )
}

/// Accepts a table of token biases or the same object as JSON text.
fn logit_bias<'de, D>(deserializer: D) -> Result<Option<BTreeMap<String, i32>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextOrTable {
        Text(String),
        Table(BTreeMap<String, Value>),
    }

    let entries = match Option::<TextOrTable>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(TextOrTable::Text(text)) => {
            serde_json::from_str::<BTreeMap<String, Value>>(&text).map_err(D::Error::custom)?
        }
        Some(TextOrTable::Table(table)) => table,
    };

    entries
        .into_iter()
        .map(|(token, bias)| {
            let parsed = match &bias {
                Value::Number(number) => number.as_i64().and_then(|n| i32::try_from(n).ok()),
                Value::String(text) => text.trim().parse().ok(),
                _ => None,
            };
            parsed
                .map(|bias| (token.clone(), bias))
                .ok_or_else(|| {
                    D::Error::custom(format!("invalid logit bias for '{token}': {bias}"))
                })
        })
        .collect::<Result<BTreeMap<_, _>, _>>()
        .map(Some)
}
