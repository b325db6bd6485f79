use std::borrow::Cow;
use std::time::Duration;

use bon::Builder;
use chat_ox::{ChatOptions, ChatRequest, ChatRequestBuilder, ChatResponse, ChatTransport};
use futures_util::future::BoxFuture;
use tracing::{debug, info, trace};

use crate::config::{DEFAULT_BASE_URL, OpenAiSettings};
use crate::error::{OpenAIRequestError, parse_error_response};
use crate::rate_limit::RateLimit;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// OpenAI AI API client
#[derive(Debug, Clone, Builder)]
pub struct OpenAI {
    /// API key for authentication
    #[builder(into)]
    api_key: String,

    /// Base URL for the API (allows for custom endpoints)
    #[builder(default = DEFAULT_BASE_URL.to_string(), into)]
    base_url: String,

    /// Options every request built with [`OpenAI::chat`] starts from
    #[builder(default)]
    default_options: ChatOptions,

    /// Log the rate-limit headers of every response
    #[builder(default)]
    rate_limit_metrics_enabled: bool,

    /// HTTP client for making requests
    #[builder(skip = default_http_client())]
    client: reqwest::Client,
}

fn default_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_default()
}

impl OpenAI {
    /// Create a new OpenAI client with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::builder().api_key(api_key).build()
    }

    /// Create a new OpenAI client from environment variables
    ///
    /// Reads `OPENAI_API_KEY` and, when set, `OPENAI_BASE_URL`.
    pub fn from_env() -> Result<Self, OpenAIRequestError> {
        let api_key =
            std::env::var("OPENAI_API_KEY").map_err(|_| OpenAIRequestError::MissingApiKey)?;
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self::builder().api_key(api_key).base_url(base_url).build())
    }

    /// Create a client from bound settings, using their chat options as defaults
    pub fn from_settings(settings: &OpenAiSettings) -> Result<Self, OpenAIRequestError> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or(OpenAIRequestError::MissingApiKey)?;
        Ok(Self::builder()
            .api_key(api_key)
            .base_url(settings.base_url.clone())
            .default_options(settings.chat.options.clone())
            .rate_limit_metrics_enabled(settings.chat.metadata.rate_limit_metrics_enabled)
            .build())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn default_options(&self) -> &ChatOptions {
        &self.default_options
    }

    /// Create a chat request builder seeded with the default options
    pub fn chat(&self) -> ChatRequestBuilder {
        ChatRequest::with_defaults(&self.default_options)
    }

    /// Send a chat request and get a response
    ///
    /// Streaming is not supported: a request asking for it is sent with
    /// streaming switched off.
    pub async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, OpenAIRequestError> {
        let request = if request.is_stream() {
            debug!("streaming is not supported, sending request without stream");
            Cow::Owned(request.without_stream())
        } else {
            Cow::Borrowed(request)
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!(
            url = %url,
            model = request.model(),
            messages = request.messages().len(),
            tools = request.tools().len(),
            "sending chat completion request"
        );
        trace!(request = ?request, "chat completion payload");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request.as_ref())
            .send()
            .await?;

        let status = response.status();
        if self.rate_limit_metrics_enabled {
            let rate_limit = RateLimit::from_headers(response.headers());
            info!(
                requests_limit = ?rate_limit.requests_limit,
                requests_remaining = ?rate_limit.requests_remaining,
                requests_reset = ?rate_limit.requests_reset,
                tokens_limit = ?rate_limit.tokens_limit,
                tokens_remaining = ?rate_limit.tokens_remaining,
                tokens_reset = ?rate_limit.tokens_reset,
                "openai rate limits"
            );
        }

        let bytes = response.bytes().await?;
        if status.is_success() {
            let response: ChatResponse = serde_json::from_slice(&bytes)?;
            debug!(
                id = %response.id,
                finish_reason = ?response.finish_reason(),
                tool_calls = response.tool_calls().len(),
                "received chat completion"
            );
            Ok(response)
        } else {
            debug!(status = status.as_u16(), "chat completion failed");
            Err(parse_error_response(status, bytes))
        }
    }
}

impl ChatTransport for OpenAI {
    type Error = OpenAIRequestError;

    fn send<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> BoxFuture<'a, Result<ChatResponse, Self::Error>> {
        Box::pin(OpenAI::send(self, request))
    }
}
