use serde::Deserialize;
use thiserror::Error;

/// OpenAI API error details
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
struct OpenAIApiErrorPayload {
    error: Option<OpenAIApiError>,
}

/// Specific error information from OpenAI API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
struct OpenAIApiError {
    message: String,
    r#type: Option<String>,
    code: Option<String>,
}

/// Errors that can occur when making requests to the OpenAI API
#[derive(Debug, Error)]
pub enum OpenAIRequestError {
    /// HTTP client errors
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),

    /// Invalid request errors from the API
    #[error("Invalid request error: {message}")]
    InvalidRequestError {
        code: Option<String>,
        message: String,
        r#type: Option<String>,
    },

    /// Unexpected response from the API
    #[error("Unexpected response from API: {0}")]
    UnexpectedResponse(String),

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limit exceeded: {message}")]
    RateLimit { message: String },

    /// The API key was rejected (HTTP 401)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Missing API key
    #[error("Missing API key")]
    MissingApiKey,
}

/// Parse an error response from the OpenAI API
pub(crate) fn parse_error_response(
    status: reqwest::StatusCode,
    bytes: bytes::Bytes,
) -> OpenAIRequestError {
    let api_error = serde_json::from_slice::<OpenAIApiErrorPayload>(&bytes)
        .ok()
        .and_then(|payload| payload.error);
    let message = match &api_error {
        Some(error) => error.message.clone(),
        None => String::from_utf8_lossy(&bytes).to_string(),
    };

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return OpenAIRequestError::RateLimit { message };
    }
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return OpenAIRequestError::Authentication { message };
    }

    match api_error {
        Some(error) => OpenAIRequestError::InvalidRequestError {
            code: error.code,
            message: error.message,
            r#type: error.r#type,
        },
        None => OpenAIRequestError::UnexpectedResponse(format!(
            "HTTP status {}: {}",
            status.as_u16(),
            message
        )),
    }
}
