use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::json::{decode_case_insensitive, sanitize, JsonDecodeError};
use crate::types::{Completion, TokenUsage};

/// One system/user prompt pair sent to a deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_input: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(
        system_prompt: impl Into<String>,
        user_input: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_input: user_input.into(),
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Undecoded provider reply. `text` is the trimmed message content,
/// `"{}"` when the provider returned none.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCompletion {
    pub text: String,
    pub usage: TokenUsage,
    pub model: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("provider returned status {status}: {body}")]
    Provider { status: u16, body: String },
    #[error("provider transport error: {0}")]
    Transport(String),
    #[error("completion timed out")]
    Timeout,
    #[error("completion was not valid JSON: {0}")]
    MalformedJson(#[source] serde_json::Error),
    #[error("completion did not match the expected shape: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("completion decoded to null")]
    Null,
}

impl From<JsonDecodeError> for CompletionError {
    fn from(e: JsonDecodeError) -> Self {
        match e {
            JsonDecodeError::Malformed(e) => Self::MalformedJson(e),
            JsonDecodeError::Shape(e) => Self::Decode(e),
            JsonDecodeError::Null => Self::Null,
        }
    }
}

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<RawCompletion, CompletionError>;
}

/// Run one completion and decode its JSON content into `T`.
pub async fn complete_as<T: DeserializeOwned>(
    backend: &dyn CompletionBackend,
    request: &CompletionRequest,
) -> Result<Completion<T>, CompletionError> {
    let raw = backend.complete(request).await?;
    let cleaned = sanitize(&raw.text);
    debug!(model = %raw.model, len = cleaned.len(), "decoding completion");
    let value = decode_case_insensitive(&cleaned)?;
    info!(
        model = %raw.model,
        prompt_tokens = raw.usage.prompt_tokens,
        completion_tokens = raw.usage.completion_tokens,
        total_tokens = raw.usage.total_tokens,
        "completion decoded"
    );
    Ok(Completion {
        value,
        usage: raw.usage,
        model: raw.model,
    })
}
