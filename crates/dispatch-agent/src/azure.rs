use std::time::Duration;

use async_trait::async_trait;
use dispatch_core::completion::{CompletionBackend, CompletionError, CompletionRequest, RawCompletion};
use dispatch_core::TokenUsage;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const REASONING_API_VERSION: &str = "2025-01-01-preview";
const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Deployments whose name marks them as reasoning models take a
/// different request shape.
pub fn is_reasoning_model(model: &str) -> bool {
    let lower = model.to_lowercase();
    lower.contains("o3") || lower.contains("reasoning")
}

/// Base URL ending in `/openai`, without a trailing slash.
fn openai_root(endpoint: &str) -> String {
    let trimmed = endpoint.trim_end_matches('/');
    if trimmed.to_lowercase().ends_with("/openai") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/openai")
    }
}

/// Chat-completions client for Azure OpenAI deployments.
pub struct AzureOpenAiBackend {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    api_version: String,
    reasoning_timeout: Duration,
}

impl AzureOpenAiBackend {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, api_version: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            api_version: api_version.into(),
            reasoning_timeout: Duration::from_secs(300),
        }
    }

    pub fn with_reasoning_timeout(mut self, timeout: Duration) -> Self {
        self.reasoning_timeout = timeout;
        self
    }

    fn url(&self, model: &str, api_version: &str) -> String {
        format!(
            "{}/deployments/{}/chat/completions?api-version={}",
            openai_root(&self.endpoint),
            urlencoding::encode(model),
            api_version
        )
    }

    async fn post(
        &self,
        url: String,
        body: &ChatRequest<'_>,
        timeout: Option<Duration>,
    ) -> Result<ChatResponse, CompletionError> {
        let mut req = self.http.post(&url).header("api-key", &self.api_key).json(body);
        if let Some(t) = timeout {
            req = req.timeout(t);
        }
        let resp = req.send().await.map_err(transport_error)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), url = %url, "completion provider error");
            return Err(CompletionError::Provider {
                status: status.as_u16(),
                body,
            });
        }
        resp.json::<ChatResponse>().await.map_err(transport_error)
    }

    async fn standard(&self, request: &CompletionRequest) -> Result<ChatResponse, CompletionError> {
        let body = ChatRequest {
            messages: messages(request),
            temperature: Some(request.temperature.unwrap_or(DEFAULT_TEMPERATURE)),
            max_tokens: request.max_tokens,
            max_completion_tokens: None,
        };
        self.post(self.url(&request.model, &self.api_version), &body, None).await
    }

    async fn reasoning(&self, request: &CompletionRequest) -> Result<ChatResponse, CompletionError> {
        let body = ChatRequest {
            messages: messages(request),
            temperature: None,
            max_tokens: None,
            max_completion_tokens: request.max_tokens,
        };
        let call = self.post(
            self.url(&request.model, REASONING_API_VERSION),
            &body,
            Some(self.reasoning_timeout),
        );
        tokio::time::timeout(self.reasoning_timeout, call)
            .await
            .map_err(|_| CompletionError::Timeout)?
    }
}

fn transport_error(e: reqwest::Error) -> CompletionError {
    if e.is_timeout() {
        CompletionError::Timeout
    } else {
        CompletionError::Transport(e.to_string())
    }
}

fn messages(request: &CompletionRequest) -> Vec<ChatMessage<'_>> {
    vec![
        ChatMessage {
            role: "system",
            content: &request.system_prompt,
        },
        ChatMessage {
            role: "user",
            content: &request.user_input,
        },
    ]
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ChatResponse {
    model: Option<String>,
    choices: Vec<ChatChoice>,
    usage: Option<TokenUsage>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ChatChoice {
    message: Option<ChatContent>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ChatContent {
    content: Option<String>,
}

#[async_trait]
impl CompletionBackend for AzureOpenAiBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<RawCompletion, CompletionError> {
        let reasoning = is_reasoning_model(&request.model);
        info!(
            model = %request.model,
            reasoning,
            max_tokens = request.max_tokens,
            "calling completion deployment"
        );

        let resp = if reasoning {
            self.reasoning(request).await?
        } else {
            self.standard(request).await?
        };

        let text = resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "{}".to_string());

        Ok(RawCompletion {
            text,
            usage: resp.usage.unwrap_or_default(),
            model: resp.model.unwrap_or_else(|| request.model.clone()),
        })
    }
}
