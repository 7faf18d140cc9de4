//! Client for OpenAI-compatible chat completion endpoints (OpenAI and DeepSeek).

use std::time::Duration;

use async_trait::async_trait;
use backon::Retryable;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{
    config::ProviderKind,
    llm::{
        LlmError, LlmMessage, LlmProvider, LlmRole, error_for_status, map_reqwest_error,
        retry_policy,
    },
};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatCompletionMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatCompletionMessage<'a> {
    role: LlmRole,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatCompletionResponse {
    fn text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    kind: ProviderKind,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

    pub fn new(
        kind: ProviderKind,
        base_url: String,
        api_key: String,
        model: String,
    ) -> Result<Self, LlmError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("housy/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        let endpoint = format!("{}/chat/completions", base_url.trim_end_matches('/'));

        Ok(Self {
            http,
            kind,
            endpoint,
            api_key,
            model,
        })
    }

    fn build_request<'a>(
        &'a self,
        system: Option<&'a str>,
        messages: &'a [LlmMessage],
        max_tokens: u32,
    ) -> ChatCompletionRequest<'a> {
        let system = system.map(|content| ChatCompletionMessage {
            role: LlmRole::System,
            content,
        });
        let messages = system
            .into_iter()
            .chain(messages.iter().map(|m| ChatCompletionMessage {
                role: m.role,
                content: &m.content,
            }))
            .collect();

        ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens,
        }
    }

    async fn send_request(
        &self,
        request: &ChatCompletionRequest<'_>,
    ) -> Result<ChatCompletionResponse, LlmError> {
        let res = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if res.status().is_success() {
            res.json::<ChatCompletionResponse>()
                .await
                .map_err(|e| LlmError::Serde(e.to_string()))
        } else {
            Err(error_for_status(res).await)
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiClient {
    fn name(&self) -> &str {
        match self.kind {
            ProviderKind::DeepSeek => "deepseek",
            _ => "openai",
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        system: Option<&str>,
        messages: &[LlmMessage],
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let request = self.build_request(system, messages, max_tokens);

        let response = (|| async { self.send_request(&request).await })
            .retry(retry_policy())
            .when(|e: &LlmError| e.should_retry())
            .notify(|e, dur| {
                warn!(
                    provider = self.name(),
                    "Chat completion failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    e
                )
            })
            .await?;

        response
            .text()
            .ok_or_else(|| LlmError::EmptyResponse(self.name().to_string()))
    }
}
