//! Client for a local Ollama server (`POST /api/chat`, non-streaming).

use std::time::Duration;

use async_trait::async_trait;
use backon::Retryable;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::llm::{
    LlmError, LlmMessage, LlmProvider, LlmRole, error_for_status, map_reqwest_error, retry_policy,
};

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    num_predict: u32,
}

#[derive(Debug, Serialize)]
struct OllamaMessage<'a> {
    role: LlmRole,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaReply>,
}

#[derive(Debug, Deserialize)]
struct OllamaReply {
    content: String,
}

#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: Client,
    endpoint: String,
    model: String,
}

impl OllamaClient {
    // Local models can be slow on CPU
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

    pub fn new(base_url: String, model: String) -> Result<Self, LlmError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        let endpoint = format!("{}/api/chat", base_url.trim_end_matches('/'));
        Ok(Self {
            http,
            endpoint,
            model,
        })
    }

    fn build_request<'a>(
        &'a self,
        system: Option<&'a str>,
        messages: &'a [LlmMessage],
        max_tokens: u32,
    ) -> OllamaChatRequest<'a> {
        let system = system.map(|content| OllamaMessage {
            role: LlmRole::System,
            content,
        });
        OllamaChatRequest {
            model: &self.model,
            messages: system
                .into_iter()
                .chain(messages.iter().map(|m| OllamaMessage {
                    role: m.role,
                    content: &m.content,
                }))
                .collect(),
            stream: false,
            options: OllamaOptions {
                num_predict: max_tokens,
            },
        }
    }

    async fn send_request(
        &self,
        request: &OllamaChatRequest<'_>,
    ) -> Result<OllamaChatResponse, LlmError> {
        let res = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if res.status().is_success() {
            res.json::<OllamaChatResponse>()
                .await
                .map_err(|e| LlmError::Serde(e.to_string()))
        } else {
            Err(error_for_status(res).await)
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
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
                    "Ollama call failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    e
                )
            })
            .await?;

        response
            .message
            .map(|m| m.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| LlmError::EmptyResponse(self.name().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_disables_streaming() {
        let client =
            OllamaClient::new("http://localhost:11434/".to_string(), "llama3".to_string()).unwrap();
        let messages = vec![LlmMessage::user("hello")];
        let json = serde_json::to_value(client.build_request(None, &messages, 128)).unwrap();

        assert_eq!(client.endpoint, "http://localhost:11434/api/chat");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 128);
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn parses_reply() {
        let response: OllamaChatResponse = serde_json::from_str(
            r#"{"model":"llama3","message":{"role":"assistant","content":"Hi"},"done":true}"#,
        )
        .unwrap();
        assert_eq!(response.message.unwrap().content, "Hi");
    }
}
