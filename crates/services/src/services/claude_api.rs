//! Anthropic Messages API client.

use std::time::Duration;

use async_trait::async_trait;
use backon::Retryable;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::llm::{
    LlmError, LlmMessage, LlmProvider, LlmRole, error_for_status, map_reqwest_error, retry_policy,
};

const CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct ClaudeMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Request body for Claude API
#[derive(Debug, Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ClaudeMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
}

/// Content block in response
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

/// Response from Claude API
#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

impl ClaudeResponse {
    /// Concatenated text blocks of the response
    fn text(&self) -> Option<String> {
        let text: String = self
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

/// Token usage information
#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Claude API client
#[derive(Debug, Clone)]
pub struct ClaudeApiClient {
    http: Client,
    api_key: String,
    model: String,
}

impl ClaudeApiClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

    /// Create a new client with the given API key
    pub fn new(api_key: String, model: Option<String>) -> Result<Self, LlmError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("housy/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    fn build_request<'a>(
        &'a self,
        system: Option<&'a str>,
        messages: &'a [LlmMessage],
        max_tokens: u32,
    ) -> ClaudeRequest<'a> {
        // The Messages API takes the system prompt out of band and only knows user/assistant turns
        let messages = messages
            .iter()
            .filter_map(|m| {
                let role = match m.role {
                    LlmRole::User => "user",
                    LlmRole::Assistant => "assistant",
                    LlmRole::System => return None,
                };
                Some(ClaudeMessage {
                    role,
                    content: &m.content,
                })
            })
            .collect();

        ClaudeRequest {
            model: &self.model,
            max_tokens,
            messages,
            system,
        }
    }

    async fn send_request(&self, request: &ClaudeRequest<'_>) -> Result<ClaudeResponse, LlmError> {
        let res = self
            .http
            .post(CLAUDE_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if res.status().is_success() {
            res.json::<ClaudeResponse>()
                .await
                .map_err(|e| LlmError::Serde(e.to_string()))
        } else {
            Err(error_for_status(res).await)
        }
    }
}

#[async_trait]
impl LlmProvider for ClaudeApiClient {
    fn name(&self) -> &str {
        "anthropic"
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
                    "Claude API call failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    e
                )
            })
            .await?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "Claude API usage"
            );
        }

        response
            .text()
            .ok_or_else(|| LlmError::EmptyResponse(self.name().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_is_sent_out_of_band() {
        let client = ClaudeApiClient::new("key".to_string(), None).unwrap();
        let messages = vec![
            LlmMessage {
                role: LlmRole::System,
                content: "ignored".to_string(),
            },
            LlmMessage::user("How much cement for 100 m²?"),
            LlmMessage::assistant("About 40 bags."),
        ];
        let request = client.build_request(Some("You are a site assistant"), &messages, 512);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], DEFAULT_MODEL);
        assert_eq!(json["system"], "You are a site assistant");
        assert_eq!(json["max_tokens"], 512);
        assert_eq!(json["messages"].as_array().unwrap().len(), 2);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][1]["role"], "assistant");
    }

    #[test]
    fn response_text_skips_non_text_blocks() {
        let response: ClaudeResponse = serde_json::from_str(
            r#"{
                "id": "msg_1",
                "model": "claude",
                "content": [
                    {"type": "thinking", "thinking": "..."},
                    {"type": "text", "text": "Hello"}
                ],
                "usage": {"input_tokens": 3, "output_tokens": 1}
            }"#,
        )
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("Hello"));
    }
}
