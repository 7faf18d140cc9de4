//! Provider-agnostic LLM plumbing shared by the Anthropic, OpenAI-compatible and Ollama clients.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use backon::ExponentialBuilder;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use super::{
    claude_api::ClaudeApiClient,
    config::{AiConfig, ProviderKind},
    ollama_api::OllamaClient,
    openai_api::OpenAiClient,
};

pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Total tries per request, the first call included
pub const MAX_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("rate limited")]
    RateLimited,
    #[error("invalid api key")]
    InvalidApiKey,
    #[error("json error: {0}")]
    Serde(String),
    #[error("empty response from {0}")]
    EmptyResponse(String),
    #[error("provider {0} is missing its {1}")]
    Misconfigured(ProviderKind, &'static str),
}

impl LlmError {
    /// Returns true if the error is transient and should be retried.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout | Self::RateLimited => true,
            Self::Http { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmRole {
    System,
    User,
    Assistant,
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: LlmRole,
    pub content: String,
}

impl LlmMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: LlmRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: LlmRole::Assistant,
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider identifier stored alongside generated content
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    /// Send a conversation and return the text of the reply
    async fn complete(
        &self,
        system: Option<&str>,
        messages: &[LlmMessage],
        max_tokens: u32,
    ) -> Result<String, LlmError>;
}

/// Send a single prompt and return the reply text
pub async fn ask(
    provider: &dyn LlmProvider,
    prompt: &str,
    system: Option<&str>,
) -> Result<String, LlmError> {
    provider
        .complete(system, &[LlmMessage::user(prompt)], DEFAULT_MAX_TOKENS)
        .await
}

/// Send a prompt expecting JSON in the response
pub async fn ask_json<T: DeserializeOwned>(
    provider: &dyn LlmProvider,
    prompt: &str,
    system: Option<&str>,
) -> Result<T, LlmError> {
    let response = ask(provider, prompt, system).await?;

    if response.trim().is_empty() {
        tracing::error!(provider = provider.name(), "LLM returned an empty response");
        return Err(LlmError::EmptyResponse(provider.name().to_string()));
    }

    parse_json_reply(&response)
}

/// Parse a reply that should contain JSON, tolerating markdown code fences around it
pub fn parse_json_reply<T: DeserializeOwned>(response: &str) -> Result<T, LlmError> {
    let json_str = extract_json(response);

    if json_str.trim().is_empty() {
        tracing::error!(response = %response, "Failed to extract JSON from response");
        return Err(LlmError::Serde(format!(
            "Could not extract JSON from response: {}",
            response
        )));
    }

    serde_json::from_str(json_str).map_err(|e| {
        let preview = json_str.chars().take(500).collect::<String>();
        tracing::error!(
            json_error = %e,
            response_length = response.len(),
            extracted_json_preview = %preview,
            "Failed to parse JSON response from LLM"
        );
        LlmError::Serde(format!("{} (response preview: {})", e, preview))
    })
}

/// Extract JSON from a string that might contain markdown code blocks
pub(crate) fn extract_json(text: &str) -> &str {
    let text = text.trim();

    if let Some(start) = text.find("```json") {
        let content_start = start + 7;
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }

    if let Some(start) = text.find("```") {
        let content_start = start + 3;
        // Skip past any language identifier on the same line
        let content_start = text[content_start..]
            .find('\n')
            .map(|i| content_start + i + 1)
            .unwrap_or(content_start);
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }

    // Prose around a bare object: take the outermost braces
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            return &text[start..=end];
        }
    }

    text
}

pub(crate) fn retry_policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(1))
        .with_max_delay(Duration::from_secs(30))
        .with_max_times(MAX_ATTEMPTS - 1)
        .with_jitter()
}

pub(crate) fn map_reqwest_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::Transport(e.to_string())
    }
}

/// Map a non-success HTTP status to an error, consuming the body for context
pub(crate) async fn error_for_status(res: reqwest::Response) -> LlmError {
    match res.status() {
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
            LlmError::InvalidApiKey
        }
        reqwest::StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited,
        s => {
            let status = s.as_u16();
            let body = res.text().await.unwrap_or_default();
            LlmError::Http { status, body }
        }
    }
}

/// Build the client for `kind` from its settings
pub fn build_provider(
    config: &AiConfig,
    kind: ProviderKind,
) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let settings = config
        .settings(kind)
        .ok_or(LlmError::Misconfigured(kind, "settings"))?;
    let api_key = || {
        settings
            .api_key
            .clone()
            .ok_or(LlmError::Misconfigured(kind, "api key"))
    };
    let base_url = || {
        settings
            .base_url
            .clone()
            .ok_or(LlmError::Misconfigured(kind, "base url"))
    };

    let provider: Arc<dyn LlmProvider> = match kind {
        ProviderKind::Anthropic => {
            Arc::new(ClaudeApiClient::new(api_key()?, Some(settings.model.clone()))?)
        }
        ProviderKind::OpenAi | ProviderKind::DeepSeek => Arc::new(OpenAiClient::new(
            kind,
            base_url()?,
            api_key()?,
            settings.model.clone(),
        )?),
        ProviderKind::Ollama => Arc::new(OllamaClient::new(base_url()?, settings.model.clone())?),
    };
    Ok(provider)
}

/// Client for the active provider, if any is configured
pub fn active_provider(config: &AiConfig) -> Result<Option<Arc<dyn LlmProvider>>, LlmError> {
    config
        .provider
        .map(|kind| build_provider(config, kind))
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use backon::Retryable;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Reply {
        key: String,
    }

    #[test]
    fn extract_json_plain() {
        let input = r#"{"key": "value"}"#;
        assert_eq!(extract_json(input), r#"{"key": "value"}"#);
    }

    #[test]
    fn extract_json_code_block() {
        let input = r#"Here's the JSON:
```json
{"key": "value"}
```"#;
        assert_eq!(extract_json(input), r#"{"key": "value"}"#);
    }

    #[test]
    fn extract_json_generic_code_block() {
        let input = r#"```
{"key": "value"}
```"#;
        assert_eq!(extract_json(input), r#"{"key": "value"}"#);
    }

    #[test]
    fn extract_json_surrounded_by_prose() {
        let input = r#"Sure! {"key": "value"} Let me know if you need more."#;
        assert_eq!(extract_json(input), r#"{"key": "value"}"#);
    }

    #[test]
    fn parse_json_reply_reports_bad_json() {
        let parsed: Reply = parse_json_reply("```json\n{\"key\": \"v\"}\n```").unwrap();
        assert_eq!(parsed.key, "v");

        let err = parse_json_reply::<Reply>("no json here").unwrap_err();
        assert!(matches!(err, LlmError::Serde(_)));
    }

    #[test]
    fn only_transient_errors_retry() {
        assert!(LlmError::Timeout.should_retry());
        assert!(LlmError::RateLimited.should_retry());
        assert!(LlmError::Http { status: 503, body: String::new() }.should_retry());
        assert!(!LlmError::Http { status: 400, body: String::new() }.should_retry());
        assert!(!LlmError::InvalidApiKey.should_retry());
    }

    #[tokio::test]
    async fn transient_failures_stop_after_max_attempts() {
        let attempts = AtomicUsize::new(0);
        let policy = retry_policy()
            .with_min_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(2));

        let result: Result<(), LlmError> = (|| async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(LlmError::Timeout)
        })
        .retry(policy)
        .when(|e: &LlmError| e.should_retry())
        .await;

        assert!(matches!(result, Err(LlmError::Timeout)));
        assert_eq!(attempts.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let attempts = AtomicUsize::new(0);
        let result: Result<(), LlmError> = (|| async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(LlmError::InvalidApiKey)
        })
        .retry(retry_policy())
        .when(|e: &LlmError| e.should_retry())
        .await;

        assert!(matches!(result, Err(LlmError::InvalidApiKey)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn no_provider_without_configuration() {
        assert!(active_provider(&AiConfig::default()).unwrap().is_none());
    }
}
