//! Runtime configuration, read from the process environment (and `.env` via dotenvy in the binary).

use std::{path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;
use ts_rs::TS;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5000;

const ANTHROPIC_DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o";
const DEEPSEEK_DEFAULT_MODEL: &str = "deepseek-chat";
const OLLAMA_DEFAULT_MODEL: &str = "llama3";

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("unknown AI provider: {0}")]
    UnknownProvider(String),
    #[error("AI provider {0} selected but not configured")]
    ProviderNotConfigured(ProviderKind),
}

/// Hosted or local LLM backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProviderKind {
    Anthropic,
    #[strum(serialize = "openai")]
    #[serde(rename = "openai")]
    OpenAi,
    #[strum(serialize = "deepseek")]
    #[serde(rename = "deepseek")]
    DeepSeek,
    Ollama,
}

impl ProviderKind {
    /// Order in which providers are picked when `AI_PROVIDER` is unset
    pub const PREFERENCE: [ProviderKind; 4] = [
        ProviderKind::Anthropic,
        ProviderKind::OpenAi,
        ProviderKind::DeepSeek,
        ProviderKind::Ollama,
    ];
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AiConfig {
    pub provider: Option<ProviderKind>,
    pub anthropic: Option<ProviderSettings>,
    pub openai: Option<ProviderSettings>,
    pub deepseek: Option<ProviderSettings>,
    pub ollama: Option<ProviderSettings>,
}

impl AiConfig {
    pub fn settings(&self, kind: ProviderKind) -> Option<&ProviderSettings> {
        match kind {
            ProviderKind::Anthropic => self.anthropic.as_ref(),
            ProviderKind::OpenAi => self.openai.as_ref(),
            ProviderKind::DeepSeek => self.deepseek.as_ref(),
            ProviderKind::Ollama => self.ollama.as_ref(),
        }
    }

    pub fn configured(&self) -> Vec<ProviderKind> {
        ProviderKind::PREFERENCE
            .into_iter()
            .filter(|kind| self.settings(*kind).is_some())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub reports_dir: PathBuf,
    pub ai: AiConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match get("PORT").or_else(|| get("BACKEND_PORT")) {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        let database_url = get("DATABASE_URL").unwrap_or_else(|| {
            format!("sqlite://{}", utils::assets::database_path().to_string_lossy())
        });
        let reports_dir = get("REPORTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(utils::assets::reports_dir);

        let keyed = |key_var: &str, model_var: &str, default_model: &str, base_url: Option<&str>| {
            get(key_var).map(|api_key| ProviderSettings {
                api_key: Some(api_key),
                model: get(model_var).unwrap_or_else(|| default_model.to_string()),
                base_url: base_url.map(str::to_string),
            })
        };

        let mut ai = AiConfig {
            provider: None,
            anthropic: keyed("ANTHROPIC_API_KEY", "ANTHROPIC_MODEL", ANTHROPIC_DEFAULT_MODEL, None),
            openai: keyed(
                "OPENAI_API_KEY",
                "OPENAI_MODEL",
                OPENAI_DEFAULT_MODEL,
                Some(OPENAI_BASE_URL),
            ),
            deepseek: keyed(
                "DEEPSEEK_API_KEY",
                "DEEPSEEK_MODEL",
                DEEPSEEK_DEFAULT_MODEL,
                Some(DEEPSEEK_BASE_URL),
            ),
            ollama: get("OLLAMA_URL").map(|url| ProviderSettings {
                api_key: None,
                model: get("OLLAMA_MODEL").unwrap_or_else(|| OLLAMA_DEFAULT_MODEL.to_string()),
                base_url: Some(url.trim_end_matches('/').to_string()),
            }),
        };

        ai.provider = match get("AI_PROVIDER") {
            Some(raw) => {
                let kind = ProviderKind::from_str(&raw)
                    .map_err(|_| ConfigError::UnknownProvider(raw.clone()))?;
                if ai.settings(kind).is_none() {
                    return Err(ConfigError::ProviderNotConfigured(kind));
                }
                Some(kind)
            }
            None => ai.configured().into_iter().next(),
        };

        Ok(Self {
            host,
            port,
            database_url,
            reports_dir,
            ai,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_ai() {
        let config = config(&[("DATABASE_URL", "sqlite::memory:"), ("REPORTS_DIR", "/tmp/r")]).unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:5000");
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.ai.provider, None);
        assert!(config.ai.configured().is_empty());
    }

    #[test]
    fn provider_kind_uses_lowercase_wire_names() {
        assert_eq!(serde_json::to_string(&ProviderKind::OpenAi).unwrap(), "\"openai\"");
        let kinds: Vec<ProviderKind> =
            serde_json::from_str(r#"["anthropic", "openai", "deepseek", "ollama"]"#).unwrap();
        assert_eq!(kinds, ProviderKind::PREFERENCE.to_vec());
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = config(&[("PORT", "eighty"), ("DATABASE_URL", "x"), ("REPORTS_DIR", "y")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "PORT", .. }));
    }

    #[test]
    fn first_configured_provider_is_active() {
        let config = config(&[
            ("DATABASE_URL", "x"),
            ("REPORTS_DIR", "y"),
            ("OPENAI_API_KEY", "sk-test"),
            ("OLLAMA_URL", "http://localhost:11434/"),
        ])
        .unwrap();
        assert_eq!(config.ai.provider, Some(ProviderKind::OpenAi));
        assert_eq!(
            config.ai.configured(),
            vec![ProviderKind::OpenAi, ProviderKind::Ollama]
        );
        let ollama = config.ai.ollama.unwrap();
        assert_eq!(ollama.base_url.as_deref(), Some("http://localhost:11434"));
        assert_eq!(ollama.model, "llama3");
    }

    #[test]
    fn explicit_provider_must_be_configured() {
        let err = config(&[("DATABASE_URL", "x"), ("REPORTS_DIR", "y"), ("AI_PROVIDER", "anthropic")])
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ProviderNotConfigured(ProviderKind::Anthropic)
        ));

        let config = config(&[
            ("DATABASE_URL", "x"),
            ("REPORTS_DIR", "y"),
            ("AI_PROVIDER", "DeepSeek"),
            ("DEEPSEEK_API_KEY", "ds-key"),
        ])
        .unwrap();
        assert_eq!(config.ai.provider, Some(ProviderKind::DeepSeek));
    }
}
