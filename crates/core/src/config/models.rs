//! Provider resolution for the generation service.
//!
//! The configured model identifier may carry a provider prefix
//! (`groq/llama-3.3-70b-versatile`, `openrouter/meta-llama/...`). This module
//! turns it plus the available keys into the endpoint the chat client talks
//! to.

use crate::config::error::{ConfigError, ConfigResult};
use mg_protocol::config_models::Settings;

/// Hosted chat-completion providers with an OpenAI-compatible API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Groq,
    OpenRouter,
}

impl Provider {
    pub fn base_url(self) -> &'static str {
        match self {
            Provider::Groq => "https://api.groq.com/openai/v1",
            Provider::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }
}

/// A fully resolved generation endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModel {
    pub provider: Provider,
    /// Model name as the provider expects it (prefix stripped).
    pub model: String,
    pub api_key: String,
}

/// Picks the provider and key for the configured model.
///
/// An explicit prefix wins; otherwise the Groq key is preferred and the
/// OpenRouter key is the fallback.
pub fn resolve_model(settings: &Settings) -> ConfigResult<ResolvedModel> {
    let (prefix, bare) = match settings.model.split_once('/') {
        Some((p, rest)) if p == "groq" || p == "openrouter" => (Some(p), rest),
        _ => (None, settings.model.as_str()),
    };

    let groq = settings.groq_api_key.as_deref();
    let openrouter = settings.openrouter_api_key.as_deref();

    let (provider, key) = match (prefix, groq, openrouter) {
        (Some("groq"), Some(k), _) => (Provider::Groq, k),
        (Some("groq"), None, _) => {
            return Err(ConfigError::InvalidValue {
                key: "model",
                reason: format!("model '{}' needs GROQ_API_KEY", settings.model),
            })
        }
        (Some(_), _, Some(k)) => (Provider::OpenRouter, k),
        (Some(_), _, None) => {
            return Err(ConfigError::InvalidValue {
                key: "model",
                reason: format!("model '{}' needs OPENROUTER_API_KEY", settings.model),
            })
        }
        (None, Some(k), _) => (Provider::Groq, k),
        (None, None, Some(k)) => (Provider::OpenRouter, k),
        (None, None, None) => return Err(ConfigError::MissingCredentials),
    };

    Ok(ResolvedModel {
        provider,
        model: bare.to_string(),
        api_key: key.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(model: &str, groq: Option<&str>, openrouter: Option<&str>) -> Settings {
        Settings {
            model: model.to_string(),
            groq_api_key: groq.map(str::to_string),
            openrouter_api_key: openrouter.map(str::to_string),
            ..Settings::default()
        }
    }

    #[test]
    fn test_groq_prefix_is_stripped() {
        let s = settings("groq/llama-3.3-70b-versatile", Some("gsk_abc"), None);
        let resolved = resolve_model(&s).unwrap();
        assert_eq!(resolved.provider, Provider::Groq);
        assert_eq!(resolved.model, "llama-3.3-70b-versatile");
        assert_eq!(resolved.api_key, "gsk_abc");
    }

    #[test]
    fn test_openrouter_prefix_keeps_vendor_path() {
        let s = settings(
            "openrouter/meta-llama/llama-3.3-70b-instruct",
            Some("gsk_abc"),
            Some("sk-or-0123456789abcdef"),
        );
        let resolved = resolve_model(&s).unwrap();
        assert_eq!(resolved.provider, Provider::OpenRouter);
        assert_eq!(resolved.model, "meta-llama/llama-3.3-70b-instruct");
    }

    #[test]
    fn test_unprefixed_model_falls_back_to_available_key() {
        let s = settings("some-model", None, Some("sk-or-0123456789abcdef"));
        let resolved = resolve_model(&s).unwrap();
        assert_eq!(resolved.provider, Provider::OpenRouter);
        assert_eq!(resolved.model, "some-model");
    }

    #[test]
    fn test_prefix_without_matching_key_is_rejected() {
        let s = settings("groq/llama", None, Some("sk-or-0123456789abcdef"));
        assert!(matches!(
            resolve_model(&s),
            Err(ConfigError::InvalidValue { key: "model", .. })
        ));
    }

    #[test]
    fn test_no_keys_is_missing_credentials() {
        let s = settings("llama", None, None);
        assert!(matches!(resolve_model(&s), Err(ConfigError::MissingCredentials)));
    }
}
