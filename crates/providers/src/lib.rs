//! Language-model provider implementations for mailgate.
//!
//! All providers implement the `mailgate_core::Provider` trait.
//! [`build_from_config`] constructs the configured backend.

pub mod openai_compat;

use mailgate_config::AppConfig;
use mailgate_core::error::ProviderError;
use mailgate_core::provider::Provider;
use std::sync::Arc;

pub use openai_compat::OpenAiCompatProvider;

/// Build the inference provider described by `config`.
///
/// Fails with [`ProviderError::NotConfigured`] when no API key is available
/// for a remote endpoint.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let is_local = config.api_url.contains("localhost") || config.api_url.contains("127.0.0.1");
    let api_key = match (&config.api_key, is_local) {
        (Some(key), _) if !key.is_empty() => key.clone(),
        (_, true) => String::new(),
        _ => {
            return Err(ProviderError::NotConfigured(
                "No API key set; add api_key to config.toml or set MAILGATE_API_KEY".into(),
            ));
        }
    };

    let provider = OpenAiCompatProvider::new("openai", &config.api_url, api_key)
        .with_timeout_secs(config.request_timeout_secs);
    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_not_configured() {
        let config = AppConfig::default();
        let err = build_from_config(&config).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn local_endpoint_needs_no_key() {
        let config = AppConfig {
            api_url: "http://localhost:11434/v1".into(),
            ..AppConfig::default()
        };
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn configured_key_builds_provider() {
        let config = AppConfig {
            api_key: Some("sk-test".into()),
            ..AppConfig::default()
        };
        assert!(build_from_config(&config).is_ok());
    }
}
