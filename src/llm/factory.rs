use super::openai::OpenAiCompatibleProvider;
use super::reliable::ReliableProvider;
use super::traits::Provider;
use crate::config::{BackendConfig, ReliabilityConfig};

pub const API_KEY_ENV: &str = "PROMPTGATE_API_KEY";

/// Resolve the API key for a backend.
///
/// Resolution order:
/// 1. Explicit `api_key` from config (trimmed, filtered if empty)
/// 2. `PROMPTGATE_API_KEY`
/// 3. The provider's own variable (e.g. `OPENAI_API_KEY`)
pub fn resolve_api_key(name: &str, explicit_api_key: Option<&str>) -> Option<String> {
    if let Some(key) = explicit_api_key.map(str::trim).filter(|k| !k.is_empty()) {
        return Some(key.to_string());
    }

    let provider_env = match name {
        "openai" => Some("OPENAI_API_KEY"),
        "openrouter" => Some("OPENROUTER_API_KEY"),
        "groq" => Some("GROQ_API_KEY"),
        "together" => Some("TOGETHER_API_KEY"),
        _ => None,
    };

    [Some(API_KEY_ENV), provider_env]
        .into_iter()
        .flatten()
        .filter_map(|var| std::env::var(var).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

/// Default base URL for well-known OpenAI-compatible providers.
pub fn default_base_url(name: &str) -> Option<&'static str> {
    match name {
        "openai" => Some("https://api.openai.com/v1"),
        "openrouter" => Some("https://openrouter.ai/api/v1"),
        "groq" => Some("https://api.groq.com/openai/v1"),
        "together" => Some("https://api.together.xyz/v1"),
        "ollama" => Some("http://localhost:11434/v1"),
        _ => None,
    }
}

/// Build the configured backend wrapped in the retry decorator.
pub fn create_provider(
    backend: &BackendConfig,
    reliability: &ReliabilityConfig,
) -> anyhow::Result<Box<dyn Provider>> {
    let name = backend.provider.trim();
    let base_url = backend
        .base_url
        .as_deref()
        .or_else(|| default_base_url(name))
        .ok_or_else(|| {
            anyhow::anyhow!("unknown provider '{name}': set backend.base_url in config.toml")
        })?;

    // Local servers usually run without auth; send a placeholder bearer.
    let api_key = resolve_api_key(name, backend.api_key.as_deref())
        .or_else(|| (name == "ollama").then(|| "ollama".to_string()));

    let inner = OpenAiCompatibleProvider::new(
        name,
        Some(base_url),
        api_key.as_deref(),
        backend.request_timeout_secs,
    );

    Ok(Box::new(ReliableProvider::new(
        Box::new(inner),
        reliability.provider_retries,
        reliability.provider_backoff_ms,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_key_wins() {
        assert_eq!(
            resolve_api_key("openai", Some("  sk-explicit ")),
            Some("sk-explicit".to_string())
        );
    }

    #[test]
    fn known_providers_have_base_urls() {
        assert!(default_base_url("openai").is_some());
        assert!(default_base_url("ollama").unwrap().starts_with("http://localhost"));
        assert!(default_base_url("mystery").is_none());
    }

    #[test]
    fn unknown_provider_without_base_url_fails() {
        let backend = BackendConfig {
            provider: "mystery".into(),
            ..BackendConfig::default()
        };
        let Err(err) = create_provider(&backend, &ReliabilityConfig::default()) else {
            panic!("expected unknown provider to fail");
        };
        assert!(err.to_string().contains("backend.base_url"));
    }

    #[test]
    fn custom_base_url_builds_provider() {
        let backend = BackendConfig {
            provider: "local".into(),
            base_url: Some("http://127.0.0.1:9000/v1".into()),
            ..BackendConfig::default()
        };
        let provider = create_provider(&backend, &ReliabilityConfig::default()).unwrap();
        assert_eq!(provider.name(), "local");
        assert!(provider.supports_tool_calling());
    }
}
