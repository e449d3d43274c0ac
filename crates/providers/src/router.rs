//! Provider router — selects the completion provider based on config.

use std::collections::HashMap;
use std::sync::Arc;
use responder_core::provider::Provider;
use crate::openai_compat::OpenAiCompatProvider;

/// Routes completion requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

}

/// Key sent to local servers that accept any bearer token.
const LOCAL_PLACEHOLDER_KEY: &str = "ollama";

/// Build providers from configuration.
///
/// `api_key` overrides the configured keys for every provider; the CLI passes
/// the per-account key from [`responder_config::AppConfig::api_key_for`].
pub fn build_from_config(
    config: &responder_config::AppConfig,
    api_key: Option<&str>,
) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    for (name, provider_config) in &config.providers {
        let key = api_key
            .map(String::from)
            .or_else(|| provider_config.api_key.clone())
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();
        let key = placeholder_if_local(name, key);

        let base_url = provider_config
            .api_url
            .clone()
            .unwrap_or_else(|| default_base_url(name));

        router.register(
            name.clone(),
            Arc::new(OpenAiCompatProvider::new(name, &base_url, &key)),
        );
    }

    // Ensure the default provider exists (even if not explicitly configured)
    if router.get(&config.default_provider).is_none() {
        let key = api_key
            .map(String::from)
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();
        let key = placeholder_if_local(&config.default_provider, key);
        let base_url = default_base_url(&config.default_provider);

        router.register(
            config.default_provider.clone(),
            Arc::new(OpenAiCompatProvider::new(
                &config.default_provider,
                &base_url,
                &key,
            )),
        );
    }

    router
}

/// Ollama needs no real key, but an empty one is rejected before sending.
fn placeholder_if_local(provider_name: &str, key: String) -> String {
    if key.is_empty() && provider_name == "ollama" {
        LOCAL_PLACEHOLDER_KEY.into()
    } else {
        key
    }
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn router_register_and_lookup() {
        let mut router = ProviderRouter::new("openai");
        let provider = Arc::new(OpenAiCompatProvider::new(
            "openai",
            "https://api.openai.com/v1",
            "sk-test",
        ));
        router.register("openai", provider);

        assert!(router.get("openai").is_some());
        assert!(router.get("nonexistent").is_none());
        assert!(router.default().is_some());
    }

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openrouter").contains("openrouter.ai"));
        assert!(default_base_url("openai").contains("api.openai.com"));
        assert!(default_base_url("ollama").contains("localhost:11434"));
    }

    #[test]
    fn build_from_default_config() {
        let config = responder_config::AppConfig::default();
        let router = build_from_config(&config, Some("sk-account"));
        let provider = router.default().unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn keyless_ollama_gets_placeholder_key() {
        assert_eq!(placeholder_if_local("ollama", String::new()), "ollama");
        assert_eq!(placeholder_if_local("ollama", "custom".into()), "custom");
        assert_eq!(placeholder_if_local("openai", String::new()), "");
    }

    #[tokio::test]
    async fn keyless_ollama_reaches_the_network() {
        let mut config = responder_config::AppConfig::default();
        config.default_provider = "ollama".into();
        config.providers.insert(
            "ollama".into(),
            responder_config::ProviderConfig {
                api_key: None,
                // Nothing listens on the discard port.
                api_url: Some("http://127.0.0.1:9/v1".into()),
                default_model: None,
            },
        );

        let provider = build_from_config(&config, None).default().unwrap();
        let request = responder_core::provider::ProviderRequest {
            model: "llama3".into(),
            messages: vec![responder_core::message::ChatMessage::user("halo")],
            temperature: 0.7,
            max_tokens: None,
        };
        let err = provider.complete(request).await.unwrap_err();
        assert!(!matches!(err, responder_core::error::ProviderError::NotConfigured(_)), "{err}");
    }

    #[test]
    fn configured_providers_are_registered() {
        let mut config = responder_config::AppConfig::default();
        config.providers.insert(
            "ollama".into(),
            responder_config::ProviderConfig {
                api_key: None,
                api_url: None,
                default_model: Some("llama3".into()),
            },
        );
        let router = build_from_config(&config, None);
        assert!(router.get("ollama").is_some());
        assert!(router.get("openai").is_some());
    }
}
