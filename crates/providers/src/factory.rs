//! Builds the completion engine named by configuration.

use pawline_core::error::ProviderError;
use pawline_core::provider::Provider;
use std::sync::Arc;

use crate::openai_compat::OpenAiCompatProvider;

/// Providers that answer without an API key.
const KEYLESS: &[&str] = &["ollama", "vllm", "llamacpp", "llama.cpp"];

/// Build the default provider from configuration.
///
/// A `[providers.<name>]` table overrides the root API key and the base URL.
pub fn build_from_config(
    config: &pawline_config::AppConfig,
) -> Result<Arc<dyn Provider>, ProviderError> {
    let name = config.default_provider.as_str();
    let overrides = config.providers.get(name);

    let api_key = overrides
        .and_then(|p| p.api_key.clone())
        .or_else(|| config.api_key.clone());
    let base_url = overrides
        .and_then(|p| p.api_url.clone())
        .or_else(|| default_base_url(name).map(String::from))
        .ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "unknown provider '{name}'; set providers.{name}.api_url"
            ))
        })?;

    let api_key = match api_key {
        Some(key) => key,
        None if KEYLESS.contains(&name) => String::new(),
        None => {
            return Err(ProviderError::NotConfigured(format!(
                "no API key for '{name}'; set PAWLINE_API_KEY or api_key in config"
            )));
        }
    };

    Ok(Arc::new(OpenAiCompatProvider::new(name, base_url, api_key)))
}

/// The default model for the configured provider.
pub fn model_for(config: &pawline_config::AppConfig) -> String {
    config
        .providers
        .get(&config.default_provider)
        .and_then(|p| p.default_model.clone())
        .unwrap_or_else(|| config.default_model.clone())
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> Option<&'static str> {
    match provider_name {
        "openai" => Some("https://api.openai.com/v1"),
        "openrouter" => Some("https://openrouter.ai/api/v1"),
        "ollama" => Some("http://localhost:11434/v1"),
        "groq" => Some("https://api.groq.com/openai/v1"),
        "together" => Some("https://api.together.xyz/v1"),
        "vllm" => Some("http://localhost:8000/v1"),
        "llamacpp" | "llama.cpp" => Some("http://localhost:8080/v1"),
        _ => None,
    }
}
