// Provider factory
//
// Creates LLM providers from configuration

use anyhow::Result;

use super::openai::OpenAIProvider;
use super::LlmProvider;
use crate::config::{ProviderConfig, ProviderType};

/// Create the configured provider. The API key must already be resolved.
pub fn create_provider(config: &ProviderConfig) -> Result<Box<dyn LlmProvider>> {
    let mut provider = match config.provider {
        ProviderType::Groq => OpenAIProvider::new_groq(config.api_key.clone())?,
        ProviderType::Openai => OpenAIProvider::new_openai(config.api_key.clone())?,
    };
    if let Some(model) = &config.model {
        provider = provider.with_model(model.clone());
    }
    if let Some(base_url) = &config.base_url {
        provider = provider.with_base_url(base_url.clone());
    }

    tracing::info!(
        "Using {} provider with model {}",
        provider.name(),
        provider.default_model()
    );
    Ok(Box::new(provider))
}
