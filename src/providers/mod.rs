// Hosted LLM providers
//
// An abstraction over OpenAI-compatible chat completion APIs (Groq,
// OpenAI) so the agent loop never depends on a specific vendor.

use anyhow::Result;
use async_trait::async_trait;

pub mod factory;
pub mod openai;
pub mod retry;
pub mod types;

pub use factory::create_provider;
pub use openai::OpenAIProvider;
pub use retry::{with_retry, ApiError, RetryPolicy};
pub use types::{ContentBlock, Message, ProviderRequest, ProviderResponse};

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a message and wait for the complete response
    async fn send_message(&self, request: &ProviderRequest) -> Result<ProviderResponse>;

    /// Provider name (e.g. "groq", "openai")
    fn name(&self) -> &str;

    /// Model used when the request leaves it empty
    fn default_model(&self) -> &str;
}
