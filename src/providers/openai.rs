// OpenAI-compatible chat completions provider
//
// Works for both Groq and OpenAI since they share the same API format.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::retry::{with_retry, ApiError, RetryPolicy};
use super::types::{ContentBlock, ProviderRequest, ProviderResponse};
use super::LlmProvider;

const REQUEST_TIMEOUT_SECS: u64 = 60;

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const GROQ_DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI API provider
#[derive(Clone)]
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
    provider_name: String,
    retry: RetryPolicy,
}

impl OpenAIProvider {
    /// Groq (fast inference, OpenAI-compatible API)
    pub fn new_groq(api_key: String) -> Result<Self> {
        Self::new(
            api_key,
            GROQ_BASE_URL.to_string(),
            GROQ_DEFAULT_MODEL.to_string(),
            "groq".to_string(),
        )
    }

    pub fn new_openai(api_key: String) -> Result<Self> {
        Self::new(
            api_key,
            OPENAI_BASE_URL.to_string(),
            OPENAI_DEFAULT_MODEL.to_string(),
            "openai".to_string(),
        )
    }

    /// Set custom model for this provider
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Point at a different endpoint (gateway, proxy, mock server)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn new(
        api_key: String,
        base_url: String,
        default_model: String,
        provider_name: String,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url,
            default_model,
            provider_name,
            retry: RetryPolicy::default(),
        })
    }

    /// Convert ProviderRequest to OpenAI API format
    fn to_openai_request(&self, request: &ProviderRequest) -> OpenAIRequest {
        let model = if request.model.is_empty() {
            self.default_model.clone()
        } else {
            request.model.clone()
        };

        let mut messages: Vec<OpenAIMessage> = Vec::new();

        if let Some(system) = &request.system {
            messages.push(OpenAIMessage::Regular {
                role: "system".to_string(),
                content: system.clone(),
            });
        }

        for msg in &request.messages {
            match msg.role.as_str() {
                "assistant" => {
                    // Tool calls must stay on the assistant message or the
                    // following tool results are orphaned.
                    let text: String = msg
                        .content
                        .iter()
                        .filter_map(|b| b.as_text())
                        .collect::<Vec<_>>()
                        .join("");

                    let tool_calls: Vec<OpenAIRequestToolCall> = msg
                        .content
                        .iter()
                        .filter_map(|b| match b {
                            ContentBlock::ToolUse { id, name, input } => {
                                Some(OpenAIRequestToolCall {
                                    id: id.clone(),
                                    tool_type: "function".to_string(),
                                    function: OpenAIRequestFunction {
                                        name: name.clone(),
                                        arguments: input.to_string(),
                                    },
                                })
                            }
                            _ => None,
                        })
                        .collect();

                    messages.push(OpenAIMessage::Assistant {
                        role: "assistant".to_string(),
                        content: if text.is_empty() { None } else { Some(text) },
                        tool_calls: if tool_calls.is_empty() {
                            None
                        } else {
                            Some(tool_calls)
                        },
                    });
                }
                _ => {
                    let mut text_parts: Vec<&str> = Vec::new();
                    let mut tool_results: Vec<(String, String)> = Vec::new();

                    for block in &msg.content {
                        match block {
                            ContentBlock::Text { text } => text_parts.push(text.as_str()),
                            ContentBlock::ToolResult {
                                tool_use_id,
                                content,
                                ..
                            } => tool_results.push((tool_use_id.clone(), content.clone())),
                            ContentBlock::ToolUse { .. } => {}
                        }
                    }

                    let content = text_parts.join("\n");
                    if !content.trim().is_empty() {
                        messages.push(OpenAIMessage::Regular {
                            role: msg.role.clone(),
                            content,
                        });
                    }

                    // One tool message per result
                    for (tool_call_id, content) in tool_results {
                        messages.push(OpenAIMessage::Tool {
                            role: "tool".to_string(),
                            content: if content.trim().is_empty() {
                                "(no output)".to_string()
                            } else {
                                content
                            },
                            tool_call_id,
                        });
                    }
                }
            }
        }

        let tools = request.tools.as_ref().map(|tool_defs| {
            tool_defs
                .iter()
                .map(|tool| {
                    let parameters = match serde_json::to_value(&tool.input_schema) {
                        Ok(value) => value,
                        Err(e) => {
                            tracing::warn!(
                                "Failed to convert tool schema for '{}': {}",
                                tool.name,
                                e
                            );
                            serde_json::json!({})
                        }
                    };

                    OpenAITool {
                        tool_type: "function".to_string(),
                        function: OpenAIFunction {
                            name: tool.name.clone(),
                            description: tool.description.clone(),
                            parameters,
                        },
                    }
                })
                .collect()
        });

        OpenAIRequest {
            model,
            messages,
            max_tokens: Some(request.max_tokens),
            temperature: request.temperature,
            tools,
        }
    }

    /// Convert OpenAI response to ProviderResponse
    fn from_openai_response(&self, response: OpenAIResponse) -> Result<ProviderResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .context("API returned no choices in response")?;

        let mut content = Vec::new();

        if let Some(text) = choice.message.content {
            if !text.is_empty() {
                content.push(ContentBlock::Text { text });
            }
        }

        if let Some(tool_calls) = choice.message.tool_calls {
            for tool_call in tool_calls {
                if tool_call.tool_type != "function" {
                    continue;
                }
                let input = serde_json::from_str(&tool_call.function.arguments).unwrap_or_else(|e| {
                    tracing::warn!(
                        "Tool call '{}' had unparseable arguments ({}); sending {{}}",
                        tool_call.function.name,
                        e
                    );
                    serde_json::json!({})
                });
                content.push(ContentBlock::ToolUse {
                    id: tool_call.id,
                    name: tool_call.function.name,
                    input,
                });
            }
        }

        Ok(ProviderResponse {
            id: response.id,
            model: response.model,
            content,
            stop_reason: choice.finish_reason,
            role: choice.message.role,
            provider: self.provider_name.clone(),
        })
    }

    /// Send a single request (no retry)
    async fn send_message_once(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
        let openai_request = self.to_openai_request(request);
        let url = format!("{}/v1/chat/completions", self.base_url);

        tracing::debug!(
            "Sending request to {} ({} messages, model {})",
            self.provider_name,
            openai_request.messages.len(),
            openai_request.model
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&openai_request)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {} API", self.provider_name))?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError {
                provider: self.provider_name.clone(),
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let openai_response: OpenAIResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} API response", self.provider_name))?;

        tracing::debug!("Received response: {:?}", openai_response);

        self.from_openai_response(openai_response)
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    async fn send_message(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
        with_retry(self.retry, || self.send_message_once(request)).await
    }

    fn name(&self) -> &str {
        &self.provider_name
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

// OpenAI API types

#[derive(Debug, Clone, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
}

/// Request-side message. Untagged variants are ordered most-specific first.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum OpenAIMessage {
    Tool {
        role: String,
        content: String,
        tool_call_id: String,
    },
    Assistant {
        role: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<OpenAIRequestToolCall>>,
    },
    Regular {
        role: String,
        content: String,
    },
}

#[derive(Debug, Clone, Serialize)]
struct OpenAIRequestToolCall {
    id: String,
    #[serde(rename = "type")]
    tool_type: String,
    function: OpenAIRequestFunction,
}

#[derive(Debug, Clone, Serialize)]
struct OpenAIRequestFunction {
    name: String,
    arguments: String, // JSON-encoded string
}

#[derive(Debug, Clone, Serialize)]
struct OpenAITool {
    #[serde(rename = "type")]
    tool_type: String,
    function: OpenAIFunction,
}

#[derive(Debug, Clone, Serialize)]
struct OpenAIFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIResponseMessage {
    role: String,
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIToolCall>>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    tool_type: String,
    function: OpenAIToolFunction,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIToolFunction {
    name: String,
    arguments: String, // JSON string
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::types::Message;
    use crate::tools::types::{ToolDefinition, ToolInputSchema};
    use serde_json::json;

    #[test]
    fn test_provider_names_and_defaults() {
        let groq = OpenAIProvider::new_groq("test-key".to_string()).unwrap();
        assert_eq!(groq.name(), "groq");
        assert_eq!(groq.default_model(), GROQ_DEFAULT_MODEL);
        assert_eq!(groq.base_url, GROQ_BASE_URL);

        let openai = OpenAIProvider::new_openai("test-key".to_string())
            .unwrap()
            .with_model("gpt-4o");
        assert_eq!(openai.name(), "openai");
        assert_eq!(openai.default_model(), "gpt-4o");
    }

    #[test]
    fn test_request_conversion() {
        let provider = OpenAIProvider::new_groq("k".to_string()).unwrap();
        let request = ProviderRequest::new(vec![
            Message::user("How many orders are undelivered?"),
            Message::with_content(
                "assistant",
                vec![ContentBlock::ToolUse {
                    id: "call_1".to_string(),
                    name: "sql_db_query".to_string(),
                    input: json!({"query": "SELECT COUNT(*) FROM orders_2"}),
                }],
            ),
            Message::with_content(
                "user",
                vec![ContentBlock::ToolResult {
                    tool_use_id: "call_1".to_string(),
                    content: "4".to_string(),
                    is_error: None,
                }],
            ),
        ])
        .with_system("system prompt")
        .with_tools(vec![ToolDefinition {
            name: "sql_db_query".to_string(),
            description: "Run a query".to_string(),
            input_schema: ToolInputSchema::simple(vec![("query", "SQL")]),
        }]);

        let value = serde_json::to_value(provider.to_openai_request(&request)).unwrap();
        let messages = value["messages"].as_array().unwrap();
        assert_eq!(value["model"], GROQ_DEFAULT_MODEL);
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[2]["tool_calls"][0]["function"]["name"], "sql_db_query");
        assert!(messages[2].get("content").is_none());
        assert_eq!(messages[3]["role"], "tool");
        assert_eq!(messages[3]["tool_call_id"], "call_1");
        assert_eq!(value["tools"][0]["type"], "function");
        assert_eq!(value["tools"][0]["function"]["parameters"]["required"][0], "query");
    }

    #[test]
    fn test_response_conversion_with_bad_arguments() {
        let provider = OpenAIProvider::new_groq("k".to_string()).unwrap();
        let response: OpenAIResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "model": "llama-3.1-8b-instant",
            "choices": [{
                "index": 0,
                "finish_reason": "tool_calls",
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "sql_db_list_tables", "arguments": "not json"}
                    }]
                }
            }]
        }))
        .unwrap();

        let converted = provider.from_openai_response(response).unwrap();
        assert!(converted.has_tool_uses());
        assert_eq!(converted.tool_uses()[0].input, json!({}));
        assert_eq!(converted.provider, "groq");
    }

    #[tokio::test]
    async fn test_send_message_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer gsk_test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "id": "chatcmpl-2",
                    "model": "llama-3.1-8b-instant",
                    "choices": [{
                        "index": 0,
                        "finish_reason": "stop",
                        "message": {"role": "assistant", "content": "There are 4 orders."}
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let provider = OpenAIProvider::new_groq("gsk_test".to_string())
            .unwrap()
            .with_base_url(server.url())
            .with_retry_policy(RetryPolicy::none());
        let response = provider
            .send_message(&ProviderRequest::new(vec![Message::user("count")]))
            .await
            .unwrap();

        assert_eq!(response.text(), "There are 4 orders.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_auth_error_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Invalid API Key"}}"#)
            .expect(1)
            .create_async()
            .await;

        let provider = OpenAIProvider::new_groq("bad".to_string())
            .unwrap()
            .with_base_url(server.url())
            .with_retry_policy(RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
            });
        let err = provider
            .send_message(&ProviderRequest::new(vec![Message::user("hi")]))
            .await
            .unwrap_err();

        let api = err.downcast_ref::<ApiError>().unwrap();
        assert_eq!(api.status, 401);
        assert!(api.body.contains("Invalid API Key"));
        mock.assert_async().await;
    }
}
