//! OpenAI-compatible chat completions backend.
//! Speaks `/v1/chat/completions` with function tools and `json_schema`
//! response formats, which covers OpenAI itself and most hosted gateways.

use super::scrub::{api_error, scrub_secret_patterns};
use super::traits::{Provider, ProviderCapabilities, ProviderChatRequest};
use super::types::{ContentBlock, MessageRole, ProviderMessage, ProviderResponse, StopReason, ToolSpec};
use anyhow::Context;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiCompatibleProvider {
    name: String,
    /// Pre-computed `"Bearer <key>"` header value (avoids `format!` per request).
    cached_auth_header: Option<String>,
    /// Pre-computed chat completions URL.
    chat_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Debug, Clone, Serialize)]
struct OpenAiTool {
    r#type: &'static str,
    function: OpenAiToolDefinition,
}

#[derive(Debug, Clone, Serialize)]
struct OpenAiToolDefinition {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: &'static str,
    json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    name: &'static str,
    schema: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiToolCall {
    id: String,
    r#type: String,
    function: OpenAiToolCallFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiToolCallFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        name: &str,
        base_url: Option<&str>,
        api_key: Option<&str>,
        timeout_secs: u64,
    ) -> Self {
        let base_url = base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/');
        let chat_url = if base_url.ends_with("chat/completions") {
            base_url.to_string()
        } else {
            format!("{base_url}/chat/completions")
        };

        Self {
            name: name.to_string(),
            cached_auth_header: api_key.map(|k| format!("Bearer {k}")),
            chat_url,
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .connect_timeout(Duration::from_secs(10))
                .pool_max_idle_per_host(10)
                .pool_idle_timeout(Duration::from_secs(90))
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    fn build_text_message(role: &'static str, content: String) -> Message {
        Message {
            role,
            content: Some(content),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    fn map_provider_message(provider_message: &ProviderMessage) -> Vec<Message> {
        let mut text_parts = Vec::new();
        let mut assistant_tool_calls = Vec::new();
        let mut tool_messages = Vec::new();

        for block in &provider_message.content {
            match block {
                ContentBlock::Text { text } => text_parts.push(text.clone()),
                ContentBlock::ToolUse { id, name, input } => {
                    assistant_tool_calls.push(OpenAiToolCall {
                        id: id.clone(),
                        r#type: "function".to_string(),
                        function: OpenAiToolCallFunction {
                            name: name.clone(),
                            arguments: input.to_string(),
                        },
                    });
                }
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    is_error: _,
                } => {
                    tool_messages.push(Message {
                        role: "tool",
                        content: Some(content.clone()),
                        tool_call_id: Some(tool_use_id.clone()),
                        tool_calls: None,
                    });
                }
            }
        }

        let text_content = if text_parts.is_empty() {
            None
        } else {
            Some(text_parts.join("\n"))
        };

        let mut messages = Vec::new();
        match provider_message.role {
            MessageRole::Assistant => {
                if text_content.is_some() || !assistant_tool_calls.is_empty() {
                    messages.push(Message {
                        role: "assistant",
                        content: text_content,
                        tool_call_id: None,
                        tool_calls: if assistant_tool_calls.is_empty() {
                            None
                        } else {
                            Some(assistant_tool_calls)
                        },
                    });
                }
            }
            MessageRole::User => {
                if let Some(content) = text_content {
                    messages.push(Self::build_text_message("user", content));
                }
            }
            MessageRole::System => {
                if let Some(content) = text_content {
                    messages.push(Self::build_text_message("system", content));
                }
            }
        }

        messages.extend(tool_messages);
        messages
    }

    fn build_openai_tools(tools: &[ToolSpec]) -> Option<Vec<OpenAiTool>> {
        if tools.is_empty() {
            return None;
        }
        Some(
            tools
                .iter()
                .map(|tool| OpenAiTool {
                    r#type: "function",
                    function: OpenAiToolDefinition {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        parameters: tool.parameters.clone(),
                    },
                })
                .collect(),
        )
    }

    fn build_request(request: &ProviderChatRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(sys) = &request.system_prompt {
            messages.push(Self::build_text_message("system", sys.clone()));
        }
        for message in &request.messages {
            messages.extend(Self::map_provider_message(message));
        }

        ChatRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            tools: Self::build_openai_tools(&request.tools),
            response_format: request.response_schema.as_ref().map(|schema| ResponseFormat {
                r#type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: "structured_output",
                    schema: schema.clone(),
                },
            }),
        }
    }

    fn map_finish_reason(finish_reason: Option<&str>) -> StopReason {
        match finish_reason {
            Some("stop") => StopReason::EndTurn,
            Some("tool_calls") => StopReason::ToolUse,
            Some("length") => StopReason::MaxTokens,
            Some(_) | None => StopReason::Error,
        }
    }

    fn parse_tool_calls(tool_calls: Option<Vec<OpenAiToolCall>>) -> anyhow::Result<Vec<ContentBlock>> {
        tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tool_call| {
                let input: Value = if tool_call.function.arguments.trim().is_empty() {
                    Value::Object(serde_json::Map::new())
                } else {
                    serde_json::from_str(&tool_call.function.arguments).with_context(|| {
                        format!(
                            "tool call arguments were not valid JSON for {}",
                            tool_call.function.name
                        )
                    })?
                };
                Ok(ContentBlock::ToolUse {
                    id: tool_call.id,
                    name: tool_call.function.name,
                    input,
                })
            })
            .collect()
    }

    fn parse_response(chat_response: ChatResponse) -> anyhow::Result<ProviderResponse> {
        let ChatResponse {
            choices,
            usage,
            model,
        } = chat_response;
        let choice = choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("backend returned no choices"))?;

        let text = choice.message.content.unwrap_or_default();
        let tool_blocks = Self::parse_tool_calls(choice.message.tool_calls)?;
        let mut stop_reason = Self::map_finish_reason(choice.finish_reason.as_deref());
        if !tool_blocks.is_empty() {
            stop_reason = StopReason::ToolUse;
        }

        let mut content_blocks = Vec::with_capacity(tool_blocks.len() + 1);
        if !text.is_empty() && !tool_blocks.is_empty() {
            content_blocks.push(ContentBlock::Text { text: text.clone() });
        }
        content_blocks.extend(tool_blocks);

        let mut response = ProviderResponse {
            text,
            input_tokens: None,
            output_tokens: None,
            model: None,
            content_blocks,
            stop_reason: Some(stop_reason),
        };
        if let Some(usage) = usage {
            response = response.with_usage(usage.prompt_tokens, usage.completion_tokens);
        }
        if let Some(model) = model {
            response = response.with_model(model);
        }
        Ok(response)
    }

    async fn call_api(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse> {
        let auth_header = self.cached_auth_header.as_ref().ok_or_else(|| {
            anyhow::anyhow!(
                "{} API key not set. Set PROMPTGATE_API_KEY or edit config.toml.",
                self.name
            )
        })?;

        let response = self
            .client
            .post(&self.chat_url)
            .header("Authorization", auth_header)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(&self.name, response).await);
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            anyhow::anyhow!(
                "{} returned an unreadable body: {e}: {}",
                self.name,
                scrub_secret_patterns(&body)
            )
        })
    }
}

impl Provider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            tool_calling: true,
            structured_output: true,
        }
    }

    fn chat<'a>(
        &'a self,
        request: &'a ProviderChatRequest,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ProviderResponse>> + Send + 'a>> {
        Box::pin(async move {
            let wire = Self::build_request(request);
            let chat_response = self.call_api(&wire).await?;
            Self::parse_response(chat_response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_provider(url: &str, key: Option<&str>) -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::new("openai", Some(url), key, 30)
    }

    fn compliance_tool() -> ToolSpec {
        ToolSpec {
            name: "compliance_check".into(),
            description: "check".into(),
            parameters: json!({"type": "object"}),
        }
    }

    #[test]
    fn chat_url_is_derived_from_base() {
        assert_eq!(
            make_provider("https://example.com/v1/", None).chat_url(),
            "https://example.com/v1/chat/completions"
        );
        assert_eq!(
            make_provider("https://example.com/v1/chat/completions", None).chat_url(),
            "https://example.com/v1/chat/completions"
        );
    }

    #[test]
    fn request_maps_tool_turns() {
        let mut req = ProviderChatRequest::new("gpt-test", 0.2);
        req.system_prompt = Some("be careful".into());
        req.tools = vec![compliance_tool()];
        req.messages = vec![
            ProviderMessage::user("write a memo"),
            ProviderResponse::tool_use("call_1", "compliance_check", json!({"draft": "memo"}), "memo")
                .to_assistant_message(),
            ProviderMessage::tool_result("call_1", "{\"compliant\":true}", false),
        ];

        let wire = serde_json::to_value(OpenAiCompatibleProvider::build_request(&req)).unwrap();
        let messages = wire["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[2]["tool_calls"][0]["function"]["name"], "compliance_check");
        assert_eq!(messages[3]["role"], "tool");
        assert_eq!(messages[3]["tool_call_id"], "call_1");
        assert_eq!(wire["tools"][0]["function"]["name"], "compliance_check");
        assert!(wire.get("response_format").is_none());
    }

    #[test]
    fn request_carries_response_schema() {
        let mut req = ProviderChatRequest::new("gpt-test", 0.0);
        req.response_schema = Some(json!({"type": "object"}));
        let wire = serde_json::to_value(OpenAiCompatibleProvider::build_request(&req)).unwrap();
        assert_eq!(wire["response_format"]["type"], "json_schema");
        assert_eq!(wire["response_format"]["json_schema"]["schema"]["type"], "object");
        assert!(wire.get("tools").is_none());
    }

    #[tokio::test]
    async fn chat_fails_without_key() {
        let p = make_provider("https://example.com/v1", None);
        let err = p
            .chat(&ProviderChatRequest::new("m", 0.0))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("API key not set"));
    }

    #[tokio::test]
    async fn parses_tool_call_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "gpt-test",
                "usage": {"prompt_tokens": 7, "completion_tokens": 3},
                "choices": [{
                    "finish_reason": "tool_calls",
                    "message": {
                        "content": "draft text",
                        "tool_calls": [{
                            "id": "call_9",
                            "type": "function",
                            "function": {"name": "compliance_check", "arguments": "{\"draft\":\"draft text\"}"}
                        }]
                    }
                }]
            })))
            .mount(&server)
            .await;

        let p = make_provider(&format!("{}/v1", server.uri()), Some("test-key"));
        let resp = p.chat(&ProviderChatRequest::new("gpt-test", 0.0)).await.unwrap();
        assert!(resp.has_tool_use());
        assert_eq!(resp.stop_reason, Some(StopReason::ToolUse));
        assert_eq!(resp.text, "draft text");
        assert_eq!(resp.total_tokens(), Some(10));
        assert_eq!(resp.model.as_deref(), Some("gpt-test"));
    }

    #[tokio::test]
    async fn parses_plain_text_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"finish_reason": "stop", "message": {"content": "final"}}]
            })))
            .mount(&server)
            .await;

        let p = make_provider(&format!("{}/v1", server.uri()), Some("k"));
        let resp = p.chat(&ProviderChatRequest::new("m", 0.0)).await.unwrap();
        assert!(!resp.has_tool_use());
        assert_eq!(resp.text, "final");
        assert!(resp.content_blocks.is_empty());
    }

    #[tokio::test]
    async fn error_status_is_scrubbed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(401).set_body_string("Incorrect API key provided: sk-secret123"),
            )
            .mount(&server)
            .await;

        let p = make_provider(&format!("{}/v1", server.uri()), Some("k"));
        let err = p.chat(&ProviderChatRequest::new("m", 0.0)).await.unwrap_err();
        let text = err.to_string();
        assert!(text.contains("401"));
        assert!(!text.contains("secret123"));
    }
}
