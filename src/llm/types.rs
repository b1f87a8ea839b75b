use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMessage {
    pub role: MessageRole,
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    Error,
}

/// A tool the backend may ask to invoke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub text: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub model: Option<String>,
    pub content_blocks: Vec<ContentBlock>,
    pub stop_reason: Option<StopReason>,
}

impl ProviderResponse {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            input_tokens: None,
            output_tokens: None,
            model: None,
            content_blocks: vec![],
            stop_reason: Some(StopReason::EndTurn),
        }
    }

    /// A response carrying a single tool invocation plus optional draft text.
    pub fn tool_use(
        id: impl Into<String>,
        name: impl Into<String>,
        input: serde_json::Value,
        text: impl Into<String>,
    ) -> Self {
        let text = text.into();
        let mut content_blocks = Vec::with_capacity(2);
        if !text.is_empty() {
            content_blocks.push(ContentBlock::Text { text: text.clone() });
        }
        content_blocks.push(ContentBlock::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        });
        Self {
            text,
            input_tokens: None,
            output_tokens: None,
            model: None,
            content_blocks,
            stop_reason: Some(StopReason::ToolUse),
        }
    }

    pub fn with_usage(mut self, input_tokens: u64, output_tokens: u64) -> Self {
        self.input_tokens = Some(input_tokens);
        self.output_tokens = Some(output_tokens);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn total_tokens(&self) -> Option<u64> {
        match (self.input_tokens, self.output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        }
    }

    pub fn tool_use_blocks(&self) -> Vec<&ContentBlock> {
        self.content_blocks
            .iter()
            .filter(|block| matches!(block, ContentBlock::ToolUse { .. }))
            .collect()
    }

    pub fn has_tool_use(&self) -> bool {
        self.content_blocks
            .iter()
            .any(|block| matches!(block, ContentBlock::ToolUse { .. }))
    }

    pub fn to_assistant_message(&self) -> ProviderMessage {
        if self.content_blocks.is_empty() {
            ProviderMessage {
                role: MessageRole::Assistant,
                content: vec![ContentBlock::Text {
                    text: self.text.clone(),
                }],
            }
        } else {
            ProviderMessage {
                role: MessageRole::Assistant,
                content: self.content_blocks.clone(),
            }
        }
    }
}

impl ProviderMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    pub fn tool_result(
        tool_use_id: impl Into<String>,
        content: impl Into<String>,
        is_error: bool,
    ) -> Self {
        Self {
            role: MessageRole::User,
            content: vec![ContentBlock::ToolResult {
                tool_use_id: tool_use_id.into(),
                content: content.into(),
                is_error,
            }],
        }
    }

    pub fn has_tool_result(&self) -> bool {
        self.content
            .iter()
            .any(|block| matches!(block, ContentBlock::ToolResult { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::{ContentBlock, MessageRole, ProviderMessage, ProviderResponse, StopReason};

    #[test]
    fn content_block_serde_uses_type_tag() {
        let value = serde_json::json!({
            "type": "tool_use",
            "id": "call_1",
            "name": "compliance_check",
            "input": {"draft": "hello"}
        });
        let block: ContentBlock = serde_json::from_value(value.clone()).unwrap();
        assert!(matches!(block, ContentBlock::ToolUse { .. }));
        assert_eq!(serde_json::to_value(&block).unwrap(), value);
    }

    #[test]
    fn provider_message_user_constructor() {
        let message = ProviderMessage::user("hello");
        assert_eq!(message.role, MessageRole::User);
        match &message.content[0] {
            ContentBlock::Text { text } => assert_eq!(text, "hello"),
            _ => panic!("expected text content block"),
        }
        assert!(!message.has_tool_result());
    }

    #[test]
    fn tool_use_response_keeps_draft_text_first() {
        let resp = ProviderResponse::tool_use(
            "call_1",
            "compliance_check",
            serde_json::json!({}),
            "draft",
        );
        assert!(resp.has_tool_use());
        assert_eq!(resp.stop_reason, Some(StopReason::ToolUse));
        assert!(matches!(resp.content_blocks[0], ContentBlock::Text { .. }));
        assert_eq!(resp.to_assistant_message().content.len(), 2);
    }

    #[test]
    fn text_only_becomes_single_text_message() {
        let resp = ProviderResponse::text_only("done");
        assert!(!resp.has_tool_use());
        let msg = resp.to_assistant_message();
        assert_eq!(msg.role, MessageRole::Assistant);
        assert_eq!(msg.content, vec![ContentBlock::Text { text: "done".into() }]);
    }

    #[test]
    fn usage_totals() {
        assert_eq!(ProviderResponse::text_only("x").total_tokens(), None);
        let with_usage = ProviderResponse::text_only("x").with_usage(10, 20);
        assert_eq!(with_usage.total_tokens(), Some(30));
    }

    #[test]
    fn tool_result_message_is_user_role() {
        let msg = ProviderMessage::tool_result("call_1", "{\"compliant\":true}", false);
        assert_eq!(msg.role, MessageRole::User);
        assert!(msg.has_tool_result());
    }
}
