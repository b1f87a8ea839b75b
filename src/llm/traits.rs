use super::types::{ProviderMessage, ProviderResponse, ToolSpec};
use std::future::Future;
use std::pin::Pin;

/// One call to a generation backend.
#[derive(Debug, Clone)]
pub struct ProviderChatRequest {
    pub system_prompt: Option<String>,
    pub messages: Vec<ProviderMessage>,
    pub tools: Vec<ToolSpec>,
    /// JSON Schema the response text must conform to.
    pub response_schema: Option<serde_json::Value>,
    pub model: String,
    pub temperature: f64,
}

impl ProviderChatRequest {
    pub fn new(model: impl Into<String>, temperature: f64) -> Self {
        Self {
            system_prompt: None,
            messages: Vec::new(),
            tools: Vec::new(),
            response_schema: None,
            model: model.into(),
            temperature,
        }
    }
}

/// Provider capabilities reported at runtime.
#[derive(Debug, Clone, Default)]
pub struct ProviderCapabilities {
    pub tool_calling: bool,
    pub structured_output: bool,
}

/// Generation backend.
///
/// Dyn-safe: async methods return boxed futures so the orchestrator can hold
/// any backend behind `Arc<dyn Provider>`.
pub trait Provider: Send + Sync {
    /// Provider identifier (e.g. "openai", "mock").
    fn name(&self) -> &str;

    /// Runtime capability flags.
    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::default()
    }

    /// Send one request and return either final text or a tool invocation.
    fn chat<'a>(
        &'a self,
        request: &'a ProviderChatRequest,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ProviderResponse>> + Send + 'a>>;

    /// Warm up the HTTP connection pool.
    fn warmup(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move { Ok(()) })
    }

    fn supports_tool_calling(&self) -> bool {
        self.capabilities().tool_calling
    }

    fn supports_structured_output(&self) -> bool {
        self.capabilities().structured_output
    }
}
