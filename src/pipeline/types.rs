use serde::Serialize;
use thiserror::Error;

use super::compliance::ComplianceVerdict;
use super::schema::OutputSchema;
use super::state::PipelineState;
use crate::error::PipelineError;

/// One unit of outbound work. Consumed by a single `generate` call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub content: String,
    /// Overrides the orchestrator's default guidance for this request.
    pub system_guidance: Option<String>,
    pub output_schema: Option<OutputSchema>,
}

impl GenerationRequest {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            system_guidance: None,
            output_schema: None,
        }
    }

    #[must_use]
    pub fn with_system_guidance(mut self, guidance: impl Into<String>) -> Self {
        self.system_guidance = Some(guidance.into());
        self
    }

    #[must_use]
    pub fn with_output_schema(mut self, schema: OutputSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn is_structured(&self) -> bool {
        self.output_schema.is_some()
    }
}

/// Successful pipeline outcome.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedText {
    pub request_id: String,
    pub text: String,
    /// Parsed and validated JSON for structured requests.
    pub structured: Option<serde_json::Value>,
    pub states: Vec<PipelineState>,
    pub backend_calls: u32,
    pub compliance: Option<ComplianceVerdict>,
    pub tokens_used: Option<u64>,
}

/// Failed pipeline outcome: the error plus the states visited before it.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct PipelineFailure {
    pub request_id: String,
    #[source]
    pub error: PipelineError,
    pub states: Vec<PipelineState>,
}

impl PipelineFailure {
    pub fn into_error(self) -> PipelineError {
        self.error
    }
}
