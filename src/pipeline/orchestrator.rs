use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::compliance::{
    AffirmingCheck, ComplianceCheck, ComplianceVerdict, PolicyRecheck, ToolInvocation,
    compliance_tool_spec,
};
use super::progress::ProgressSink;
use super::schema::OutputSchema;
use super::state::{PipelineStage, PipelineState, StateTrace};
use super::types::{GeneratedText, GenerationRequest, PipelineFailure};
use crate::config::{ComplianceMode, Config, default_system_guidance};
use crate::error::PipelineError;
use crate::llm::{
    ContentBlock, MessageRole, Provider, ProviderChatRequest, ProviderMessage, ProviderResponse,
};
use crate::security::PolicyHandle;

/// Drives one request through the draft / compliance / finalize state machine,
/// or through the single-call structured-output path.
///
/// Holds no per-request state: concurrent `generate` calls share nothing but
/// the backend handle and the compliance check.
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    compliance: Arc<dyn ComplianceCheck>,
    model: String,
    temperature: f64,
    system_guidance: String,
    stage_timeout: Option<Duration>,
}

struct Outcome {
    text: String,
    structured: Option<serde_json::Value>,
    compliance: Option<ComplianceVerdict>,
}

/// Per-call bookkeeping.
struct Run<'a> {
    request_id: String,
    trace: StateTrace,
    backend_calls: u32,
    tokens_used: Option<u64>,
    progress: Option<&'a dyn ProgressSink>,
}

impl<'a> Run<'a> {
    fn new(progress: Option<&'a dyn ProgressSink>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            trace: StateTrace::start(),
            backend_calls: 0,
            tokens_used: None,
            progress,
        }
    }

    async fn announce(&self, state: PipelineState) {
        tracing::info!(request_id = %self.request_id, stage = %state, "{}", state.label());
        if let Some(sink) = self.progress {
            sink.on_state(state).await;
        }
    }

    async fn enter(&mut self, state: PipelineState) {
        if self.trace.advance(state) {
            self.announce(state).await;
        }
    }

    fn record_usage(&mut self, response: &ProviderResponse) {
        if let Some(tokens) = response.total_tokens() {
            self.tokens_used = Some(self.tokens_used.unwrap_or(0).saturating_add(tokens));
        }
    }
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, temperature: f64) -> Self {
        Self {
            provider,
            compliance: Arc::new(AffirmingCheck),
            model: model.into(),
            temperature,
            system_guidance: default_system_guidance(),
            stage_timeout: None,
        }
    }

    pub fn from_config(provider: Arc<dyn Provider>, config: &Config, policy: &PolicyHandle) -> Self {
        let compliance: Arc<dyn ComplianceCheck> = match config.pipeline.compliance_mode {
            ComplianceMode::Affirm => Arc::new(AffirmingCheck),
            ComplianceMode::PolicyRecheck => Arc::new(PolicyRecheck::new(policy.clone())),
        };
        let stage_timeout = (config.pipeline.stage_timeout_secs > 0)
            .then(|| Duration::from_secs(config.pipeline.stage_timeout_secs));

        Self::new(provider, &config.backend.model, config.backend.temperature)
            .with_compliance_check(compliance)
            .with_system_guidance(config.pipeline.system_guidance.clone())
            .with_stage_timeout(stage_timeout)
    }

    #[must_use]
    pub fn with_compliance_check(mut self, compliance: Arc<dyn ComplianceCheck>) -> Self {
        self.compliance = compliance;
        self
    }

    #[must_use]
    pub fn with_system_guidance(mut self, guidance: impl Into<String>) -> Self {
        self.system_guidance = guidance.into();
        self
    }

    #[must_use]
    pub fn with_stage_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stage_timeout = timeout;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn compliance_name(&self) -> &str {
        self.compliance.name()
    }

    pub async fn generate(
        &self,
        request: GenerationRequest,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<GeneratedText, PipelineFailure> {
        self.generate_with_cancel(request, progress, &CancellationToken::new())
            .await
    }

    /// Run the pipeline, failing with `Cancelled` as soon as `cancel` fires.
    pub async fn generate_with_cancel(
        &self,
        request: GenerationRequest,
        progress: Option<&dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<GeneratedText, PipelineFailure> {
        let mut run = Run::new(progress);
        run.announce(PipelineState::Drafting).await;

        let result = match &request.output_schema {
            Some(schema) => self.run_structured(&mut run, &request, schema, cancel).await,
            None => self.run_open_ended(&mut run, &request, cancel).await,
        };

        match result {
            Ok(outcome) => {
                run.enter(PipelineState::Done).await;
                Ok(GeneratedText {
                    request_id: run.request_id,
                    text: outcome.text,
                    structured: outcome.structured,
                    states: run.trace.into_states(),
                    backend_calls: run.backend_calls,
                    compliance: outcome.compliance,
                    tokens_used: run.tokens_used,
                })
            }
            Err(error) => {
                let stage = run.trace.current();
                tracing::error!(
                    request_id = %run.request_id,
                    stage = %stage,
                    reason = %error,
                    "pipeline failed"
                );
                run.enter(PipelineState::Failed).await;
                Err(PipelineFailure {
                    request_id: run.request_id,
                    error,
                    states: run.trace.into_states(),
                })
            }
        }
    }

    async fn run_structured(
        &self,
        run: &mut Run<'_>,
        request: &GenerationRequest,
        schema: &OutputSchema,
        cancel: &CancellationToken,
    ) -> Result<Outcome, PipelineError> {
        let mut chat = ProviderChatRequest::new(&self.model, self.temperature);
        // The default guidance is about the compliance tool, which this path never offers.
        chat.system_prompt = request.system_guidance.clone();
        if !self.provider.supports_structured_output() {
            let instruction = format!(
                "Respond only with JSON that conforms to this schema:\n{}",
                schema.as_value()
            );
            chat.system_prompt = Some(match chat.system_prompt.take() {
                Some(guidance) => format!("{guidance}\n\n{instruction}"),
                None => instruction,
            });
        }
        chat.messages.push(ProviderMessage::user(&request.content));
        chat.response_schema = Some(schema.as_value().clone());

        let response = self
            .call_backend(run, PipelineStage::Drafting, &chat, cancel)
            .await?;
        let structured = schema.parse(&response.text, PipelineStage::Drafting)?;

        Ok(Outcome {
            text: response.text,
            structured: Some(structured),
            compliance: None,
        })
    }

    async fn run_open_ended(
        &self,
        run: &mut Run<'_>,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<Outcome, PipelineError> {
        let mut chat = ProviderChatRequest::new(&self.model, self.temperature);
        chat.system_prompt = Some(
            request
                .system_guidance
                .clone()
                .unwrap_or_else(|| self.system_guidance.clone()),
        );
        chat.messages.push(ProviderMessage::user(&request.content));
        chat.tools = vec![compliance_tool_spec()];

        let draft = self
            .call_backend(run, PipelineStage::Drafting, &chat, cancel)
            .await?;

        let Some(invocation) = ToolInvocation::from_response(&draft) else {
            return Ok(Outcome {
                text: non_empty(draft.text, PipelineStage::Drafting)?,
                structured: None,
                compliance: None,
            });
        };
        if !invocation.is_compliance_check() {
            return Err(PipelineError::MalformedResponse {
                stage: PipelineStage::Drafting,
                reason: format!("backend requested unknown tool '{}'", invocation.name),
            });
        }

        run.enter(PipelineState::ComplianceCheck).await;
        let verdict = self
            .bounded(
                PipelineStage::ComplianceCheck,
                self.compliance.check(&invocation.draft),
                cancel,
            )
            .await?
            .map_err(|e| PipelineError::ComplianceUnavailable {
                message: format!("{e:#}"),
            })?;
        tracing::debug!(
            request_id = %run.request_id,
            check = self.compliance.name(),
            compliant = verdict.compliant,
            "compliance verdict"
        );
        if !verdict.compliant {
            return Err(PipelineError::ComplianceRejected {
                reason: verdict.note,
            });
        }

        run.enter(PipelineState::Finalizing).await;
        chat.messages.push(assistant_turn(&draft, &invocation));
        chat.messages.push(ProviderMessage::tool_result(
            &invocation.id,
            verdict.to_tool_content(),
            false,
        ));

        let answer = self
            .call_backend(run, PipelineStage::Finalizing, &chat, cancel)
            .await?;
        if answer.has_tool_use() {
            tracing::warn!(
                request_id = %run.request_id,
                "backend asked for another tool call while finalizing; ignoring it"
            );
        }

        Ok(Outcome {
            text: non_empty(answer.text, PipelineStage::Finalizing)?,
            structured: None,
            compliance: Some(verdict),
        })
    }

    /// Exactly one backend call for `stage`; retries, if any, live in the provider.
    async fn call_backend(
        &self,
        run: &mut Run<'_>,
        stage: PipelineStage,
        chat: &ProviderChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ProviderResponse, PipelineError> {
        run.backend_calls = run.backend_calls.saturating_add(1);
        let response = self
            .bounded(stage, self.provider.chat(chat), cancel)
            .await?
            .map_err(|e| PipelineError::BackendCallFailed {
                stage,
                message: format!("{e:#}"),
            })?;
        run.record_usage(&response);
        Ok(response)
    }

    /// Race `fut` against cancellation and the per-stage timeout.
    async fn bounded<F: Future>(
        &self,
        stage: PipelineStage,
        fut: F,
        cancel: &CancellationToken,
    ) -> Result<F::Output, PipelineError> {
        let timed = async {
            match self.stage_timeout {
                Some(limit) => tokio::time::timeout(limit, fut)
                    .await
                    .map_err(|_| PipelineError::Timeout { stage, limit }),
                None => Ok(fut.await),
            }
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(PipelineError::Cancelled { stage }),
            result = timed => result,
        }
    }
}

/// Drafting turn as replayed to the backend: its text (if any) plus the one
/// tool call being answered.
fn assistant_turn(draft: &ProviderResponse, invocation: &ToolInvocation) -> ProviderMessage {
    let mut content = Vec::with_capacity(2);
    if !draft.text.is_empty() {
        content.push(ContentBlock::Text {
            text: draft.text.clone(),
        });
    }
    content.push(invocation.to_block());
    ProviderMessage {
        role: MessageRole::Assistant,
        content,
    }
}

fn non_empty(text: String, stage: PipelineStage) -> Result<String, PipelineError> {
    if text.trim().is_empty() {
        return Err(PipelineError::MalformedResponse {
            stage,
            reason: "backend returned an empty answer".into(),
        });
    }
    Ok(text)
}
