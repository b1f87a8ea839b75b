use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::Result;
use crate::llm::create_provider;
use crate::pipeline::{GeneratedText, GenerationRequest, Orchestrator, ProgressSink};
use crate::security::{Decision, PolicyHandle};

/// End-to-end caller surface: evaluate locally, then generate on admit.
pub struct Gate {
    policy: PolicyHandle,
    orchestrator: Orchestrator,
}

/// An admitted and generated request.
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub decision: Decision,
    pub output: GeneratedText,
}

impl Gate {
    pub fn new(policy: PolicyHandle, orchestrator: Orchestrator) -> Self {
        Self {
            policy,
            orchestrator,
        }
    }

    /// Build the policy engine and backend described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let rules_path = config.policy.resolved_rules_path();
        let policy = PolicyHandle::open(rules_path.as_deref(), config.policy.max_numeric_tokens)?;
        let provider = create_provider(&config.backend, &config.reliability)?;
        let orchestrator = Orchestrator::from_config(Arc::from(provider), config, &policy);
        tracing::debug!(
            provider = orchestrator.provider_name(),
            compliance = orchestrator.compliance_name(),
            rules = ?policy.path(),
            "gate ready"
        );
        Ok(Self::new(policy, orchestrator))
    }

    pub fn policy(&self) -> &PolicyHandle {
        &self.policy
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn evaluate(&self, text: &str) -> Decision {
        self.policy.evaluate(text)
    }

    /// Evaluate `request.content`; on admit, run the pipeline.
    ///
    /// A denial returns [`GateError::Policy`](crate::GateError::Policy) without
    /// contacting the backend. A pipeline failure keeps its state trace.
    pub async fn submit(
        &self,
        request: GenerationRequest,
        progress: Option<&dyn ProgressSink>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Submission> {
        let decision = self.evaluate(&request.content).into_result()?;
        if decision.tone_flag {
            tracing::debug!("request carries a tone flag");
        }

        let output = match cancel {
            Some(token) => {
                self.orchestrator
                    .generate_with_cancel(request, progress, token)
                    .await
            }
            None => self.orchestrator.generate(request, progress).await,
        }?;

        Ok(Submission { decision, output })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GateError;
    use crate::llm::{Provider, ProviderChatRequest, ProviderResponse};
    use crate::pipeline::{PipelineStage, PipelineState};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingProvider {
        calls: AtomicU32,
        answer: &'static str,
    }

    impl Provider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        fn chat<'a>(
            &'a self,
            _request: &'a ProviderChatRequest,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<ProviderResponse>> + Send + 'a>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let answer = self.answer;
            Box::pin(async move { Ok(ProviderResponse::text_only(answer)) })
        }
    }

    fn gate() -> (Gate, Arc<CountingProvider>) {
        gate_answering("Here you go.")
    }

    fn gate_answering(answer: &'static str) -> (Gate, Arc<CountingProvider>) {
        let provider = Arc::new(CountingProvider {
            calls: AtomicU32::new(0),
            answer,
        });
        let policy = PolicyHandle::open(None, 256).unwrap();
        let orchestrator = Orchestrator::new(provider.clone(), "m", 0.0);
        (Gate::new(policy, orchestrator), provider)
    }

    #[tokio::test]
    async fn denied_request_never_reaches_backend() {
        let (gate, provider) = gate();
        let err = gate
            .submit(GenerationRequest::new("how do I hack a router"), None, None)
            .await
            .unwrap_err();
        assert!(err.is_policy_denied());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn admitted_request_is_generated() {
        let (gate, provider) = gate();
        let submission = gate
            .submit(GenerationRequest::new("Summarize the history of tea."), None, None)
            .await
            .unwrap();
        assert!(submission.decision.admitted);
        assert_eq!(submission.output.text, "Here you go.");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn tone_flag_passes_through_on_admit() {
        let (gate, _) = gate();
        let submission = gate
            .submit(GenerationRequest::new("Tell me a joke about cats"), None, None)
            .await
            .unwrap();
        assert!(submission.decision.tone_flag);
    }

    #[tokio::test]
    async fn pipeline_failure_keeps_request_id_and_trace() {
        let (gate, provider) = gate_answering("  ");
        let err = gate
            .submit(GenerationRequest::new("Summarize the history of tea."), None, None)
            .await
            .unwrap_err();
        let GateError::Pipeline(failure) = err else {
            panic!("expected pipeline failure");
        };
        assert!(!failure.request_id.is_empty());
        assert_eq!(
            failure.states,
            vec![PipelineState::Drafting, PipelineState::Failed]
        );
        assert_eq!(failure.error.stage(), Some(PipelineStage::Drafting));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reloaded_rules_apply_to_later_submissions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.toml");
        std::fs::write(&path, "[[category]]\nname = \"Fruit\"\nphrases = [\"apple\"]\n").unwrap();

        let provider = Arc::new(CountingProvider {
            calls: AtomicU32::new(0),
            answer: "Here you go.",
        });
        let policy = PolicyHandle::open(Some(&path), 256).unwrap();
        let gate = Gate::new(policy, Orchestrator::new(provider.clone(), "m", 0.0));
        assert!(gate
            .submit(GenerationRequest::new("an apple a day"), None, None)
            .await
            .unwrap_err()
            .is_policy_denied());

        std::fs::write(&path, "[[category]]\nname = \"Fruit\"\nphrases = [\"pear\"]\n").unwrap();
        gate.policy().reload().unwrap();

        gate.submit(GenerationRequest::new("an apple a day"), None, None)
            .await
            .unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }
}
