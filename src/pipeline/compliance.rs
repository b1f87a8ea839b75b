use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::llm::{ContentBlock, ProviderResponse, ToolSpec};
use crate::security::PolicyHandle;

/// Name of the single tool the backend may invoke while drafting.
pub const COMPLIANCE_TOOL_NAME: &str = "compliance_check";

pub fn compliance_tool_spec() -> ToolSpec {
    ToolSpec {
        name: COMPLIANCE_TOOL_NAME.to_string(),
        description: "Submit a draft answer for compliance review before finalizing it. \
                      Call this once with the complete draft."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "draft": {
                    "type": "string",
                    "description": "The complete draft answer to review"
                }
            },
            "required": ["draft"]
        }),
    }
}

/// A backend request to run the compliance tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
    /// Draft under review: the `draft` argument, or the response text when
    /// the backend left the argument out.
    pub draft: String,
}

impl ToolInvocation {
    /// First tool call in the response, if any.
    pub fn from_response(response: &ProviderResponse) -> Option<Self> {
        response.content_blocks.iter().find_map(|block| {
            let ContentBlock::ToolUse { id, name, input } = block else {
                return None;
            };
            let draft = input
                .get("draft")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| response.text.clone());
            Some(Self {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
                draft,
            })
        })
    }

    pub fn is_compliance_check(&self) -> bool {
        self.name == COMPLIANCE_TOOL_NAME
    }

    /// Assistant-side block to replay in the finalizing history.
    pub fn to_block(&self) -> ContentBlock {
        ContentBlock::ToolUse {
            id: self.id.clone(),
            name: self.name.clone(),
            input: self.input.clone(),
        }
    }
}

/// Outcome of one compliance check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceVerdict {
    pub compliant: bool,
    pub note: String,
}

impl ComplianceVerdict {
    pub fn affirmed(note: impl Into<String>) -> Self {
        Self {
            compliant: true,
            note: note.into(),
        }
    }

    pub fn rejected(note: impl Into<String>) -> Self {
        Self {
            compliant: false,
            note: note.into(),
        }
    }

    /// Tool-result payload sent back to the backend.
    pub fn to_tool_content(&self) -> String {
        json!({ "compliant": self.compliant, "note": self.note }).to_string()
    }
}

/// Reviews a draft during the COMPLIANCE_CHECK stage.
pub trait ComplianceCheck: Send + Sync {
    fn name(&self) -> &str;

    fn check<'a>(
        &'a self,
        draft: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ComplianceVerdict>> + Send + 'a>>;
}

/// Affirms every draft. Keeps the tool round-trip without a real review.
#[derive(Debug, Default)]
pub struct AffirmingCheck;

impl ComplianceCheck for AffirmingCheck {
    fn name(&self) -> &str {
        "affirm"
    }

    fn check<'a>(
        &'a self,
        _draft: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ComplianceVerdict>> + Send + 'a>> {
        Box::pin(async { Ok(ComplianceVerdict::affirmed("The draft is compliant.")) })
    }
}

/// Runs the draft back through the request policy.
#[derive(Clone)]
pub struct PolicyRecheck {
    policy: PolicyHandle,
}

impl PolicyRecheck {
    pub fn new(policy: PolicyHandle) -> Self {
        Self { policy }
    }
}

impl ComplianceCheck for PolicyRecheck {
    fn name(&self) -> &str {
        "policy_recheck"
    }

    fn check<'a>(
        &'a self,
        draft: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ComplianceVerdict>> + Send + 'a>> {
        Box::pin(async move {
            let decision = self.policy.evaluate(draft);
            if decision.is_denied() {
                return Ok(ComplianceVerdict::rejected(format!(
                    "draft matches restricted categories: {}",
                    decision.categories().join(", ")
                )));
            }
            Ok(ComplianceVerdict::affirmed("The draft passed the policy recheck."))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::{PolicyEngine, PolicyRules};

    #[test]
    fn tool_spec_requires_draft() {
        let spec = compliance_tool_spec();
        assert_eq!(spec.name, COMPLIANCE_TOOL_NAME);
        assert_eq!(spec.parameters["required"][0], "draft");
    }

    #[test]
    fn invocation_reads_draft_argument() {
        let response = ProviderResponse::tool_use(
            "call_1",
            COMPLIANCE_TOOL_NAME,
            json!({"draft": "Paris is the capital of France."}),
            "",
        );
        let call = ToolInvocation::from_response(&response).unwrap();
        assert!(call.is_compliance_check());
        assert_eq!(call.id, "call_1");
        assert_eq!(call.draft, "Paris is the capital of France.");
    }

    #[test]
    fn invocation_falls_back_to_response_text() {
        let response = ProviderResponse::tool_use(
            "call_2",
            COMPLIANCE_TOOL_NAME,
            json!({}),
            "Draft in the text channel",
        );
        let call = ToolInvocation::from_response(&response).unwrap();
        assert_eq!(call.draft, "Draft in the text channel");
    }

    #[test]
    fn plain_text_has_no_invocation() {
        assert!(ToolInvocation::from_response(&ProviderResponse::text_only("done")).is_none());
    }

    #[test]
    fn verdict_serializes_for_backend() {
        let content = ComplianceVerdict::affirmed("ok").to_tool_content();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["compliant"], true);
        assert_eq!(parsed["note"], "ok");
    }

    #[tokio::test]
    async fn affirming_check_always_passes() {
        let verdict = AffirmingCheck.check("anything at all").await.unwrap();
        assert!(verdict.compliant);
    }

    #[tokio::test]
    async fn policy_recheck_rejects_restricted_draft() {
        let check = PolicyRecheck::new(PolicyHandle::new(PolicyEngine::new(PolicyRules::default())));
        let verdict = check.check("First, deploy the malware.").await.unwrap();
        assert!(!verdict.compliant);
        assert!(verdict.note.contains("Cybersecurity Threats"));

        let verdict = check.check("Water boils at 100 degrees.").await.unwrap();
        assert!(verdict.compliant);
    }
}
