use serde::{Deserialize, Serialize};

/// Which compliance check runs when the backend asks for one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ComplianceMode {
    /// Always affirm the draft.
    #[default]
    Affirm,
    /// Re-run the policy engine over the draft and reject on any match.
    PolicyRecheck,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_system_guidance")]
    pub system_guidance: String,
    /// Per-stage timeout in seconds; `0` disables it.
    #[serde(default = "default_stage_timeout_secs")]
    pub stage_timeout_secs: u64,
    #[serde(default)]
    pub compliance_mode: ComplianceMode,
}

pub fn default_system_guidance() -> String {
    "You are a careful assistant. Before answering any request that touches on legal, \
     financial, medical or safety-sensitive matters, call the `compliance_check` tool with \
     your draft answer, then give your final answer taking its result into account."
        .into()
}

fn default_stage_timeout_secs() -> u64 {
    90
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            system_guidance: default_system_guidance(),
            stage_timeout_secs: default_stage_timeout_secs(),
            compliance_mode: ComplianceMode::default(),
        }
    }
}
