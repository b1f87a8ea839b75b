use serde::{Deserialize, Serialize};

/// A working stage of the pipeline; every failure is attributed to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStage {
    Drafting,
    ComplianceCheck,
    Finalizing,
}

impl PipelineStage {
    /// Human-readable progress label emitted on entry.
    pub fn label(self) -> &'static str {
        match self {
            Self::Drafting => "Generating initial draft…",
            Self::ComplianceCheck => "Performing compliance check…",
            Self::Finalizing => "Finalizing…",
        }
    }
}

/// State of one `generate` call.
///
/// `Drafting → ComplianceCheck → Finalizing → Done`, with the shortcut
/// `Drafting → Done` and `Failed` reachable from any working stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    Drafting,
    ComplianceCheck,
    Finalizing,
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub fn stage(self) -> Option<PipelineStage> {
        match self {
            Self::Drafting => Some(PipelineStage::Drafting),
            Self::ComplianceCheck => Some(PipelineStage::ComplianceCheck),
            Self::Finalizing => Some(PipelineStage::Finalizing),
            Self::Done | Self::Failed => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self.stage() {
            Some(stage) => stage.label(),
            None if self == Self::Done => "Done.",
            None => "Failed.",
        }
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Drafting, Self::ComplianceCheck | Self::Done)
                | (Self::ComplianceCheck, Self::Finalizing)
                | (Self::Finalizing, Self::Done)
        ) || (!self.is_terminal() && next == Self::Failed)
    }
}

impl From<PipelineStage> for PipelineState {
    fn from(stage: PipelineStage) -> Self {
        match stage {
            PipelineStage::Drafting => Self::Drafting,
            PipelineStage::ComplianceCheck => Self::ComplianceCheck,
            PipelineStage::Finalizing => Self::Finalizing,
        }
    }
}

/// Ordered record of the states one run passed through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTrace {
    states: Vec<PipelineState>,
}

impl StateTrace {
    pub fn start() -> Self {
        Self {
            states: vec![PipelineState::Drafting],
        }
    }

    pub fn current(&self) -> PipelineState {
        self.states
            .last()
            .copied()
            .unwrap_or(PipelineState::Drafting)
    }

    /// Record a transition. Returns `false` (and records nothing) when the
    /// transition is not allowed from the current state.
    pub fn advance(&mut self, next: PipelineState) -> bool {
        let current = self.current();
        if !current.can_transition_to(next) {
            tracing::error!(from = %current, to = %next, "rejected invalid pipeline transition");
            return false;
        }
        self.states.push(next);
        true
    }

    pub fn states(&self) -> &[PipelineState] {
        &self.states
    }

    pub fn into_states(self) -> Vec<PipelineState> {
        self.states
    }
}
