use std::collections::BTreeMap;
use std::time::Duration;

use thiserror::Error;

use crate::pipeline::{PipelineFailure, PipelineStage};

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `promptgate`.
///
/// Each subsystem defines its own error variant. Callers match on these to
/// decide recovery strategy: a [`PolicyError::Denied`] invites the user to
/// rephrase, everything under [`PipelineError`] is a generation failure.
#[derive(Debug, Error)]
pub enum GateError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Policy ───────────────────────────────────────────────────────────
    #[error("policy: {0}")]
    Policy(#[from] PolicyError),

    // ── Pipeline ─────────────────────────────────────────────────────────
    #[error("pipeline: {0}")]
    Pipeline(#[from] PipelineFailure),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GateError {
    /// True when the request was refused by local policy and can be
    /// rephrased and resubmitted.
    pub fn is_policy_denied(&self) -> bool {
        matches!(self, Self::Policy(PolicyError::Denied { .. }))
    }

    /// The pipeline error, when generation (not admission) failed.
    pub fn pipeline_error(&self) -> Option<&PipelineError> {
        match self {
            Self::Pipeline(failure) => Some(&failure.error),
            _ => None,
        }
    }
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load {what}: {message}")]
    Load { what: String, message: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Policy errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PolicyError {
    /// The request matched one or more violation categories.
    #[error("request denied by policy ({})", format_categories(.matches))]
    Denied {
        matches: BTreeMap<String, Vec<String>>,
    },
}

fn format_categories(matches: &BTreeMap<String, Vec<String>>) -> String {
    matches.keys().cloned().collect::<Vec<_>>().join(", ")
}

// ─── Pipeline errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("backend call failed during {stage}: {message}")]
    BackendCallFailed {
        stage: PipelineStage,
        message: String,
    },

    /// The backend answered, but not in a shape the stage can use.
    #[error("malformed backend response during {stage}: {reason}")]
    MalformedResponse {
        stage: PipelineStage,
        reason: String,
    },

    /// The caller-supplied output schema is unusable.
    #[error("invalid output schema: {reason}")]
    InvalidSchema { reason: String },

    #[error("compliance check rejected the draft: {reason}")]
    ComplianceRejected { reason: String },

    #[error("compliance check could not run: {message}")]
    ComplianceUnavailable { message: String },

    #[error("cancelled during {stage}")]
    Cancelled { stage: PipelineStage },

    #[error("{stage} timed out after {limit:?}")]
    Timeout {
        stage: PipelineStage,
        limit: Duration,
    },
}

impl PipelineError {
    /// Stage at which the failure happened, when it is tied to one.
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            Self::BackendCallFailed { stage, .. }
            | Self::MalformedResponse { stage, .. }
            | Self::Cancelled { stage }
            | Self::Timeout { stage, .. } => Some(*stage),
            Self::ComplianceRejected { .. } | Self::ComplianceUnavailable { .. } => {
                Some(PipelineStage::ComplianceCheck)
            }
            Self::InvalidSchema { .. } => None,
        }
    }
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, GateError>;
