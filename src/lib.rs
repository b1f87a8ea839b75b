#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unnecessary_literal_bound,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod config;
pub mod error;
pub mod gate;
pub mod llm;
pub mod pipeline;
pub mod security;

pub use config::Config;
pub use error::{ConfigError, GateError, PipelineError, PolicyError, Result};
pub use gate::{Gate, Submission};
pub use pipeline::{
    GeneratedText, GenerationRequest, Orchestrator, PipelineFailure, PipelineStage, PipelineState,
};
pub use security::{Decision, PolicyEngine, PolicyHandle, PolicyRules};
