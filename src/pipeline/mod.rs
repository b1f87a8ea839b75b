mod compliance;
mod orchestrator;
mod progress;
mod schema;
mod state;
mod types;

pub use compliance::{
    AffirmingCheck, COMPLIANCE_TOOL_NAME, ComplianceCheck, ComplianceVerdict, PolicyRecheck,
    ToolInvocation, compliance_tool_spec,
};
pub use orchestrator::Orchestrator;
pub use progress::{CliProgressSink, NullProgressSink, ProgressSink, RecordingProgressSink};
pub use schema::OutputSchema;
pub use state::{PipelineStage, PipelineState, StateTrace};
pub use types::{GeneratedText, GenerationRequest, PipelineFailure};
