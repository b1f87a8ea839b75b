pub mod schema;

pub use schema::{
    BackendConfig, ComplianceMode, Config, ObservabilityConfig, PipelineConfig,
    PolicyConfig, ReliabilityConfig, default_system_guidance,
};
