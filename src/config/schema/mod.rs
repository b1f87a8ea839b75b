mod backend;
mod core;
mod observability;
mod pipeline;
mod policy;

pub use backend::BackendConfig;
pub use self::core::{Config, ReliabilityConfig};
pub use observability::ObservabilityConfig;
pub use pipeline::{ComplianceMode, PipelineConfig, default_system_guidance};
pub use policy::PolicyConfig;
