mod config;
mod selection;

pub mod error;
pub mod process;
pub mod traits;

pub use config::{
    COLLECTOR_PORT, ENV_HOST, ENV_LISTENING, HOST_ALIAS, IntegrationConfig, SERVICE_PORT,
    SPEC_VERSION,
};
pub use error::HarnessError;
pub use process::{Channel, ProcessHandle, ReadinessResult, RunSpec, RunningService, Source};
pub use selection::{SuiteId, TestOutcome, TestSelection};
pub use traits::ContainerRuntime;
