pub mod cli;
pub mod domain;
pub mod infra;
pub mod services;

// Make test_support available for integration tests
// In a real production crate, we might use a feature flag "test-utils"
pub mod test_support;

pub use domain::{
    ContainerRuntime, HarnessError, IntegrationConfig, ProcessHandle, RunSpec, RunningService,
    SPEC_VERSION, Source, SuiteId, TestOutcome, TestSelection,
};
pub use infra::DockerAdapter;
pub use services::{CleanupRegistry, LogMux, Orchestrator, ProbeOptions, TestRunner};
