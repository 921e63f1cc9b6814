use super::process::{ProcessHandle, RunSpec};
use anyhow::Result;
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

/// Trait for container runtime operations
pub trait ContainerRuntime: Send + Sync + Debug {
    /// Spawn an image build in `context_dir`, output piped for streaming
    fn spawn_build(&self, image: &str, context_dir: &Path) -> Result<Arc<dyn ProcessHandle>>;

    /// Spawn the service container described by `spec`, output piped
    fn spawn_run(&self, spec: &RunSpec) -> Result<Arc<dyn ProcessHandle>>;

    /// Check if the container binary is available
    fn is_command_available(&self) -> bool;
}
