use crate::domain::{HarnessError, SERVICE_PORT};
use crate::infra::DockerAdapter;
use crate::infra::config::load_config;
use crate::services::{CleanupRegistry, LogMux, Orchestrator};
use anyhow::Result;
use clap::Args;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct RunDockerArgs {
    /// Host port the echo server is bound to
    #[arg(short, long, default_value_t = SERVICE_PORT)]
    pub port: u16,
}

/// Builds and starts the service under test, then stays in the foreground
/// until Ctrl+C or until the container exits on its own.
pub fn run(args: RunDockerArgs, project_dir: &Path, registry: &Arc<CleanupRegistry>) -> Result<()> {
    let config = load_config(project_dir)?;
    let runtime = Arc::new(DockerAdapter::new());
    ensure_docker(&*runtime)?;

    let mux = Arc::new(LogMux::new());
    let orchestrator = Orchestrator::new(runtime, mux.clone(), registry.clone());
    let service = orchestrator.build_and_run(&config, args.port)?;

    println!("Echo server listening on port {}. Press Ctrl+C to stop.", service.port);
    loop {
        if let Some(code) = service.handle.try_wait()? {
            println!("Container exited with status {code}");
            return Ok(());
        }
        thread::sleep(Duration::from_millis(250));
    }
}

pub(crate) fn ensure_docker(runtime: &dyn crate::domain::ContainerRuntime) -> Result<()> {
    if !runtime.is_command_available() {
        return Err(HarnessError::Configuration {
            message: "docker was not found on the PATH".to_string(),
        }
        .into());
    }
    Ok(())
}
