use crate::domain::HarnessError;
use crate::infra::config::load_config;
use crate::infra::shell::run_command_list;
use crate::services::LogMux;
use anyhow::Result;
use std::path::Path;

/// Runs the configured publish commands sequentially in the project
/// directory. An empty list fails the whole command.
pub fn run(project_dir: &Path) -> Result<()> {
    let config = load_config(project_dir)?;

    if config.publish.is_empty() {
        return Err(HarnessError::Configuration {
            message: "no publish commands specified in integration.yml".to_string(),
        }
        .into());
    }

    let mux = LogMux::new();
    run_command_list(
        &config.publish,
        &config.project_dir,
        "Running publish task",
        &mux,
    )
}
