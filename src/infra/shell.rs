use crate::domain::Source;
use crate::services::LogMux;
use anyhow::{Context, Result, bail};
use std::path::Path;
use std::process::Command;

/// Runs a configured command list sequentially in `dir` through `sh -c`.
/// The first failing command aborts the rest of the list.
pub fn run_command_list(commands: &[String], dir: &Path, task: &str, mux: &LogMux) -> Result<()> {
    if commands.is_empty() {
        return Ok(());
    }

    mux.line(Source::Helper, task);

    for command in commands {
        mux.line(Source::Helper, command);
        let status = Command::new("sh")
            .args(["-c", command])
            .current_dir(dir)
            .status()
            .with_context(|| format!("running `{command}` in {dir:?}"))?;

        if !status.success() {
            bail!("command `{command}` exited with status {status}");
        }
    }

    Ok(())
}
