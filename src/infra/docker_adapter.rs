use crate::domain::{ContainerRuntime, ProcessHandle, RunSpec, Source};
use anyhow::{Context, Result, anyhow};
use std::io::Read;
use std::path::Path;
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::host::detect_host_ip;

#[derive(Debug)]
pub struct DockerAdapter;

impl DockerAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DockerAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerRuntime for DockerAdapter {
    fn spawn_build(&self, image: &str, context_dir: &Path) -> Result<Arc<dyn ProcessHandle>> {
        let child = Command::new("docker")
            .args(["build", ".", "-t", image])
            .current_dir(context_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawning docker build for {image}"))?;

        Ok(Arc::new(DockerProcess::new(Source::DockerBuild, child)))
    }

    fn spawn_run(&self, spec: &RunSpec) -> Result<Arc<dyn ProcessHandle>> {
        let mut cmd = Command::new("docker");
        cmd.arg("run");
        cmd.args(["-p", &format!("{}:{}", spec.host_port, spec.container_port)]);

        if let Some(alias) = &spec.host_alias {
            cmd.arg(format!("--add-host={}:{}", alias, detect_host_ip()));
        }

        for (key, value) in &spec.env {
            cmd.args(["-e", &format!("{key}={value}")]);
        }

        cmd.arg(&spec.image);

        let child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawning docker run for {}", spec.image))?;

        Ok(Arc::new(DockerProcess::new(Source::EchoServer, child)))
    }

    fn is_command_available(&self) -> bool {
        Command::new("docker")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

/// A spawned `docker build` or `docker run` child. The child sits behind a
/// mutex because the cleanup registry terminates it from the interrupt
/// thread while the orchestrator polls it from the main thread.
#[derive(Debug)]
pub struct DockerProcess {
    source: Source,
    child: Mutex<Child>,
    stdout: Mutex<Option<ChildStdout>>,
    stderr: Mutex<Option<ChildStderr>>,
    terminated: AtomicBool,
    exited: AtomicBool,
}

impl DockerProcess {
    fn new(source: Source, mut child: Child) -> Self {
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        Self {
            source,
            child: Mutex::new(child),
            stdout: Mutex::new(stdout),
            stderr: Mutex::new(stderr),
            terminated: AtomicBool::new(false),
            exited: AtomicBool::new(false),
        }
    }
}

impl ProcessHandle for DockerProcess {
    fn source(&self) -> Source {
        self.source
    }

    fn take_stdout(&self) -> Option<Box<dyn Read + Send>> {
        self.stdout
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
            .map(|out| Box::new(out) as Box<dyn Read + Send>)
    }

    fn take_stderr(&self) -> Option<Box<dyn Read + Send>> {
        self.stderr
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
            .map(|err| Box::new(err) as Box<dyn Read + Send>)
    }

    fn try_wait(&self) -> Result<Option<i32>> {
        let mut child = self
            .child
            .lock()
            .map_err(|_| anyhow!("child process mutex poisoned"))?;

        match child.try_wait().context("polling child process")? {
            Some(status) => {
                self.exited.store(true, Ordering::SeqCst);
                Ok(Some(status.code().unwrap_or(-1)))
            }
            None => Ok(None),
        }
    }

    fn terminate(&self) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.exited.load(Ordering::SeqCst) {
            return;
        }
        let Ok(child) = self.child.lock() else {
            return;
        };

        // SIGTERM so `docker run` forwards the signal to the container;
        // a plain kill() would SIGKILL the client and orphan it.
        #[cfg(unix)]
        {
            let _ = Command::new("kill")
                .args(["-TERM", &child.id().to_string()])
                .status();
        }
        #[cfg(not(unix))]
        {
            let mut child = child;
            let _ = child.kill();
        }
    }
}
