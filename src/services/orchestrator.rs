use crate::domain::{
    ContainerRuntime, HarnessError, IntegrationConfig, ProcessHandle, RunSpec, RunningService,
    Source,
};
use crate::services::cleanup::CleanupRegistry;
use crate::services::log_mux::LogMux;
use crate::services::prober::{ProbeOptions, wait_for_port};
use anyhow::Result;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error};

/// Sequences build -> run -> probe and owns the single running container's
/// process handle for the invocation.
pub struct Orchestrator {
    runtime: Arc<dyn ContainerRuntime>,
    mux: Arc<LogMux>,
    registry: Arc<CleanupRegistry>,
    probe: ProbeOptions,
    settle: Duration,
    poll_interval: Duration,
}

impl Orchestrator {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        mux: Arc<LogMux>,
        registry: Arc<CleanupRegistry>,
    ) -> Self {
        Self {
            runtime,
            mux,
            registry,
            probe: ProbeOptions {
                quiet: true,
                ..ProbeOptions::default()
            },
            settle: Duration::from_millis(500),
            poll_interval: Duration::from_millis(100),
        }
    }

    /// Overrides the readiness probe window.
    pub fn with_probe(mut self, probe: ProbeOptions) -> Self {
        self.probe = probe;
        self
    }

    /// Overrides the post-readiness settle delay.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Builds the integration image and starts the service under test,
    /// resolving once its port accepts connections.
    ///
    /// Both failure paths are terminal for the invocation: a failed build
    /// never starts the container, and a startup timeout leaves the spawned
    /// container registered so cleanup still terminates it.
    pub fn build_and_run(&self, config: &IntegrationConfig, port: u16) -> Result<RunningService> {
        let image = config.image_name();

        self.mux.line(Source::DockerBuild, "Running docker build...");
        let build = self.runtime.spawn_build(&image, &config.project_dir)?;
        self.registry.register_container(build.clone());
        let readers = self.mux.attach(build.as_ref());

        let status = self.wait_for_exit(build.as_ref())?;
        for reader in readers {
            let _ = reader.join();
        }
        if status != 0 {
            error!("docker build for {image} exited with status {status}");
            self.mux
                .error_line(Source::DockerBuild, "Unable to build docker container");
            return Err(HarnessError::BuildFailed { status }.into());
        }

        self.mux.line(
            Source::EchoServer,
            &format!("Starting echo server on port {port}..."),
        );
        let spec = RunSpec::listening(&image, port);
        let run = self.runtime.spawn_run(&spec)?;
        self.registry.register_container(run.clone());
        let _ = self.mux.attach(run.as_ref());

        let readiness = wait_for_port(port, self.probe);
        if !readiness.open {
            error!(
                "service never opened port {port} (waited {:?})",
                readiness.elapsed
            );
            return Err(HarnessError::StartupTimeout {
                port,
                waited: readiness.elapsed,
            }
            .into());
        }

        debug!("port {port} open after {:?}", readiness.elapsed);
        // The port accepting connections can precede the service's own
        // startup finishing; give it a moment before hammering it.
        thread::sleep(self.settle);

        Ok(RunningService { port, handle: run })
    }

    fn wait_for_exit(&self, handle: &dyn ProcessHandle) -> Result<i32> {
        loop {
            if let Some(code) = handle.try_wait()? {
                return Ok(code);
            }
            thread::sleep(self.poll_interval);
        }
    }
}
