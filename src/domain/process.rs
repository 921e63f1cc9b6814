use std::fmt::Debug;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use super::config::{ENV_HOST, ENV_LISTENING, HOST_ALIAS, SERVICE_PORT};

/// Origin of a labeled output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    DockerBuild,
    EchoServer,
    TestRunner,
    Helper,
}

impl Source {
    pub fn label(self) -> &'static str {
        match self {
            Self::DockerBuild => "docker-build",
            Self::EchoServer => "echo-server",
            Self::TestRunner => "test-runner",
            Self::Helper => "helper",
        }
    }
}

/// Which output channel of a child process a stream belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Stdout,
    Stderr,
}

/// One spawned external process (build or run).
///
/// Handles are shared between the orchestrator and the cleanup registry, so
/// every method takes `&self`; implementations guard the child internally.
pub trait ProcessHandle: Send + Sync + Debug {
    /// Tag used to label this process's output lines.
    fn source(&self) -> Source;

    /// Takes the stdout reader. Later calls return `None`.
    fn take_stdout(&self) -> Option<Box<dyn Read + Send>>;

    /// Takes the stderr reader. Later calls return `None`.
    fn take_stderr(&self) -> Option<Box<dyn Read + Send>>;

    /// Non-blocking exit check; `Some(code)` once the process has exited.
    fn try_wait(&self) -> Result<Option<i32>>;

    /// Requests termination. Safe from any thread; asking twice has no
    /// additional effect.
    fn terminate(&self);
}

/// How to start the container for the service under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    pub image: String,
    pub host_port: u16,
    pub container_port: u16,
    pub env: Vec<(String, String)>,
    /// Hostname the adapter maps to the host machine's address.
    pub host_alias: Option<String>,
}

impl RunSpec {
    /// Spec for the service under test: binds the fixed internal port and
    /// injects the listening-mode signals plus the host alias.
    pub fn listening(image: &str, host_port: u16) -> Self {
        Self {
            image: image.to_string(),
            host_port,
            container_port: SERVICE_PORT,
            env: vec![
                (ENV_LISTENING.to_string(), "TRUE".to_string()),
                (ENV_HOST.to_string(), HOST_ALIAS.to_string()),
            ],
            host_alias: Some(HOST_ALIAS.to_string()),
        }
    }
}

/// A container confirmed reachable on its bound port.
#[derive(Debug, Clone)]
pub struct RunningService {
    pub port: u16,
    pub handle: Arc<dyn ProcessHandle>,
}

/// Outcome of one readiness probe, consumed once by the orchestrator.
#[derive(Debug, Clone, Copy)]
pub struct ReadinessResult {
    pub open: bool,
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listening_spec_carries_integration_signals() {
        let spec = RunSpec::listening("test/example", 4123);

        assert_eq!(spec.image, "test/example");
        assert_eq!(spec.host_port, 4123);
        assert_eq!(spec.container_port, SERVICE_PORT);
        assert_eq!(spec.host_alias.as_deref(), Some(HOST_ALIAS));
        assert!(
            spec.env
                .contains(&(ENV_LISTENING.to_string(), "TRUE".to_string()))
        );
        assert!(
            spec.env
                .contains(&(ENV_HOST.to_string(), HOST_ALIAS.to_string()))
        );
    }
}
