use crate::domain::ProcessHandle;
use crate::services::collector::SampleCollector;
use anyhow::{Context, Result};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Exit code used when an operator interrupt ends the invocation.
pub const INTERRUPT_EXIT_CODE: i32 = 130;

/// Per-invocation finalizer state. Holds at most one live child process
/// (the build, then the running container) and at most one sample
/// collector. `cleanup` drains both exactly once; afterwards the registry
/// is closed and anything registered late is terminated on the spot, so an
/// interrupt can never race a spawn into a leaked child.
pub struct CleanupRegistry {
    container: Mutex<Option<Arc<dyn ProcessHandle>>>,
    collector: Mutex<Option<Arc<SampleCollector>>>,
    closed: AtomicBool,
}

impl CleanupRegistry {
    pub fn new() -> Self {
        Self {
            container: Mutex::new(None),
            collector: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Registers the current child process, replacing any previous one.
    /// Must be called synchronously after spawning, before any wait.
    pub fn register_container(&self, handle: Arc<dyn ProcessHandle>) {
        if self.closed.load(Ordering::SeqCst) {
            handle.terminate();
            return;
        }
        if let Ok(mut slot) = self.container.lock() {
            *slot = Some(handle);
        }
    }

    pub fn register_collector(&self, collector: Arc<SampleCollector>) {
        if self.closed.load(Ordering::SeqCst) {
            collector.stop();
            return;
        }
        if let Ok(mut slot) = self.collector.lock() {
            *slot = Some(collector);
        }
    }

    /// Terminates whatever is registered and returns immediately, without
    /// waiting for the children to confirm shutdown. Repeated calls are
    /// no-ops.
    pub fn cleanup(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(handle) = self.container.lock().ok().and_then(|mut slot| slot.take()) {
            info!("terminating {}", handle.source().label());
            handle.terminate();
        } else {
            debug!("no child process registered, nothing to terminate");
        }

        if let Some(collector) = self.collector.lock().ok().and_then(|mut slot| slot.take()) {
            collector.stop();
        }
    }
}

impl Default for CleanupRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Routes Ctrl+C through the registry and ends the process. The handler
/// only issues termination requests; it never waits.
pub fn install_interrupt_handler(registry: Arc<CleanupRegistry>) -> Result<()> {
    ctrlc::set_handler(move || {
        registry.cleanup();
        process::exit(INTERRUPT_EXIT_CODE);
    })
    .context("installing Ctrl+C handler")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Source;
    use crate::test_support::MockProcess;

    #[test]
    fn cleanup_terminates_the_registered_process_once() {
        let registry = CleanupRegistry::new();
        let process = MockProcess::running(Source::EchoServer);
        registry.register_container(process.clone());

        registry.cleanup();
        registry.cleanup();
        registry.cleanup();

        assert_eq!(process.termination_count(), 1);
    }

    #[test]
    fn cleanup_with_nothing_registered_is_a_no_op() {
        let registry = CleanupRegistry::new();
        registry.cleanup();
    }

    #[test]
    fn replacing_the_slot_targets_the_latest_process() {
        let registry = CleanupRegistry::new();
        let build = MockProcess::finished(Source::DockerBuild, 0);
        let run = MockProcess::running(Source::EchoServer);

        registry.register_container(build.clone());
        registry.register_container(run.clone());
        registry.cleanup();

        assert_eq!(build.termination_count(), 0);
        assert_eq!(run.termination_count(), 1);
    }

    #[test]
    fn late_registration_after_cleanup_is_terminated_immediately() {
        let registry = CleanupRegistry::new();
        registry.cleanup();

        let late = MockProcess::running(Source::EchoServer);
        registry.register_container(late.clone());

        assert_eq!(late.termination_count(), 1);
    }
}
