use anyhow::Result;
use optic_integration::domain::{
    HarnessError, IntegrationConfig, SPEC_VERSION, Source,
};
use optic_integration::services::{CleanupRegistry, LogMux, Orchestrator, ProbeOptions};
use optic_integration::test_support::{MockProcess, MockRuntime};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn example_config() -> IntegrationConfig {
    IntegrationConfig {
        spec_version: SPEC_VERSION.to_string(),
        slug: "example".to_string(),
        before_tests: vec![],
        publish: vec![],
        project_dir: PathBuf::from("."),
    }
}

fn create_orchestrator() -> (Orchestrator, Arc<MockRuntime>, Arc<CleanupRegistry>) {
    let mock = Arc::new(MockRuntime::new());
    let registry = Arc::new(CleanupRegistry::new());
    let orchestrator = Orchestrator::new(
        mock.clone(),
        Arc::new(LogMux::discard()),
        registry.clone(),
    )
    .with_probe(ProbeOptions {
        timeout: Duration::from_millis(300),
        interval: Duration::from_millis(20),
        quiet: true,
    })
    .with_settle(Duration::ZERO);
    (orchestrator, mock, registry)
}

#[test]
fn test_interrupt_during_build_terminates_the_build_process() {
    // An interrupt while the image is still building must reach the build
    // process and prevent the run phase entirely.
    let (orchestrator, mock, registry) = create_orchestrator();
    let build = MockProcess::running(Source::DockerBuild);
    mock.set_build_process(build.clone());

    let interrupter = {
        let registry = registry.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            registry.cleanup();
        })
    };

    let started = Instant::now();
    let err = orchestrator
        .build_and_run(&example_config(), 4000)
        .unwrap_err();
    interrupter.join().unwrap();

    assert!(
        started.elapsed() < Duration::from_secs(2),
        "build wait did not unblock after termination"
    );
    assert_eq!(build.termination_count(), 1);
    assert!(matches!(
        err.downcast_ref::<HarnessError>(),
        Some(HarnessError::BuildFailed { .. })
    ));
    assert!(!mock.get_commands().iter().any(|c| c.starts_with("run:")));
}

#[test]
fn test_repeated_cleanup_terminates_exactly_once() {
    let registry = CleanupRegistry::new();
    let process = MockProcess::running(Source::EchoServer);
    registry.register_container(process.clone());

    for _ in 0..5 {
        registry.cleanup();
    }

    assert_eq!(process.termination_count(), 1);
}

#[test]
fn test_concurrent_cleanup_calls_do_not_double_terminate() {
    let registry = Arc::new(CleanupRegistry::new());
    let process = MockProcess::running(Source::EchoServer);
    registry.register_container(process.clone());

    let mut workers = Vec::new();
    for _ in 0..8 {
        let registry = registry.clone();
        workers.push(thread::spawn(move || registry.cleanup()));
    }
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(process.termination_count(), 1);
}

#[test]
fn test_startup_timeout_does_not_hang() -> Result<()> {
    // The probe window is 300ms here; the whole attempt must stay well
    // under a second even though nothing ever listens.
    let (orchestrator, mock, _registry) = create_orchestrator();
    mock.set_run_process(MockProcess::running(Source::EchoServer));

    let started = Instant::now();
    let result = orchestrator.build_and_run(&example_config(), 1);
    let elapsed = started.elapsed();

    assert!(result.is_err());
    assert!(elapsed < Duration::from_secs(2), "probe loop hung too long");
    assert!(
        elapsed >= Duration::from_millis(250),
        "probe gave up before its window"
    );
    Ok(())
}
