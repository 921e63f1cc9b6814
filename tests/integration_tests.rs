use optic_integration::domain::{
    ENV_HOST, ENV_LISTENING, HarnessError, HOST_ALIAS, RunSpec, SERVICE_PORT, SuiteId,
    TestSelection,
};
use optic_integration::infra::config::load_config;
use std::fs;
use std::time::Duration;

#[test]
fn test_config_loads_from_project_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("integration.yml"),
        "spec_version: \"0.1.0\"\nslug: node-sdk\nbefore_tests:\n  - npm install\n  - npm run build\npublish:\n  - npm publish\n",
    )
    .unwrap();

    let config = load_config(dir.path()).unwrap();

    assert_eq!(config.slug, "node-sdk");
    assert_eq!(config.image_name(), "test/node-sdk");
    assert_eq!(config.before_tests.len(), 2);
    assert_eq!(config.publish, vec!["npm publish".to_string()]);
    assert_eq!(config.project_dir, dir.path());
}

#[test]
fn test_version_mismatch_fails_before_any_process_spawns() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("integration.yml"),
        "spec_version: \"2.0.0\"\nslug: node-sdk\n",
    )
    .unwrap();

    let err = load_config(dir.path()).unwrap_err();

    let harness = err.downcast_ref::<HarnessError>().unwrap();
    assert!(matches!(harness, HarnessError::Configuration { .. }));
    assert_eq!(harness.exit_code(), 2);
}

#[test]
fn test_run_spec_conversion() {
    let spec = RunSpec::listening("test/node-sdk", 4000);

    assert_eq!(spec.image, "test/node-sdk");
    assert_eq!(spec.host_port, 4000);
    assert_eq!(spec.container_port, SERVICE_PORT);
    assert_eq!(spec.host_alias.as_deref(), Some(HOST_ALIAS));
    assert_eq!(spec.env.len(), 2);
    assert!(
        spec.env
            .contains(&(ENV_LISTENING.to_string(), "TRUE".to_string()))
    );
    assert!(
        spec.env
            .contains(&(ENV_HOST.to_string(), HOST_ALIAS.to_string()))
    );
}

#[test]
fn test_selection_resolution() {
    assert_eq!(TestSelection::echo_only().resolve(), vec![SuiteId::Echo]);
    assert_eq!(
        TestSelection::library_only().resolve(),
        vec![SuiteId::Library]
    );
    assert_eq!(
        TestSelection::all().resolve(),
        vec![SuiteId::Echo, SuiteId::Library]
    );
    assert!(TestSelection::default().resolve().is_empty());
}

#[test]
fn test_terminal_failures_map_to_exit_code_two() {
    let errors = [
        HarnessError::Configuration {
            message: "integration.yml not found".to_string(),
        },
        HarnessError::BuildFailed { status: 1 },
        HarnessError::StartupTimeout {
            port: 4000,
            waited: Duration::from_secs(30),
        },
    ];

    for error in errors {
        assert_eq!(error.exit_code(), 2);
    }
}
