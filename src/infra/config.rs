use crate::domain::{HarnessError, IntegrationConfig, SPEC_VERSION};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "integration.yml";

pub fn config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(CONFIG_FILE)
}

/// Loads and validates `integration.yml` from the project directory.
/// Fails before any process is spawned: on a missing file, a parse error,
/// or a contract version mismatch.
pub fn load_config(project_dir: &Path) -> Result<IntegrationConfig> {
    let path = config_path(project_dir);
    if !path.exists() {
        return Err(HarnessError::Configuration {
            message: format!("{CONFIG_FILE} not found in {project_dir:?}"),
        }
        .into());
    }

    let content = fs::read_to_string(&path).with_context(|| format!("reading {path:?}"))?;
    let mut config: IntegrationConfig =
        serde_yml::from_str(&content).map_err(|e| HarnessError::Configuration {
            message: format!("parsing {path:?}: {e}"),
        })?;

    if config.spec_version != SPEC_VERSION {
        return Err(HarnessError::Configuration {
            message: format!(
                "please update the CLI: the integration implements spec_version {} \
                 but this CLI validates {SPEC_VERSION}",
                config.spec_version
            ),
        }
        .into());
    }

    config.project_dir = project_dir.to_path_buf();
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, yaml: &str) {
        fs::write(dir.join(CONFIG_FILE), yaml).unwrap();
    }

    #[test]
    fn loads_matching_spec_version() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            "spec_version: \"0.1.0\"\nslug: example\nbefore_tests:\n  - npm install\npublish:\n  - npm publish\n",
        );

        let config = load_config(dir.path()).unwrap();

        assert_eq!(config.slug, "example");
        assert_eq!(config.image_name(), "test/example");
        assert_eq!(config.before_tests, vec!["npm install".to_string()]);
        assert_eq!(config.publish, vec!["npm publish".to_string()]);
        assert_eq!(config.project_dir, dir.path());
    }

    #[test]
    fn rejects_mismatched_spec_version() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "spec_version: \"9.9.9\"\nslug: example\n");

        let err = load_config(dir.path()).unwrap_err();

        let harness = err.downcast_ref::<HarnessError>().unwrap();
        assert!(matches!(harness, HarnessError::Configuration { .. }));
        assert!(err.to_string().contains("9.9.9"));
    }

    #[test]
    fn rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();

        let err = load_config(dir.path()).unwrap_err();

        assert!(err.to_string().contains(CONFIG_FILE));
    }

    #[test]
    fn rejects_config_without_slug() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "spec_version: \"0.1.0\"\n");

        let err = load_config(dir.path()).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<HarnessError>(),
            Some(HarnessError::Configuration { .. })
        ));
    }

    #[test]
    fn command_lists_default_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "spec_version: \"0.1.0\"\nslug: example\n");

        let config = load_config(dir.path()).unwrap();

        assert!(config.before_tests.is_empty());
        assert!(config.publish.is_empty());
    }
}
