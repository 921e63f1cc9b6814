use serde::Deserialize;
use std::path::PathBuf;

/// Contract version this CLI validates. Integrations declare the version they
/// implement in their `integration.yml`; anything else is rejected up front.
pub const SPEC_VERSION: &str = "0.1.0";

/// Port the service under test must listen on inside its container.
pub const SERVICE_PORT: u16 = 4000;

/// Hostname injected into the container that resolves to the host machine.
pub const HOST_ALIAS: &str = "testhost";

/// Environment flag telling the service it runs in listening integration mode.
pub const ENV_LISTENING: &str = "OPTIC_SERVER_LISTENING";

/// Environment variable carrying the hostname the service should report to.
pub const ENV_HOST: &str = "OPTIC_SERVER_HOST";

/// Host port where the sample collector listens during library runs.
pub const COLLECTOR_PORT: u16 = 30333;

/// Contents of a project's `integration.yml`, immutable once loaded.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct IntegrationConfig {
    pub spec_version: String,
    pub slug: String,
    #[serde(default)]
    pub before_tests: Vec<String>,
    #[serde(default)]
    pub publish: Vec<String>,
    /// Directory the config was loaded from; build context and command cwd.
    #[serde(skip)]
    pub project_dir: PathBuf,
}

impl IntegrationConfig {
    /// Tag of the image built for this integration.
    pub fn image_name(&self) -> String {
        format!("test/{}", self.slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_image_name_from_slug() {
        let config = IntegrationConfig {
            spec_version: SPEC_VERSION.to_string(),
            slug: "example".to_string(),
            before_tests: vec![],
            publish: vec![],
            project_dir: PathBuf::new(),
        };

        assert_eq!(config.image_name(), "test/example");
    }
}
