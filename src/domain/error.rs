//! Terminal failure classes. Everything else travels as a plain
//! `anyhow::Error`; these variants are the ones the top-level exit point
//! recognizes when picking the process exit code.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    /// Missing or invalid `integration.yml`, or a contract version mismatch.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of what is wrong with the configuration.
        message: String,
    },

    /// The image build process exited non-zero. Terminal, no retry.
    #[error("docker build exited with status {status}")]
    BuildFailed {
        /// Exit status reported by the build process.
        status: i32,
    },

    /// The service never opened its port within the probe window.
    #[error("service did not open port {port} within {waited:?}")]
    StartupTimeout {
        /// Host port that was probed.
        port: u16,
        /// How long the prober waited before giving up.
        waited: Duration,
    },
}

impl HarnessError {
    /// Process exit code for this failure class. Test failures are not an
    /// error and map to exit code 1 elsewhere; everything here aborts the
    /// invocation before or during startup.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration { .. } | Self::BuildFailed { .. } | Self::StartupTimeout { .. } => {
                2
            }
        }
    }
}
