pub mod echo;
pub mod library;

use crate::domain::Source;
use crate::services::collector::SampleCollector;
use crate::services::log_mux::LogMux;

/// Everything a suite needs to exercise the running service.
pub struct SuiteContext<'a> {
    pub port: u16,
    pub client: &'a reqwest::blocking::Client,
    pub mux: &'a LogMux,
    pub collector: Option<&'a SampleCollector>,
}

impl SuiteContext<'_> {
    pub fn url(&self, path: &str) -> String {
        format!("http://localhost:{}{}", self.port, path)
    }
}

/// Pass/fail tally of one suite execution.
#[derive(Debug, Default)]
pub struct SuiteReport {
    pub passed: u32,
    pub failed: u32,
    pub failures: Vec<String>,
}

impl SuiteReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one assertion outcome and prints its result line.
    pub fn check(&mut self, mux: &LogMux, name: &str, outcome: Result<(), String>) {
        match outcome {
            Ok(()) => {
                self.passed += 1;
                mux.line(Source::TestRunner, &format!("✓ {name}"));
            }
            Err(reason) => {
                self.failed += 1;
                mux.error_line(Source::TestRunner, &format!("✗ {name}: {reason}"));
                self.failures.push(format!("{name}: {reason}"));
            }
        }
    }
}
