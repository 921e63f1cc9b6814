use crate::domain::{
    COLLECTOR_PORT, IntegrationConfig, RunningService, SPEC_VERSION, Source, SuiteId, TestOutcome,
    TestSelection,
};
use crate::services::cleanup::CleanupRegistry;
use crate::services::collector::SampleCollector;
use crate::services::log_mux::LogMux;
use crate::services::suites::{self, SuiteContext, SuiteReport};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

type SuiteFn = fn(&SuiteContext) -> SuiteReport;

/// Static registry of runnable suites, in execution order.
const SUITES: &[(SuiteId, SuiteFn)] = &[
    (SuiteId::Echo, suites::echo::run),
    (SuiteId::Library, suites::library::run),
];

/// Executes the selected conformance suites against a ready service and
/// aggregates their failures. Never terminates the process itself.
pub struct TestRunner {
    mux: Arc<LogMux>,
    registry: Arc<CleanupRegistry>,
    collector_port: u16,
}

impl TestRunner {
    pub fn new(mux: Arc<LogMux>, registry: Arc<CleanupRegistry>) -> Self {
        Self {
            mux,
            registry,
            collector_port: COLLECTOR_PORT,
        }
    }

    /// Overrides the sample collector port.
    pub fn with_collector_port(mut self, port: u16) -> Self {
        self.collector_port = port;
        self
    }

    pub fn run(
        &self,
        selection: TestSelection,
        service: &RunningService,
        config: &IntegrationConfig,
    ) -> Result<TestOutcome> {
        let suites = selection.resolve();
        if suites.is_empty() {
            return Ok(TestOutcome { failures: 0 });
        }

        self.mux.line(
            Source::TestRunner,
            &format!(
                "Testing whether {} conforms to runtime library contract {SPEC_VERSION}",
                config.slug
            ),
        );

        let collector = if suites.contains(&SuiteId::Library) {
            let collector = Arc::new(
                SampleCollector::start(self.collector_port).context("starting sample collector")?,
            );
            self.registry.register_collector(collector.clone());
            Some(collector)
        } else {
            None
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(100))
            .build()
            .context("building http client")?;

        let mut passed = 0;
        let mut failures = 0;
        for id in suites {
            let Some((_, run_suite)) = SUITES.iter().find(|(suite, _)| *suite == id) else {
                continue;
            };

            self.mux
                .line(Source::TestRunner, &format!("Running {} suite", id.name()));
            let ctx = SuiteContext {
                port: service.port,
                client: &client,
                mux: &self.mux,
                collector: collector.as_deref(),
            };
            let report = run_suite(&ctx);

            self.mux.line(
                Source::TestRunner,
                &format!(
                    "{} suite: {} passed, {} failed",
                    id.name(),
                    report.passed,
                    report.failed
                ),
            );
            passed += report.passed;
            failures += report.failed;
        }

        if let Some(collector) = collector {
            collector.stop();
        }

        self.mux.line(
            Source::TestRunner,
            &format!("{passed} passing, {failures} failing"),
        );
        Ok(TestOutcome { failures })
    }
}
