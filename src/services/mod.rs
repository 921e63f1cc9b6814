pub mod cleanup;
pub mod collector;
pub mod log_mux;
pub mod orchestrator;
pub mod prober;
pub mod runner;
pub mod suites;

pub use cleanup::{CleanupRegistry, INTERRUPT_EXIT_CODE, install_interrupt_handler};
pub use collector::{Sample, SampleCollector};
pub use log_mux::LogMux;
pub use orchestrator::Orchestrator;
pub use prober::{ProbeOptions, wait_for_port};
pub use runner::TestRunner;
