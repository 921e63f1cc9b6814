use anyhow::Result;
use clap::{Parser, Subcommand};
use optic_integration::cli;
use optic_integration::domain::{HarnessError, TestSelection};
use optic_integration::services::{CleanupRegistry, install_interrupt_handler};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "optic-integration",
    version,
    about = "Conformance harness for runtime library integrations"
)]
struct Cli {
    /// Project directory containing integration.yml and the Dockerfile
    #[arg(long, env = "OPTIC_PROJECT_DIR", default_value = ".")]
    project_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copies the integration boilerplate into ./output
    Init,
    /// Builds and starts the service under test, leaving it running
    RunDocker(cli::RunDockerArgs),
    /// Runs the echo-behavior suite against the service
    TestEcho,
    /// Runs the library-conformance suite against the service
    TestLibrary,
    /// Runs every suite
    TestAll,
    /// Runs the configured publish commands
    Publish,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Cli::parse();

    let registry = Arc::new(CleanupRegistry::new());
    if let Err(err) = install_interrupt_handler(registry.clone()) {
        eprintln!("warning: {err:#}");
    }

    // Single exit point: every path runs cleanup exactly once before the
    // process ends, and the failure class picks the code.
    let outcome = dispatch(args, &registry);
    registry.cleanup();

    let code = match outcome {
        Ok(0) => 0,
        Ok(_) => 1,
        Err(err) => {
            eprintln!("error: {err:#}");
            err.downcast_ref::<HarnessError>()
                .map(HarnessError::exit_code)
                .unwrap_or(2)
        }
    };
    process::exit(code);
}

fn dispatch(args: Cli, registry: &Arc<CleanupRegistry>) -> Result<u32> {
    let project_dir = PathBuf::from(shellexpand::tilde(&args.project_dir).into_owned());

    match args.command {
        Commands::Init => {
            cli::init::run()?;
            Ok(0)
        }
        Commands::RunDocker(docker_args) => {
            cli::docker::run(docker_args, &project_dir, registry)?;
            Ok(0)
        }
        Commands::TestEcho => cli::test::run(TestSelection::echo_only(), &project_dir, registry),
        Commands::TestLibrary => {
            cli::test::run(TestSelection::library_only(), &project_dir, registry)
        }
        Commands::TestAll => cli::test::run(TestSelection::all(), &project_dir, registry),
        Commands::Publish => {
            cli::publish::run(&project_dir)?;
            Ok(0)
        }
    }
}
