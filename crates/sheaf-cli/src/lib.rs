//! Sheaf CLI: `sheaf build` and `sheaf dev`.
//!
//! - [`cli`] - argument parsing
//! - [`commands`] - command implementations
//! - [`dev`] - the incremental development session
//! - [`error`] - CLI errors and their miette rendering
//! - [`logger`] - tracing subscriber setup
//! - [`ui`] - terminal output

pub mod cli;
pub mod commands;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, Result};

/// Dispatch a parsed command line.
pub async fn run(args: cli::Cli) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let project = args.project(&cwd);
    match args.command {
        cli::Command::Build(build_args) => commands::build_execute(build_args, &project).await,
        cli::Command::Dev(dev_args) => commands::dev_execute(dev_args, &project).await,
    }
}
