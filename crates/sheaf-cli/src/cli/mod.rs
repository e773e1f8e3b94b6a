//! Command-line interface definition.
//!
//! - `sheaf build --mode <development|production>` runs one build and exits.
//! - `sheaf dev` runs the development session until interrupted.

mod commands;

use std::path::{Path, PathBuf};

use clap::Parser;

pub use commands::{BuildArgs, Command, DevArgs, ModeArg};

/// Sheaf - entry-based bundler with content-addressed output
#[derive(Parser, Debug)]
#[command(
    name = "sheaf",
    version,
    about = "Bundle web client entries into content-addressed chunks",
    long_about = "Sheaf resolves a build profile for the selected mode, splits the module graph\n\
                  into initial, async and shared chunks, and writes fingerprinted bundles plus an\n\
                  entry manifest for the server-side renderer."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Config file (defaults to sheaf.toml or sheaf.json in the project root)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Project root (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Where the project lives and which config file to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectOptions {
    pub root: PathBuf,
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Project options with relative paths anchored at `cwd`.
    pub fn project(&self, cwd: &Path) -> ProjectOptions {
        let root = match &self.cwd {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => cwd.join(dir),
            None => cwd.to_path_buf(),
        };
        let config = self.config.as_ref().map(|path| {
            if path.is_absolute() {
                path.clone()
            } else {
                cwd.join(path)
            }
        });
        ProjectOptions { root, config }
    }
}
