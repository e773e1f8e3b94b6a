use clap::{Args, Subcommand, ValueEnum};
use sheaf_config::Mode;

/// Available sheaf subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build every entry once
    ///
    /// Production builds fail on the first broken module set and list every
    /// error; the manifest is written only when the whole build succeeds.
    Build(BuildArgs),

    /// Start the development session
    ///
    /// Builds once, then rebuilds the invalidated subgraph on every file change
    /// and publishes an update per rebuild.
    Dev(DevArgs),
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Mode to resolve the build profile for
    #[arg(short, long, value_enum, default_value = "production")]
    pub mode: ModeArg,

    /// Print the build summary as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct DevArgs {
    /// Always signal a full reload instead of hot updates
    #[arg(long)]
    pub no_hot: bool,

    /// Print each update as a JSON line on stdout
    #[arg(long)]
    pub json: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum ModeArg {
    /// Unhashed per-entry bundles, eval source maps, no manifest
    #[value(name = "development", alias = "dev")]
    Development,

    /// Split, minified, fingerprinted output plus manifest
    #[value(name = "production", alias = "prod")]
    Production,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Development => Mode::Development,
            ModeArg::Production => Mode::Production,
        }
    }
}
