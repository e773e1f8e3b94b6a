//! `sheaf` binary entry point.

use std::process::ExitCode;

use clap::Parser;
use sheaf_cli::{cli, error, logger, ui};

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);

    match sheaf_cli::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", error::cli_error_to_miette(err));
            ExitCode::from(code)
        }
    }
}
