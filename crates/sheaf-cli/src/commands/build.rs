//! `sheaf build`.

use sheaf_bundler::{BuildSnapshot, Bundler};
use sheaf_config::{EnvFlags, Mode};
use tracing::debug;

use super::load_config;
use crate::cli::{BuildArgs, ProjectOptions};
use crate::error::Result;
use crate::ui;

pub async fn execute(args: BuildArgs, project: &ProjectOptions) -> Result<()> {
    let mode = Mode::from(args.mode);
    let profile = load_config(project)?.resolve(mode, &EnvFlags::from_env());
    debug!(?profile, "resolved profile");

    let entries = profile.entries.len();
    let bundler = Bundler::new(profile)?;
    if !args.json {
        ui::info(&format!("Building {entries} entries in {mode} mode"));
    }

    let snapshot = bundler.build().await?;
    report(&snapshot, mode, args.json)
}

fn report(snapshot: &BuildSnapshot, mode: Mode, json: bool) -> Result<()> {
    for warning in &snapshot.warnings {
        ui::warning(&warning.to_string());
    }
    for hint in &snapshot.hints {
        ui::warning(&hint.to_string());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot.summary(mode))?);
        return Ok(());
    }

    ui::print_build_summary(snapshot);
    ui::success(&format!(
        "Built {} files in {}",
        snapshot.written.len(),
        ui::format_duration(snapshot.duration)
    ));
    Ok(())
}
