//! `sheaf dev`: the long-running development session.
//!
//! Wires the file watcher to a [`DevSession`] and prints every published update
//! until Ctrl+C.

use std::path::Path;
use std::sync::Arc;

use sheaf_bundler::Bundler;
use sheaf_config::{BuildProfile, EnvFlags, Mode, PartialDevServer};
use tokio::sync::broadcast;
use tracing::warn;

use super::load_config;
use crate::cli::{DevArgs, ProjectOptions};
use crate::dev::{DevSession, DevState, DevUpdate, FileWatcher};
use crate::error::Result;
use crate::ui;

pub async fn execute(args: DevArgs, project: &ProjectOptions) -> Result<()> {
    let mut config = load_config(project)?;
    if args.no_hot {
        config
            .development
            .dev_server
            .get_or_insert_with(PartialDevServer::default)
            .hot = Some(false);
    }
    let profile = config.resolve(Mode::Development, &EnvFlags::from_env());

    let debounce = profile
        .dev_server()
        .map(|server| server.debounce)
        .unwrap_or_default();
    let root = profile.root.clone();
    let ignore = ignore_patterns(&profile);

    let bundler = Bundler::new(profile)?;
    let state = Arc::new(DevState::new());
    let printer = tokio::spawn(print_updates(state.subscribe(), args.json));

    let (watcher, changes) = FileWatcher::new(root, ignore, debounce)?;
    if !args.json {
        ui::info(&format!(
            "Watching {} (Ctrl+C to stop)",
            watcher.root().display()
        ));
    }

    DevSession::new(bundler, Arc::clone(&state))
        .write_overlay(true)
        .run(changes, shutdown_signal())
        .await;

    drop(watcher);
    drop(state);
    let _ = printer.await;
    Ok(())
}

/// Output and manifest locations never trigger rebuilds.
fn ignore_patterns(profile: &BuildProfile) -> Vec<String> {
    let mut patterns = vec!["node_modules".to_string(), "*.map".to_string()];
    let mut generated = vec![profile.output_dir()];
    if let Some(manifest) = profile.manifest_path() {
        generated.push(profile.root.join(manifest));
    }
    for path in generated {
        if let Some(relative) = relative_to(&path, &profile.root) {
            patterns.push(relative);
        }
    }
    patterns
}

fn relative_to(path: &Path, root: &Path) -> Option<String> {
    path.strip_prefix(root)
        .ok()
        .filter(|relative| !relative.as_os_str().is_empty())
        .map(|relative| relative.to_string_lossy().into_owned())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("cannot listen for Ctrl+C: {err}");
        std::future::pending::<()>().await;
    }
}

async fn print_updates(mut updates: broadcast::Receiver<DevUpdate>, json: bool) {
    loop {
        match updates.recv().await {
            Ok(update) => print_update(&update, json),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!("terminal output fell behind; skipped {missed} updates");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_update(update: &DevUpdate, json: bool) {
    if json {
        match serde_json::to_string(update) {
            Ok(line) => println!("{line}"),
            Err(err) => warn!("cannot serialize update: {err}"),
        }
        return;
    }

    let time = ui::format_duration(std::time::Duration::from_millis(update.duration_ms));
    if !update.success {
        for error in &update.errors {
            ui::error(error);
        }
        return;
    }
    match (&update.reason, update.changed.is_empty()) {
        (Some(reason), _) => ui::success(&format!("Rebuilt in {time}, full reload: {reason}")),
        (None, true) if update.full_reload => ui::success(&format!("Built in {time}")),
        (None, _) => ui::success(&format!(
            "Rebuilt {} changed modules in {time}",
            update.changed.len()
        )),
    }
}
