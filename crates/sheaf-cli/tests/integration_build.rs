//! `sheaf build` against real project directories.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use sheaf_cli::cli::{BuildArgs, ModeArg, ProjectOptions};
use sheaf_cli::commands::build;
use sheaf_cli::CliError;
use tempfile::TempDir;

fn project_with_entry(root: &Path) {
    fs::create_dir_all(root.join("client")).unwrap();
    fs::write(
        root.join("client/simple.entry.tsx"),
        "import { greet } from './greet';\ngreet();\n",
    )
    .unwrap();
    fs::write(
        root.join("client/greet.ts"),
        "export function greet() { return 'hello'; }\n",
    )
    .unwrap();
}

fn sheaf(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("sheaf").unwrap();
    cmd.current_dir(root).env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

#[test]
fn build_writes_bundles_and_manifest() {
    let temp = TempDir::new().unwrap();
    project_with_entry(temp.path());

    sheaf(temp.path())
        .arg("build")
        .assert()
        .success()
        .stderr(predicate::str::contains("Build Summary"));

    assert!(temp.path().join("dist/server/assets.json").exists());
    let manifest = fs::read_to_string(temp.path().join("dist/server/assets.json")).unwrap();
    assert!(manifest.contains("\"simple\""));
}

#[test]
fn json_summary_goes_to_stdout() {
    let temp = TempDir::new().unwrap();
    project_with_entry(temp.path());

    sheaf(temp.path())
        .args(["build", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"mode\": \"production\""));
}

#[test]
fn development_build_has_no_manifest() {
    let temp = TempDir::new().unwrap();
    project_with_entry(temp.path());

    sheaf(temp.path())
        .args(["build", "--mode", "dev"])
        .assert()
        .success();

    assert!(!temp.path().join("dist/server/assets.json").exists());
}

#[test]
fn missing_entry_fails_the_build() {
    let temp = TempDir::new().unwrap();

    sheaf(temp.path())
        .arg("build")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("client/simple.entry"));

    assert!(!temp.path().join("dist/server/assets.json").exists());
}

#[test]
fn missing_config_file_is_a_usage_error() {
    let temp = TempDir::new().unwrap();

    sheaf(temp.path())
        .args(["--config", "nope.toml", "build"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nope.toml"));
}

#[test]
fn help_lists_both_commands() {
    Command::cargo_bin("sheaf")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build").and(predicate::str::contains("dev")));
}

#[tokio::test]
async fn build_command_honours_config_file() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    project_with_entry(root);
    fs::write(
        root.join("sheaf.toml"),
        r#"
[production]
output_path = "public/assets"
manifest_path = "public/manifest.json"
"#,
    )
    .unwrap();

    let project = ProjectOptions {
        root: root.to_path_buf(),
        config: None,
    };
    let args = BuildArgs {
        mode: ModeArg::Production,
        json: true,
    };
    build::execute(args, &project).await.unwrap();

    assert!(root.join("public/manifest.json").exists());
    assert!(fs::read_dir(root.join("public/assets")).unwrap().count() > 0);
}

#[tokio::test]
async fn build_command_rejects_missing_root() {
    let project = ProjectOptions {
        root: "/definitely/not/a/project".into(),
        config: None,
    };
    let args = BuildArgs {
        mode: ModeArg::Production,
        json: false,
    };
    let err = build::execute(args, &project).await.unwrap_err();
    assert!(matches!(err, CliError::DirectoryNotFound(_)));
}
