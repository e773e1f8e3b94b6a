use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use sheaf_config::EngineConfig;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{EngineError, TransformEngine, TransformInput, TransformOutput};

/// External program used as an engine.
///
/// The module's code is written to stdin; stdout becomes the new code. The module id,
/// mode and descriptor options are passed as `SHEAF_MODULE`, `SHEAF_MODE` and
/// `SHEAF_OPTIONS` (JSON). The child is killed when the transform is dropped, which
/// is what happens on timeout.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    name: String,
    command: String,
    args: Vec<String>,
    cwd: PathBuf,
    timeout: Option<Duration>,
}

impl CommandEngine {
    pub fn new(name: impl Into<String>, command: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            timeout: None,
        }
    }

    pub fn from_config(name: &str, config: &EngineConfig, cwd: &Path) -> Self {
        Self {
            name: name.to_string(),
            command: config.command.clone(),
            args: config.args.clone(),
            cwd: cwd.to_path_buf(),
            timeout: config.timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl TransformEngine for CommandEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn transform(&self, input: TransformInput) -> Result<TransformOutput, EngineError> {
        let spawn_error = |source| EngineError::Spawn {
            command: self.command.clone(),
            source,
        };

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .current_dir(&self.cwd)
            .env("SHEAF_MODULE", input.module.as_str())
            .env("SHEAF_MODE", input.mode.as_str())
            .env("SHEAF_OPTIONS", input.options.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_error)?;

        // Feed stdin from a separate task so a chatty child cannot fill its stdout
        // pipe while we are still writing.
        let code = input.code;
        let writer = child.stdin.take().map(|mut stdin| {
            tokio::spawn(async move { stdin.write_all(code.as_bytes()).await })
        });

        let output = child.wait_with_output().await.map_err(spawn_error)?;
        if let Some(writer) = writer {
            match writer.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) if err.kind() == std::io::ErrorKind::BrokenPipe => {}
                Ok(Err(err)) => return Err(spawn_error(err)),
                Err(join_err) => return Err(EngineError::Failed(join_err.to_string())),
            }
        }
        debug!(
            engine = %self.name,
            module = %input.module,
            status = ?output.status.code(),
            "command engine finished"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = match stderr.trim() {
                "" => format!("'{}' exited with {}", self.command, output.status),
                text => text.to_string(),
            };
            return Err(EngineError::Failed(message));
        }

        let code = String::from_utf8(output.stdout).map_err(|_| EngineError::InvalidUtf8)?;
        Ok(TransformOutput {
            code,
            kind: input.kind,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use serde_json::Value;
    use sheaf_config::Mode;
    use sheaf_graph::ModuleId;

    use super::*;
    use crate::engines::ContentKind;

    fn input(code: &str) -> TransformInput {
        TransformInput {
            module: ModuleId::new("client/a.js").unwrap(),
            code: code.to_string(),
            kind: ContentKind::Script,
            options: Value::Null,
            mode: Mode::Production,
        }
    }

    #[tokio::test]
    async fn stdin_is_piped_to_stdout() {
        let engine = CommandEngine::new("upper", "tr", std::env::temp_dir()).args(["a-z", "A-Z"]);
        let out = engine.transform(input("let a = 1;\n")).await.unwrap();
        assert_eq!(out.code, "LET A = 1;\n");
        assert_eq!(out.kind, ContentKind::Script);
    }

    #[tokio::test]
    async fn non_zero_exit_reports_stderr() {
        let engine = CommandEngine::new("broken", "sh", std::env::temp_dir())
            .args(["-c", "echo 'unexpected token' >&2; exit 3"]);
        let err = engine.transform(input("x")).await.unwrap_err();
        assert_eq!(err.to_string(), "unexpected token");
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let engine = CommandEngine::new("ghost", "sheaf-no-such-binary", std::env::temp_dir());
        let err = engine.transform(input("x")).await.unwrap_err();
        assert!(matches!(err, EngineError::Spawn { .. }));
    }
}
