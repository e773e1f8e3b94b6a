//! Output writing.
//!
//! Every file name is validated against the output directory before anything is
//! written. A batch is written to `*.sheaf-tmp` siblings first and renamed into
//! place only once every temporary file exists; on failure the temporaries are
//! removed and the previous output stays untouched.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use path_clean::PathClean;
use tracing::{debug, warn};

use crate::artifact::Artifact;
use crate::error::{BuildError, Result};

const TEMP_SUFFIX: &str = "sheaf-tmp";

/// Write `artifacts` under `dir`, all or nothing. Returns the written paths.
pub fn write_artifacts(dir: &Path, artifacts: &[Artifact]) -> Result<Vec<PathBuf>> {
    let dir = normalize_dir(dir)?;
    fs::create_dir_all(&dir).map_err(|err| write_error(&dir, err))?;

    let mut operations = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let target = validate_output_path(&dir, &artifact.file_name)?;
        operations.push((target, artifact.bytes.as_ref()));
    }

    write_files_atomic(&operations)?;
    debug!(dir = %dir.display(), files = operations.len(), "wrote output");
    Ok(operations.into_iter().map(|(path, _)| path).collect())
}

/// Write one file and flush it to disk before returning.
pub fn write_durable(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| write_error(parent, err))?;
    }
    let temp = temp_path(path);
    write_synced(&temp, path, bytes).map_err(|err| {
        let _ = fs::remove_file(&temp);
        write_error(path, err)
    })
}

fn write_synced(temp: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(temp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(temp, path)?;
    // Syncing the directory makes the rename durable; not every platform allows it.
    if let Some(dir) = path.parent().and_then(|parent| fs::File::open(parent).ok()) {
        let _ = dir.sync_all();
    }
    Ok(())
}

/// Remove everything inside `dir`, keeping the directory itself.
pub fn clean_dir(dir: &Path) -> Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(write_error(dir, err)),
    };
    for entry in entries {
        let entry = entry.map_err(|err| write_error(dir, err))?;
        let path = entry.path();
        let removed = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(|err| write_error(&path, err))?;
    }
    debug!(dir = %dir.display(), "cleaned output directory");
    Ok(())
}

fn normalize_dir(dir: &Path) -> Result<PathBuf> {
    let cleaned = dir.clean();
    if cleaned.is_absolute() {
        return Ok(cleaned);
    }
    let cwd = std::env::current_dir().map_err(|err| {
        BuildError::InvalidOutputPath(format!("cannot read current directory: {err}"))
    })?;
    Ok(cwd.join(cleaned).clean())
}

/// Join `file_name` onto `base_dir`, refusing anything that escapes it.
pub(crate) fn validate_output_path(base_dir: &Path, file_name: &str) -> Result<PathBuf> {
    if file_name.is_empty() || file_name.contains('\0') {
        return Err(BuildError::InvalidOutputPath(format!(
            "invalid file name {file_name:?}"
        )));
    }
    let full = base_dir.join(Path::new(file_name).clean()).clean();
    if !full.starts_with(base_dir) || full == base_dir {
        return Err(BuildError::InvalidOutputPath(format!(
            "'{file_name}' escapes output directory '{}'",
            base_dir.display()
        )));
    }
    Ok(full)
}

fn write_files_atomic(operations: &[(PathBuf, &[u8])]) -> Result<()> {
    let mut written: Vec<(PathBuf, &Path)> = Vec::with_capacity(operations.len());

    for (target, bytes) in operations {
        let temp = temp_path(target);
        let result = target
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| fs::write(&temp, bytes));
        if let Err(err) = result {
            cleanup(&written);
            let _ = fs::remove_file(&temp);
            return Err(write_error(target, err));
        }
        written.push((temp, target.as_path()));
    }

    for (index, (temp, target)) in written.iter().enumerate() {
        if let Err(err) = fs::rename(temp, target) {
            cleanup(&written[index..]);
            return Err(write_error(target, err));
        }
    }
    Ok(())
}

fn temp_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".");
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

fn cleanup(temps: &[(PathBuf, &Path)]) {
    for (temp, _) in temps {
        if !temp.exists() {
            continue;
        }
        if let Err(err) = fs::remove_file(temp) {
            warn!(path = %temp.display(), error = %err, "failed to remove temporary file");
        }
    }
}

fn write_error(path: &Path, err: std::io::Error) -> BuildError {
    BuildError::Write {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
