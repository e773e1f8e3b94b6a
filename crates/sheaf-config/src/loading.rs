//! Config file discovery and layered loading.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format as _, Json, Toml};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::mode::{EnvFlags, Mode};
use crate::partial::PartialProfile;
use crate::profile::{BuildProfile, resolve};

/// On-disk configuration: a shared base plus one override section per mode.
///
/// ```toml
/// [base]
/// public_path = "/static/dist/"
///
/// [base.entries]
/// main = ["client/main.tsx"]
///
/// [production]
/// output_path = "dist/static/dist"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub base: PartialProfile,
    pub development: PartialProfile,
    pub production: PartialProfile,
}

impl ConfigFile {
    /// Searched in order inside the project root.
    pub const FILE_NAMES: [&'static str; 2] = ["sheaf.toml", "sheaf.json"];

    /// `SHEAF_PRODUCTION__PUBLIC_PATH=/cdn/` sets `production.public_path`.
    pub const ENV_PREFIX: &'static str = "SHEAF_";

    /// First conventional config file present in `root`.
    pub fn find(root: &Path) -> Option<PathBuf> {
        Self::FILE_NAMES
            .iter()
            .map(|name| root.join(name))
            .find(|path| path.is_file())
    }

    /// Load the config for the project at `root`.
    ///
    /// Priority: `SHEAF_` environment variables > config file > nothing. An explicit
    /// `config_path` must exist; without one a missing file just means "no layers".
    pub fn load(root: &Path, config_path: Option<&Path>) -> Result<Self> {
        let path = match config_path {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::find(root),
        };

        let mut figment = Figment::new();
        if let Some(path) = &path {
            debug!(path = %path.display(), "loading config file");
            figment = merge_file(figment, path)?;
        }
        figment = figment.merge(Env::prefixed(Self::ENV_PREFIX).split("__"));

        let mut file = extract(figment)?;
        file.anchor(root);
        Ok(file)
    }

    /// Load one file without consulting the environment.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let mut file = extract(merge_file(Figment::new(), path)?)?;
        if let Some(parent) = path.parent() {
            file.anchor(parent);
        }
        Ok(file)
    }

    /// Parse TOML text. Relative roots stay relative.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        extract(Figment::new().merge(Toml::string(text)))
    }

    pub fn overrides(&self, mode: Mode) -> &PartialProfile {
        match mode {
            Mode::Development => &self.development,
            Mode::Production => &self.production,
        }
    }

    /// Resolve this file's layers for `mode`.
    pub fn resolve(&self, mode: Mode, flags: &EnvFlags) -> BuildProfile {
        resolve(&self.base, self.overrides(mode), mode, flags)
    }

    // Project root defaults to the directory the config was found in.
    fn anchor(&mut self, root: &Path) {
        self.base.root = Some(match self.base.root.take() {
            Some(configured) if configured.is_absolute() => configured,
            Some(configured) => root.join(configured),
            None => root.to_path_buf(),
        });
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => Ok(figment.merge(Toml::file(path))),
        Some("json") => Ok(figment.merge(Json::file(path))),
        other => Err(ConfigError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

fn extract(figment: Figment) -> Result<ConfigFile> {
    figment
        .extract()
        .map_err(|err| ConfigError::InvalidValue(err.to_string()))
}
