//! Build modes and environment flags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Operating mode of a build invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Iterative development: unhashed output, single chunk per entry, hot updates.
    Development,
    /// Optimized production: split chunks, content hashes, manifest.
    Production,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Mode::Development),
            "production" | "prod" => Ok(Mode::Production),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

/// Environment flags that influence profile resolution.
///
/// Only the flags listed here are recognised; anything else in the environment is
/// ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvFlags {
    /// `ENABLE_DEV_SERVER`: serve the development build and push hot updates.
    pub enable_dev_server: bool,
    /// `CI`: the build runs in continuous integration.
    pub ci: bool,
}

impl EnvFlags {
    pub const ENABLE_DEV_SERVER: &'static str = "ENABLE_DEV_SERVER";
    pub const CI: &'static str = "CI";

    /// Read the flags from the process environment.
    pub fn from_env() -> Self {
        Self::from_pairs(std::env::vars())
    }

    /// Build flags from key/value pairs. Unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut flags = Self::default();
        for (key, value) in pairs {
            match key.as_ref() {
                Self::ENABLE_DEV_SERVER => flags.enable_dev_server = is_truthy(value.as_ref()),
                Self::CI => flags.ci = is_truthy(value.as_ref()),
                _ => {}
            }
        }
        flags
    }
}

fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && !matches!(value.to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_aliases() {
        assert_eq!("production".parse::<Mode>().unwrap(), Mode::Production);
        assert_eq!("DEV".parse::<Mode>().unwrap(), Mode::Development);
        assert!("none".parse::<Mode>().is_err());
    }

    #[test]
    fn env_flags_ignore_unknown_keys() {
        let flags = EnvFlags::from_pairs([
            ("ENABLE_DEV_SERVER", "1"),
            ("CI", "false"),
            ("SOMETHING_ELSE", "true"),
        ]);
        assert!(flags.enable_dev_server);
        assert!(!flags.ci);
    }

    #[test]
    fn empty_flag_value_is_false() {
        let flags = EnvFlags::from_pairs([("CI", "")]);
        assert!(!flags.ci);
    }
}
