//! Consistency checks on a resolved profile.
//!
//! Resolution itself never fails; contradictions are reported here, before any module
//! is read or transformed.

use rustc_hash::FxHashSet;

use crate::error::{ConfigError, Result};
use crate::profile::BuildProfile;

/// Validate a resolved profile for logical consistency.
pub fn validate(profile: &BuildProfile) -> Result<()> {
    if profile.entries.is_empty() {
        return Err(ConfigError::NoEntries);
    }

    for (name, modules) in &profile.entries {
        if name.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "entry names cannot be empty".to_string(),
            ));
        }
        if modules.is_empty() || modules.iter().any(|module| module.trim().is_empty()) {
            return Err(ConfigError::EmptyEntry(name.clone()));
        }
    }

    if !profile.output.public_path.ends_with('/') {
        return Err(ConfigError::InvalidValue(format!(
            "public_path '{}' must end with '/'",
            profile.output.public_path
        )));
    }

    if let Some(ext) = profile.extensions.iter().find(|ext| !ext.starts_with('.')) {
        return Err(ConfigError::InvalidValue(format!(
            "extension '{ext}' must start with '.'"
        )));
    }

    for asset in &profile.assets {
        if !asset.filename.contains("[name]") {
            return Err(ConfigError::InvalidValue(format!(
                "asset filename '{}' must contain [name]",
                asset.filename
            )));
        }
    }

    if let Some(split) = profile.split() {
        let mut seen = FxHashSet::default();
        for group in &split.groups {
            if group.name.trim().is_empty() {
                return Err(ConfigError::InvalidChunkGroup {
                    name: group.name.clone(),
                    reason: "name cannot be empty".to_string(),
                });
            }
            if group.name.contains(['/', '\\']) {
                return Err(ConfigError::InvalidChunkGroup {
                    name: group.name.clone(),
                    reason: "name cannot contain path separators".to_string(),
                });
            }
            if !seen.insert(group.name.as_str()) {
                return Err(ConfigError::DuplicateChunkGroup(group.name.clone()));
            }
            if profile.entries.contains_key(&group.name) {
                return Err(ConfigError::GroupShadowsEntry(group.name.clone()));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::{EnvFlags, Mode};
    use crate::partial::{PartialProfile, PartialSplit};
    use crate::profile::resolve;
    use crate::rules::{ChunkGroupRule, ChunkScope, Pattern};
    use indexmap::IndexMap;

    fn production(partial: PartialProfile) -> BuildProfile {
        resolve(
            &PartialProfile::default(),
            &partial,
            Mode::Production,
            &EnvFlags::default(),
        )
    }

    fn group(name: &str) -> ChunkGroupRule {
        ChunkGroupRule {
            name: name.to_string(),
            test: Pattern::new("lib").unwrap(),
            chunks: ChunkScope::All,
        }
    }

    #[test]
    fn defaults_are_valid() {
        for mode in [Mode::Production, Mode::Development] {
            let profile = resolve(
                &PartialProfile::default(),
                &PartialProfile::default(),
                mode,
                &EnvFlags::default(),
            );
            validate(&profile).unwrap();
        }
    }

    #[test]
    fn empty_entry_map_is_rejected() {
        let profile = production(PartialProfile {
            entries: Some(IndexMap::new()),
            ..Default::default()
        });
        assert!(matches!(validate(&profile), Err(ConfigError::NoEntries)));
    }

    #[test]
    fn entry_without_modules_is_rejected() {
        let mut entries = IndexMap::new();
        entries.insert("main".to_string(), vec![]);
        let profile = production(PartialProfile {
            entries: Some(entries),
            ..Default::default()
        });
        assert!(matches!(validate(&profile), Err(ConfigError::EmptyEntry(name)) if name == "main"));
    }

    #[test]
    fn duplicate_groups_are_rejected() {
        let profile = production(PartialProfile {
            split: Some(PartialSplit {
                min_size: None,
                groups: Some(vec![group("vendor"), group("vendor")]),
            }),
            ..Default::default()
        });
        assert!(matches!(
            validate(&profile),
            Err(ConfigError::DuplicateChunkGroup(name)) if name == "vendor"
        ));
    }

    #[test]
    fn group_named_like_entry_is_rejected() {
        let profile = production(PartialProfile {
            split: Some(PartialSplit {
                min_size: None,
                groups: Some(vec![group("simple")]),
            }),
            ..Default::default()
        });
        assert!(matches!(
            validate(&profile),
            Err(ConfigError::GroupShadowsEntry(_))
        ));
    }

    #[test]
    fn public_path_needs_trailing_slash() {
        let profile = production(PartialProfile {
            public_path: Some("/static".into()),
            ..Default::default()
        });
        assert!(matches!(validate(&profile), Err(ConfigError::InvalidValue(_))));
    }
}
