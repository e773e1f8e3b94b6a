//! Production size hints.

use serde::Serialize;
use sheaf_config::PerformanceSettings;
use tracing::warn;

use crate::artifact::{Artifact, ArtifactKind};
use crate::manifest::Manifest;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PerformanceHint {
    AssetTooLarge { file: String, size: u64, limit: u64 },
    EntrypointTooLarge { entry: String, size: u64, limit: u64 },
}

impl std::fmt::Display for PerformanceHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PerformanceHint::AssetTooLarge { file, size, limit } => {
                write!(f, "asset '{file}' is {size} bytes (limit {limit})")
            }
            PerformanceHint::EntrypointTooLarge { entry, size, limit } => {
                write!(f, "entrypoint '{entry}' loads {size} bytes up front (limit {limit})")
            }
        }
    }
}

/// Flag oversized files and entrypoints. Source maps are not counted.
pub fn check(
    settings: &PerformanceSettings,
    artifacts: &[Artifact],
    manifest: &Manifest,
    public_path: &str,
) -> Vec<PerformanceHint> {
    if !settings.hints {
        return Vec::new();
    }

    let mut hints: Vec<PerformanceHint> = artifacts
        .iter()
        .filter(|artifact| artifact.kind != ArtifactKind::SourceMap)
        .filter(|artifact| artifact.size() > settings.max_asset_size)
        .map(|artifact| PerformanceHint::AssetTooLarge {
            file: artifact.file_name.clone(),
            size: artifact.size(),
            limit: settings.max_asset_size,
        })
        .collect();

    for (entry, files) in manifest.entries() {
        let size: u64 = files
            .iter()
            .filter(|file| file.entry_point)
            .filter_map(|file| {
                let name = file.path.strip_prefix(public_path).unwrap_or(&file.path);
                artifacts.iter().find(|artifact| artifact.file_name == name)
            })
            .map(Artifact::size)
            .sum();
        if size > settings.max_entrypoint_size {
            hints.push(PerformanceHint::EntrypointTooLarge {
                entry: entry.to_string(),
                size,
                limit: settings.max_entrypoint_size,
            });
        }
    }

    for hint in &hints {
        warn!("performance: {hint}");
    }
    hints
}
