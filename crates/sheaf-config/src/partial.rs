//! Partial profiles: one layer of configuration with every field optional.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::rules::{AssetRule, ChunkGroupRule, Pattern, Rule};

/// Source-map strategy for emitted scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceMapStrategy {
    /// No source maps.
    None,
    /// Sidecar `.map` file per script chunk.
    SourceMap,
    /// Per-module `sourceURL` annotations inside the bundle.
    EvalSourceMap,
}

/// External command engine declaration (`[engines.<name>]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialSplit {
    pub min_size: Option<u64>,
    pub groups: Option<Vec<ChunkGroupRule>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialDevServer {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub hot: Option<bool>,
    pub allowed_hosts: Option<String>,
    pub debounce_ms: Option<u64>,
    pub full_reload_patterns: Option<Vec<Pattern>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialPerformance {
    pub hints: Option<bool>,
    pub max_asset_size: Option<u64>,
    pub max_entrypoint_size: Option<u64>,
}

/// One configuration layer. Missing fields defer to the layer below.
///
/// Unknown keys are ignored so config files can carry settings for other tools.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialProfile {
    pub root: Option<PathBuf>,
    pub entries: Option<IndexMap<String, Vec<String>>>,
    pub extensions: Option<Vec<String>>,
    pub output_path: Option<PathBuf>,
    pub public_path: Option<String>,
    pub manifest_path: Option<PathBuf>,
    pub source_map: Option<SourceMapStrategy>,
    pub minimize: Option<bool>,
    pub minimizer: Option<String>,
    pub clean: Option<bool>,
    pub rules: Option<Vec<Rule>>,
    pub assets: Option<Vec<AssetRule>>,
    pub engines: Option<IndexMap<String, EngineConfig>>,
    pub transform_timeout_ms: Option<u64>,
    pub split: Option<PartialSplit>,
    pub dev_server: Option<PartialDevServer>,
    pub performance: Option<PartialPerformance>,
}

/// Last-write-wins for a single field.
fn pick<T: Clone>(over: &Option<T>, base: &Option<T>) -> Option<T> {
    over.clone().or_else(|| base.clone())
}

impl PartialSplit {
    fn overlay(&self, over: &Self) -> Self {
        Self {
            min_size: pick(&over.min_size, &self.min_size),
            groups: pick(&over.groups, &self.groups),
        }
    }
}

impl PartialDevServer {
    fn overlay(&self, over: &Self) -> Self {
        Self {
            host: pick(&over.host, &self.host),
            port: pick(&over.port, &self.port),
            hot: pick(&over.hot, &self.hot),
            allowed_hosts: pick(&over.allowed_hosts, &self.allowed_hosts),
            debounce_ms: pick(&over.debounce_ms, &self.debounce_ms),
            full_reload_patterns: pick(&over.full_reload_patterns, &self.full_reload_patterns),
        }
    }
}

impl PartialPerformance {
    fn overlay(&self, over: &Self) -> Self {
        Self {
            hints: pick(&over.hints, &self.hints),
            max_asset_size: pick(&over.max_asset_size, &self.max_asset_size),
            max_entrypoint_size: pick(&over.max_entrypoint_size, &self.max_entrypoint_size),
        }
    }
}

fn overlay_nested<T: Clone>(base: &Option<T>, over: &Option<T>, merge: impl Fn(&T, &T) -> T) -> Option<T> {
    match (base, over) {
        (Some(base), Some(over)) => Some(merge(base, over)),
        (None, Some(over)) => Some(over.clone()),
        (base, None) => base.clone(),
    }
}

impl PartialProfile {
    /// Overlay `over` on top of `self`.
    ///
    /// | field kind                          | rule                         |
    /// |-------------------------------------|------------------------------|
    /// | scalar (`output_path`, `minimize`…) | `over` if set, else `self`   |
    /// | list / map (`rules`, `entries`…)    | replaced wholesale           |
    /// | section (`split`, `dev_server`…)    | field-wise with the same rules |
    pub fn overlay(&self, over: &PartialProfile) -> PartialProfile {
        PartialProfile {
            root: pick(&over.root, &self.root),
            entries: pick(&over.entries, &self.entries),
            extensions: pick(&over.extensions, &self.extensions),
            output_path: pick(&over.output_path, &self.output_path),
            public_path: pick(&over.public_path, &self.public_path),
            manifest_path: pick(&over.manifest_path, &self.manifest_path),
            source_map: pick(&over.source_map, &self.source_map),
            minimize: pick(&over.minimize, &self.minimize),
            minimizer: pick(&over.minimizer, &self.minimizer),
            clean: pick(&over.clean, &self.clean),
            rules: pick(&over.rules, &self.rules),
            assets: pick(&over.assets, &self.assets),
            engines: pick(&over.engines, &self.engines),
            transform_timeout_ms: pick(&over.transform_timeout_ms, &self.transform_timeout_ms),
            split: overlay_nested(&self.split, &over.split, PartialSplit::overlay),
            dev_server: overlay_nested(&self.dev_server, &over.dev_server, PartialDevServer::overlay),
            performance: overlay_nested(
                &self.performance,
                &over.performance,
                PartialPerformance::overlay,
            ),
        }
    }

    /// Returns `true` when no field is set.
    pub fn is_empty(&self) -> bool {
        self == &PartialProfile::default()
    }
}
