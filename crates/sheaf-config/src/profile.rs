//! The resolved, immutable build profile.

use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::IndexMap;
use tracing::debug;

use crate::defaults::{self, mode_defaults};
use crate::mode::{EnvFlags, Mode};
use crate::partial::{
    EngineConfig, PartialDevServer, PartialPerformance, PartialProfile, PartialSplit,
    SourceMapStrategy,
};
use crate::rules::{AssetRule, ChunkGroupRule, Pattern, Rule};

/// Optional pipeline behaviour, decided once per build.
///
/// Declaration order is pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    /// Style outputs leave the script and become `.css` artifacts.
    ExtractCss,
    /// Chunk text goes through the configured minifier.
    Minify,
    /// Sidecar `.map` files next to script chunks.
    SourceMapFiles,
    /// Entry-to-file manifest for the server renderer.
    Manifest,
    /// Partial updates pushed to connected dev clients.
    HotUpdate,
    /// Development output is served and watched.
    DevServer,
    /// Build runs under continuous integration.
    CiReport,
}

/// The set of enabled [`Capability`] values, kept sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities(Vec<Capability>);

impl Capabilities {
    pub fn new(capabilities: impl IntoIterator<Item = Capability>) -> Self {
        let mut set: Vec<Capability> = capabilities.into_iter().collect();
        set.sort();
        set.dedup();
        Self(set)
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.binary_search(&capability).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSettings {
    /// Directory all chunks and assets are written into.
    pub path: PathBuf,
    /// URL prefix under which the output directory is served.
    pub public_path: String,
    /// Remove the output directory before the first write.
    pub clean: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerformanceSettings {
    pub hints: bool,
    pub max_asset_size: u64,
    pub max_entrypoint_size: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitSettings {
    /// Byte floor under which async and default shared chunks are merged away.
    pub min_size: u64,
    /// Named groups, earlier declarations win ties.
    pub groups: Vec<ChunkGroupRule>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DevServerSettings {
    pub host: String,
    pub port: u16,
    pub hot: bool,
    pub allowed_hosts: String,
    /// Quiet period used to coalesce bursts of file events.
    pub debounce: Duration,
    /// Modules matching any of these always force a full reload.
    pub full_reload_patterns: Vec<Pattern>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DevelopmentSettings {
    pub source_map: SourceMapStrategy,
    pub dev_server: DevServerSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductionSettings {
    pub source_map: SourceMapStrategy,
    pub minimize: bool,
    /// Engine used by the minify stage.
    pub minimizer: String,
    pub split: SplitSettings,
    /// Where the manifest is written, relative to the project root.
    pub manifest_path: PathBuf,
}

/// Mode-specific settings. Settings that only make sense in one mode live only there.
#[derive(Debug, Clone, PartialEq)]
pub enum ModeSettings {
    Development(DevelopmentSettings),
    Production(ProductionSettings),
}

/// Fully merged configuration for one build invocation.
///
/// Produced by [`resolve`], never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildProfile {
    pub root: PathBuf,
    pub entries: IndexMap<String, Vec<String>>,
    /// Extensions probed when an import omits one.
    pub extensions: Vec<String>,
    pub output: OutputSettings,
    pub rules: Vec<Rule>,
    pub assets: Vec<AssetRule>,
    pub engines: IndexMap<String, EngineConfig>,
    pub performance: PerformanceSettings,
    pub transform_timeout: Duration,
    pub capabilities: Capabilities,
    pub mode: ModeSettings,
}

impl BuildProfile {
    pub fn mode(&self) -> Mode {
        match self.mode {
            ModeSettings::Development(_) => Mode::Development,
            ModeSettings::Production(_) => Mode::Production,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self.mode, ModeSettings::Production(_))
    }

    pub fn is_development(&self) -> bool {
        matches!(self.mode, ModeSettings::Development(_))
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn source_map(&self) -> SourceMapStrategy {
        match &self.mode {
            ModeSettings::Development(dev) => dev.source_map,
            ModeSettings::Production(prod) => prod.source_map,
        }
    }

    pub fn dev_server(&self) -> Option<&DevServerSettings> {
        match &self.mode {
            ModeSettings::Development(dev) => Some(&dev.dev_server),
            ModeSettings::Production(_) => None,
        }
    }

    pub fn split(&self) -> Option<&SplitSettings> {
        match &self.mode {
            ModeSettings::Production(prod) => Some(&prod.split),
            ModeSettings::Development(_) => None,
        }
    }

    pub fn manifest_path(&self) -> Option<&Path> {
        match &self.mode {
            ModeSettings::Production(prod) => Some(prod.manifest_path.as_path()),
            ModeSettings::Development(_) => None,
        }
    }

    /// Output directory joined onto the project root.
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.output.path)
    }
}

/// Collapse defaults, base and mode overrides into a [`BuildProfile`].
///
/// Total: every field missing from both layers falls back to the built-in default for
/// `mode`. Environment flags only toggle capabilities.
pub fn resolve(
    base: &PartialProfile,
    overrides: &PartialProfile,
    mode: Mode,
    flags: &EnvFlags,
) -> BuildProfile {
    let merged = mode_defaults(mode).overlay(base).overlay(overrides);
    let profile = collapse(merged, mode, flags);
    debug!(
        mode = %mode,
        entries = profile.entries.len(),
        rules = profile.rules.len(),
        capabilities = ?profile.capabilities,
        "resolved build profile"
    );
    profile
}

fn collapse(p: PartialProfile, mode: Mode, flags: &EnvFlags) -> BuildProfile {
    let perf = p.performance.unwrap_or_default();
    let performance = PerformanceSettings {
        hints: perf.hints.unwrap_or(mode == Mode::Production),
        max_asset_size: perf.max_asset_size.unwrap_or(defaults::MAX_ASSET_SIZE),
        max_entrypoint_size: perf
            .max_entrypoint_size
            .unwrap_or(defaults::MAX_ENTRYPOINT_SIZE),
    };

    let rules = p.rules.unwrap_or_default();
    let minimize = p.minimize.unwrap_or(false);

    let mode_settings = match mode {
        Mode::Production => {
            let split = p.split.unwrap_or_default();
            ModeSettings::Production(ProductionSettings {
                source_map: p.source_map.unwrap_or(SourceMapStrategy::SourceMap),
                minimize,
                minimizer: p.minimizer.unwrap_or_else(|| "minify".to_string()),
                split: SplitSettings {
                    min_size: split.min_size.unwrap_or(defaults::PRODUCTION_MIN_SIZE),
                    groups: split.groups.unwrap_or_default(),
                },
                manifest_path: p
                    .manifest_path
                    .unwrap_or_else(|| PathBuf::from(defaults::PRODUCTION_MANIFEST)),
            })
        }
        Mode::Development => {
            let server = p.dev_server.unwrap_or_default();
            ModeSettings::Development(DevelopmentSettings {
                source_map: p.source_map.unwrap_or(SourceMapStrategy::EvalSourceMap),
                dev_server: DevServerSettings {
                    host: server
                        .host
                        .unwrap_or_else(|| defaults::DEV_SERVER_HOST.to_string()),
                    port: server.port.unwrap_or(defaults::DEV_SERVER_PORT),
                    hot: server.hot.unwrap_or(true),
                    allowed_hosts: server.allowed_hosts.unwrap_or_else(|| "all".to_string()),
                    debounce: Duration::from_millis(
                        server.debounce_ms.unwrap_or(defaults::DEFAULT_DEBOUNCE_MS),
                    ),
                    full_reload_patterns: server.full_reload_patterns.unwrap_or_default(),
                },
            })
        }
    };

    let capabilities = derive_capabilities(&mode_settings, &rules, minimize, flags);

    BuildProfile {
        root: p.root.unwrap_or_else(|| PathBuf::from(".")),
        entries: p.entries.unwrap_or_default(),
        extensions: p.extensions.unwrap_or_else(|| {
            defaults::DEFAULT_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect()
        }),
        output: OutputSettings {
            path: p.output_path.unwrap_or_else(|| match mode {
                Mode::Production => PathBuf::from(defaults::PRODUCTION_OUTPUT),
                Mode::Development => PathBuf::from(defaults::DEVELOPMENT_OUTPUT),
            }),
            public_path: p
                .public_path
                .unwrap_or_else(|| defaults::DEFAULT_PUBLIC_PATH.to_string()),
            clean: p.clean.unwrap_or(mode == Mode::Development),
        },
        rules,
        assets: p.assets.unwrap_or_default(),
        engines: p.engines.unwrap_or_default(),
        performance,
        transform_timeout: Duration::from_millis(
            p.transform_timeout_ms
                .unwrap_or(defaults::DEFAULT_TRANSFORM_TIMEOUT_MS),
        ),
        capabilities,
        mode: mode_settings,
    }
}

fn derive_capabilities(
    mode: &ModeSettings,
    rules: &[Rule],
    minimize: bool,
    flags: &EnvFlags,
) -> Capabilities {
    let mut caps = Vec::new();

    let extracts = rules
        .iter()
        .flat_map(|rule| rule.chain.iter())
        .any(|descriptor| descriptor.engine == "css-extract");
    if extracts {
        caps.push(Capability::ExtractCss);
    }
    if minimize {
        caps.push(Capability::Minify);
    }

    match mode {
        ModeSettings::Production(prod) => {
            if prod.source_map == SourceMapStrategy::SourceMap {
                caps.push(Capability::SourceMapFiles);
            }
            caps.push(Capability::Manifest);
        }
        ModeSettings::Development(dev) => {
            if dev.source_map == SourceMapStrategy::SourceMap {
                caps.push(Capability::SourceMapFiles);
            }
            if dev.dev_server.hot {
                caps.push(Capability::HotUpdate);
            }
            if flags.enable_dev_server {
                caps.push(Capability::DevServer);
            }
        }
    }

    if flags.ci {
        caps.push(Capability::CiReport);
    }

    Capabilities::new(caps)
}

impl From<&BuildProfile> for PartialProfile {
    fn from(profile: &BuildProfile) -> Self {
        let mut partial = PartialProfile {
            root: Some(profile.root.clone()),
            entries: Some(profile.entries.clone()),
            extensions: Some(profile.extensions.clone()),
            output_path: Some(profile.output.path.clone()),
            public_path: Some(profile.output.public_path.clone()),
            clean: Some(profile.output.clean),
            rules: Some(profile.rules.clone()),
            assets: Some(profile.assets.clone()),
            engines: Some(profile.engines.clone()),
            transform_timeout_ms: Some(profile.transform_timeout.as_millis() as u64),
            performance: Some(PartialPerformance {
                hints: Some(profile.performance.hints),
                max_asset_size: Some(profile.performance.max_asset_size),
                max_entrypoint_size: Some(profile.performance.max_entrypoint_size),
            }),
            source_map: Some(profile.source_map()),
            ..Default::default()
        };

        match &profile.mode {
            ModeSettings::Production(prod) => {
                partial.minimize = Some(prod.minimize);
                partial.minimizer = Some(prod.minimizer.clone());
                partial.manifest_path = Some(prod.manifest_path.clone());
                partial.split = Some(PartialSplit {
                    min_size: Some(prod.split.min_size),
                    groups: Some(prod.split.groups.clone()),
                });
            }
            ModeSettings::Development(dev) => {
                partial.minimize = Some(profile.has(Capability::Minify));
                let server = &dev.dev_server;
                partial.dev_server = Some(PartialDevServer {
                    host: Some(server.host.clone()),
                    port: Some(server.port),
                    hot: Some(server.hot),
                    allowed_hosts: Some(server.allowed_hosts.clone()),
                    debounce_ms: Some(server.debounce.as_millis() as u64),
                    full_reload_patterns: Some(server.full_reload_patterns.clone()),
                });
            }
        }

        partial
    }
}
