//! Transform engines.
//!
//! An engine takes one module's code and returns new code. Engines are looked up by
//! the names used in rule chains. The built-ins cover the stages the pipeline itself
//! needs; real transpilers plug in as [`CommandEngine`]s configured under
//! `[engines.<name>]`.

mod builtin;
mod command;

pub use builtin::{
    CssEngine, CssExtractEngine, MinifyEngine, ScriptEngine, StyleInjectEngine, inject_style,
};
pub use command::CommandEngine;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use sheaf_config::{BuildProfile, Mode};
use sheaf_graph::ModuleId;

/// What a piece of code is at this point of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Script,
    Style,
}

/// Input for a single transform step.
#[derive(Debug, Clone)]
pub struct TransformInput {
    pub module: ModuleId,
    pub code: String,
    pub kind: ContentKind,
    /// Options from the rule's transform descriptor.
    pub options: Value,
    pub mode: Mode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    pub code: String,
    pub kind: ContentKind,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{0}")]
    Failed(String),

    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("engine produced invalid UTF-8")]
    InvalidUtf8,
}

#[async_trait]
pub trait TransformEngine: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    /// Per-engine bound overriding the profile's `transform_timeout`.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    async fn transform(&self, input: TransformInput) -> Result<TransformOutput, EngineError>;
}

/// Engines by name, in registration order. Registering a name twice replaces the
/// earlier engine.
#[derive(Debug, Clone, Default)]
pub struct EngineRegistry {
    engines: IndexMap<String, Arc<dyn TransformEngine>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `script`, `css`, `css-extract`, `style-inject` and `minify`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(ScriptEngine);
        registry.register(CssEngine);
        registry.register(CssExtractEngine);
        registry.register(StyleInjectEngine);
        registry.register(MinifyEngine);
        registry
    }

    /// Built-ins plus the command engines configured in `profile`.
    pub fn from_profile(profile: &BuildProfile) -> Self {
        let mut registry = Self::with_builtins();
        for (name, config) in &profile.engines {
            registry.register(CommandEngine::from_config(name, config, &profile.root));
        }
        registry
    }

    pub fn register<E: TransformEngine + 'static>(&mut self, engine: E) {
        self.register_shared(Arc::new(engine));
    }

    pub fn register_shared(&mut self, engine: Arc<dyn TransformEngine>) {
        self.engines.insert(engine.name().to_string(), engine);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn TransformEngine>> {
        self.engines.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.engines.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.engines.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use sheaf_config::{EngineConfig, EnvFlags, PartialProfile, resolve};

    use super::*;

    #[test]
    fn builtins_are_registered() {
        let registry = EngineRegistry::with_builtins();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(
            names,
            vec!["script", "css", "css-extract", "style-inject", "minify"]
        );
    }

    #[test]
    fn configured_engine_replaces_builtin() {
        let mut engines = IndexMap::new();
        engines.insert(
            "minify".to_string(),
            EngineConfig {
                command: "terser".to_string(),
                args: vec!["--compress".to_string()],
                timeout_ms: Some(5_000),
            },
        );
        let base = PartialProfile {
            root: Some(PathBuf::from("/app")),
            engines: Some(engines),
            ..Default::default()
        };
        let profile = resolve(
            &base,
            &PartialProfile::default(),
            Mode::Production,
            &EnvFlags::default(),
        );

        let registry = EngineRegistry::from_profile(&profile);
        assert_eq!(registry.len(), 5);
        let minify = registry.get("minify").unwrap();
        assert_eq!(minify.timeout(), Some(Duration::from_secs(5)));
    }
}
