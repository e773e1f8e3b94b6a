//! Built-in per-mode defaults.
//!
//! These form the bottom layer under the `[base]` section of a config file. A project
//! without any config file builds the `simple` entry with these values.

use std::path::PathBuf;

use indexmap::IndexMap;

use crate::mode::Mode;
use crate::partial::{
    PartialDevServer, PartialPerformance, PartialProfile, PartialSplit, SourceMapStrategy,
};
use crate::rules::{
    AssetRule, ChunkGroupRule, ChunkScope, Pattern, Rule, TransformDescriptor,
    default_asset_filename,
};

pub const DEFAULT_ENTRY_NAME: &str = "simple";
pub const DEFAULT_ENTRY_MODULE: &str = "client/simple.entry.tsx";
pub const DEFAULT_EXTENSIONS: [&str; 5] = [".ts", ".tsx", ".js", ".jsx", ".css"];
pub const DEFAULT_PUBLIC_PATH: &str = "/static/dist/";
pub const DEFAULT_TRANSFORM_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_DEBOUNCE_MS: u64 = 50;

pub const PRODUCTION_OUTPUT: &str = "dist/static/dist";
pub const PRODUCTION_MANIFEST: &str = "dist/server/assets.json";
pub const PRODUCTION_MIN_SIZE: u64 = 400_000;
pub const MAX_ASSET_SIZE: u64 = 3_000_000;
pub const MAX_ENTRYPOINT_SIZE: u64 = 3_500_000;

pub const DEVELOPMENT_OUTPUT: &str = "static/dist";
pub const DEV_SERVER_HOST: &str = "0.0.0.0";
pub const DEV_SERVER_PORT: u16 = 3010;

pub const FONT_ASSET_PATTERN: &str = r"\.(woff(2)?|ttf|eot|svg)(\?v=\d+\.\d+\.\d+)?$";
pub const MONACO_GROUP_NAME: &str = "monaco-editor-common-v2";
pub const MONACO_GROUP_PATTERN: &str = r"[\\/]node_modules[\\/]monaco-editor";

/// Default layer for `mode`, before any config file is applied.
pub fn mode_defaults(mode: Mode) -> PartialProfile {
    let shared = PartialProfile {
        entries: Some(default_entries()),
        extensions: Some(DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect()),
        public_path: Some(DEFAULT_PUBLIC_PATH.to_string()),
        assets: Some(vec![font_asset_rule()]),
        transform_timeout_ms: Some(DEFAULT_TRANSFORM_TIMEOUT_MS),
        ..Default::default()
    };

    let specific = match mode {
        Mode::Production => PartialProfile {
            output_path: Some(PathBuf::from(PRODUCTION_OUTPUT)),
            manifest_path: Some(PathBuf::from(PRODUCTION_MANIFEST)),
            source_map: Some(SourceMapStrategy::SourceMap),
            minimize: Some(true),
            minimizer: Some("minify".to_string()),
            clean: Some(false),
            rules: Some(production_rules()),
            split: Some(PartialSplit {
                min_size: Some(PRODUCTION_MIN_SIZE),
                groups: Some(vec![monaco_group()]),
            }),
            performance: Some(PartialPerformance {
                hints: Some(true),
                max_asset_size: Some(MAX_ASSET_SIZE),
                max_entrypoint_size: Some(MAX_ENTRYPOINT_SIZE),
            }),
            ..Default::default()
        },
        Mode::Development => PartialProfile {
            output_path: Some(PathBuf::from(DEVELOPMENT_OUTPUT)),
            source_map: Some(SourceMapStrategy::EvalSourceMap),
            minimize: Some(false),
            clean: Some(true),
            rules: Some(development_rules()),
            dev_server: Some(PartialDevServer {
                host: Some(DEV_SERVER_HOST.to_string()),
                port: Some(DEV_SERVER_PORT),
                hot: Some(true),
                allowed_hosts: Some("all".to_string()),
                debounce_ms: Some(DEFAULT_DEBOUNCE_MS),
                full_reload_patterns: Some(Vec::new()),
            }),
            performance: Some(PartialPerformance {
                hints: Some(false),
                max_asset_size: Some(MAX_ASSET_SIZE),
                max_entrypoint_size: Some(MAX_ENTRYPOINT_SIZE),
            }),
            ..Default::default()
        },
    };

    shared.overlay(&specific)
}

pub fn default_entries() -> IndexMap<String, Vec<String>> {
    let mut entries = IndexMap::new();
    entries.insert(
        DEFAULT_ENTRY_NAME.to_string(),
        vec![DEFAULT_ENTRY_MODULE.to_string()],
    );
    entries
}

// The patterns below are literals known to compile.
fn pattern(source: &str) -> Pattern {
    match Pattern::new(source) {
        Ok(pattern) => pattern,
        Err(err) => unreachable!("built-in pattern failed to compile: {err}"),
    }
}

fn font_asset_rule() -> AssetRule {
    AssetRule {
        test: pattern(FONT_ASSET_PATTERN),
        filename: default_asset_filename(),
    }
}

fn monaco_group() -> ChunkGroupRule {
    ChunkGroupRule {
        name: MONACO_GROUP_NAME.to_string(),
        test: pattern(MONACO_GROUP_PATTERN),
        chunks: ChunkScope::Async,
    }
}

fn production_rules() -> Vec<Rule> {
    vec![
        Rule::new(
            pattern(r"\.css$"),
            vec![
                TransformDescriptor::new("css"),
                TransformDescriptor::new("css-extract"),
            ],
        ),
        Rule::new(
            pattern(r"\.(ts|tsx|js|jsx)$"),
            vec![TransformDescriptor::new("script")],
        )
        .exclude(pattern(r"node_modules|\.stories\.tsx")),
    ]
}

fn development_rules() -> Vec<Rule> {
    vec![
        Rule::new(
            pattern(r"\.css$"),
            vec![
                TransformDescriptor::new("css"),
                TransformDescriptor::new("style-inject"),
            ],
        ),
        Rule::new(pattern(r"\.tsx?$"), vec![TransformDescriptor::new("script")]),
    ]
}
