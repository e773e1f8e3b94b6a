//! Named output files.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::naming::{self, FileRole};
use crate::render::RenderedChunk;
use crate::sourcemap;
use crate::split::Chunk;
use crate::transform::{ModuleOutput, TransformedModules};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    Script,
    Style,
    SourceMap,
    Asset,
}

/// A file ready to be written under the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Path relative to the output directory.
    pub file_name: String,
    pub kind: ArtifactKind,
    /// Chunk the file was rendered from; `None` for assets.
    pub chunk: Option<String>,
    /// Present on fingerprinted files.
    pub fingerprint: Option<String>,
    pub bytes: Arc<[u8]>,
}

impl Artifact {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Name the files of one rendered chunk.
///
/// The fingerprint is taken over the final script bytes; the `sourceMappingURL`
/// comment is appended afterwards and does not feed the hash.
pub fn chunk_artifacts(
    chunk: &Chunk,
    rendered: &RenderedChunk,
    hashed: bool,
    source_maps: bool,
) -> Vec<Artifact> {
    let mut artifacts = Vec::new();

    if let Some(style) = &rendered.style {
        artifacts.push(Artifact {
            file_name: naming::chunk_file_name(&chunk.name, FileRole::Style, style.as_bytes(), hashed),
            kind: ArtifactKind::Style,
            chunk: Some(chunk.name.clone()),
            fingerprint: hashed.then(|| naming::fingerprint(style.as_bytes())),
            bytes: Arc::from(style.as_bytes()),
        });
    }

    if let Some(script) = &rendered.script {
        let role = if chunk.is_entry() {
            FileRole::EntryScript
        } else {
            FileRole::ChunkScript
        };
        let file_name = naming::chunk_file_name(&chunk.name, role, script.as_bytes(), hashed);
        let fingerprint = hashed.then(|| naming::fingerprint(script.as_bytes()));

        let mut bytes = script.clone();
        if source_maps {
            let map_name = naming::source_map_name(&file_name);
            let map = sourcemap::build(&file_name, script, &rendered.sources);
            bytes.push_str(&format!("//# sourceMappingURL={}\n", base_name(&map_name)));
            artifacts.push(Artifact {
                file_name: map_name,
                kind: ArtifactKind::SourceMap,
                chunk: Some(chunk.name.clone()),
                fingerprint: None,
                bytes: Arc::from(map.to_json_string().into_bytes()),
            });
        }

        artifacts.push(Artifact {
            file_name,
            kind: ArtifactKind::Script,
            chunk: Some(chunk.name.clone()),
            fingerprint,
            bytes: Arc::from(bytes.into_bytes()),
        });
    }

    artifacts
}

/// One artifact per distinct asset file name, in module id order.
pub fn asset_artifacts(modules: &TransformedModules) -> Vec<Artifact> {
    let mut assets: Vec<(&sheaf_graph::ModuleId, &String, &Arc<[u8]>)> = modules
        .values()
        .filter_map(|module| match &module.output {
            ModuleOutput::Asset { file_name, bytes } => Some((&module.id, file_name, bytes)),
            ModuleOutput::Code { .. } => None,
        })
        .collect();
    assets.sort_by(|a, b| a.0.cmp(b.0));

    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut artifacts = Vec::with_capacity(assets.len());
    for (id, file_name, bytes) in assets {
        if !seen.insert(file_name.as_str()) {
            warn!(module = %id, file = %file_name, "asset file name already taken, skipping");
            continue;
        }
        artifacts.push(Artifact {
            file_name: file_name.clone(),
            kind: ArtifactKind::Asset,
            chunk: None,
            fingerprint: None,
            bytes: Arc::clone(bytes),
        });
    }
    artifacts
}

fn base_name(file_name: &str) -> &str {
    file_name.rsplit('/').next().unwrap_or(file_name)
}
