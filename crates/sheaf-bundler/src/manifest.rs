//! Entry-to-file manifest for the server-side renderer.
//!
//! ```json
//! {
//!   "main": [
//!     { "path": "/static/dist/main~admin.chunk.1a2b3c4d.js", "entry_point": true, "kind": "script" },
//!     { "path": "/static/dist/main.bundle.5e6f7a8b.js", "entry_point": true, "kind": "script" },
//!     { "path": "/static/dist/lazy.chunk.9c0d1e2f.js", "entry_point": false, "kind": "script" }
//!   ]
//! }
//! ```
//!
//! Files flagged `entry_point` must be loaded up front, in list order. The rest are
//! fetched on demand (async chunks) or referenced from styles (assets).

use std::path::Path;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use sheaf_graph::{ModuleGraph, ModuleId};

use crate::artifact::{Artifact, ArtifactKind};
use crate::error::{BuildError, Result};
use crate::split::{ChunkSet, chunks_for_entry};
use crate::transform::{ModuleOutput, TransformedModules};
use crate::writer;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    /// Public URL path.
    pub path: String,
    pub entry_point: bool,
    pub kind: ArtifactKind,
}

/// Entry name to emitted files, in entry declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: IndexMap<String, Vec<ManifestFile>>,
}

impl Manifest {
    /// Map every declared entry to its files. An entry without files still gets a
    /// key.
    pub fn emit<'a>(
        entries: impl IntoIterator<Item = &'a String>,
        graph: &ModuleGraph,
        chunks: &ChunkSet,
        artifacts: &[Artifact],
        modules: &TransformedModules,
        public_path: &str,
    ) -> Self {
        let url = |file_name: &str| format!("{public_path}{file_name}");

        let mut by_chunk: FxHashMap<&str, Vec<&Artifact>> = FxHashMap::default();
        for artifact in artifacts {
            if let (Some(chunk), ArtifactKind::Script | ArtifactKind::Style) =
                (&artifact.chunk, artifact.kind)
            {
                by_chunk.entry(chunk.as_str()).or_default().push(artifact);
            }
        }
        // Styles before scripts, so sheets start loading first.
        for files in by_chunk.values_mut() {
            files.sort_by_key(|artifact| artifact.kind != ArtifactKind::Style);
        }

        let mut manifest = IndexMap::new();
        for entry in entries {
            let mut files = Vec::new();
            for (index, eager) in chunks_for_entry(graph, chunks, entry) {
                let name = chunks.chunks()[index].name.as_str();
                for artifact in by_chunk.get(name).into_iter().flatten() {
                    files.push(ManifestFile {
                        path: url(&artifact.file_name),
                        entry_point: eager,
                        kind: artifact.kind,
                    });
                }
            }
            for file_name in entry_assets(graph, modules, entry) {
                files.push(ManifestFile {
                    path: url(&file_name),
                    entry_point: false,
                    kind: ArtifactKind::Asset,
                });
            }
            manifest.insert(entry.clone(), files);
        }
        Self { entries: manifest }
    }

    pub fn get(&self, entry: &str) -> Option<&[ManifestFile]> {
        self.entries.get(entry).map(Vec::as_slice)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &[ManifestFile])> {
        self.entries
            .iter()
            .map(|(name, files)| (name.as_str(), files.as_slice()))
    }

    pub fn contains_entry(&self, entry: &str) -> bool {
        self.entries.contains_key(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| BuildError::Task(format!("manifest serialization failed: {err}")))
    }

    /// Write the manifest and flush it to disk.
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut json = self.to_json()?;
        json.push('\n');
        writer::write_durable(path, json.as_bytes())
    }
}

/// Asset files reachable from `entry`, sorted and deduplicated.
fn entry_assets(graph: &ModuleGraph, modules: &TransformedModules, entry: &str) -> Vec<String> {
    let Some(roots) = graph.entries().get(entry) else {
        return Vec::new();
    };
    let mut names: Vec<String> = graph
        .full_closure(roots.iter())
        .iter()
        .filter_map(|id: &ModuleId| modules.get(id))
        .filter_map(|module| match &module.output {
            ModuleOutput::Asset { file_name, .. } => Some(file_name.clone()),
            ModuleOutput::Code { .. } => None,
        })
        .collect();
    names.sort();
    names.dedup();
    names
}
