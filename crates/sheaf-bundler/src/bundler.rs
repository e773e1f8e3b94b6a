//! Build driver.
//!
//! [`Bundler::build`] runs the whole pipeline once. [`Bundler::rebuild`] takes the
//! last good [`BuildSnapshot`] and the files touched since, re-reads only those and
//! their importers, re-runs transforms only for the invalidated subgraph and then
//! re-splits and re-renders from the new graph snapshot.
//!
//! Error policy: production fails on any error, listing all of them. Development
//! turns unresolved imports into throwing stubs and reports them as warnings; any
//! other error fails the cycle, leaving the previous output in place.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustc_hash::FxHashSet;
use serde::Serialize;
use sheaf_config::{BuildProfile, Mode, ModeSettings, validate};
use sheaf_graph::{ChangeSet, GraphBuilder, GraphError, ModuleGraph, ModuleId, NativeRuntime, Runtime};
use tracing::{debug, info, warn};

use crate::artifact::{self, Artifact};
use crate::engines::{ContentKind, EngineRegistry, TransformInput};
use crate::error::{BuildError, Result};
use crate::hints::{self, PerformanceHint};
use crate::hot::{self, HotUpdate};
use crate::manifest::Manifest;
use crate::pipeline::{Pipeline, Stage};
use crate::render::{self, RenderedChunk};
use crate::split::{self, ChunkSet};
use crate::transform::{ModuleOutput, TransformedModule, TransformedModules, Transformer};
use crate::writer;

/// Everything one successful cycle produced. The next rebuild starts from it.
#[derive(Debug)]
pub struct BuildSnapshot {
    pub graph: Arc<ModuleGraph>,
    pub modules: TransformedModules,
    pub chunks: ChunkSet,
    pub artifacts: Vec<Artifact>,
    /// Production only.
    pub manifest: Option<Manifest>,
    /// Difference to the previous snapshot; everything is `added` on a first build.
    pub changes: ChangeSet,
    /// Client update, for development rebuilds.
    pub update: Option<HotUpdate>,
    /// Recoverable problems, such as imports replaced by stubs.
    pub warnings: Vec<BuildError>,
    pub hints: Vec<PerformanceHint>,
    pub written: Vec<PathBuf>,
    pub duration: Duration,
}

/// Machine-readable digest of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildSummary {
    pub mode: Mode,
    pub modules: usize,
    pub chunks: usize,
    pub files: Vec<String>,
    pub changed: Vec<ModuleId>,
    pub warnings: usize,
    pub hints: usize,
    pub duration_ms: u128,
}

impl BuildSnapshot {
    pub fn summary(&self, mode: Mode) -> BuildSummary {
        BuildSummary {
            mode,
            modules: self.graph.len(),
            chunks: self.chunks.len(),
            files: self
                .artifacts
                .iter()
                .map(|artifact| artifact.file_name.clone())
                .collect(),
            changed: self.changes.changed_ids(),
            warnings: self.warnings.len(),
            hints: self.hints.len(),
            duration_ms: self.duration.as_millis(),
        }
    }
}

/// Builds one resolved profile, any number of times.
#[derive(Debug, Clone)]
pub struct Bundler {
    profile: Arc<BuildProfile>,
    pipeline: Pipeline,
    registry: Arc<EngineRegistry>,
    graph_builder: GraphBuilder,
    transformer: Transformer,
}

impl Bundler {
    /// Bundler reading from disk, with built-in and configured engines.
    pub fn new(profile: BuildProfile) -> Result<Self> {
        let registry = EngineRegistry::from_profile(&profile);
        Self::with_parts(profile, Arc::new(NativeRuntime), registry)
    }

    pub fn with_parts(
        profile: BuildProfile,
        runtime: Arc<dyn Runtime>,
        registry: EngineRegistry,
    ) -> Result<Self> {
        validate(&profile)?;

        let registry = Arc::new(registry);
        let graph_builder = GraphBuilder::new(runtime, profile.root.clone(), profile.extensions.clone())
            .stub_unresolved(profile.is_development());
        let transformer = Transformer::new(&profile, Arc::clone(&registry));
        let pipeline = Pipeline::for_profile(&profile);
        debug!(stages = ?pipeline.stages(), "pipeline");

        Ok(Self {
            profile: Arc::new(profile),
            pipeline,
            registry,
            graph_builder,
            transformer,
        })
    }

    /// Bound graph loading and transforms to `max` concurrent tasks.
    pub fn max_parallel(mut self, max: usize) -> Self {
        self.graph_builder = self.graph_builder.max_parallel(max);
        self.transformer = self.transformer.max_parallel(max);
        self
    }

    pub fn profile(&self) -> &BuildProfile {
        &self.profile
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Empty the output directory when the profile asks for it.
    pub fn prepare_output(&self) -> Result<()> {
        if self.profile.output.clean {
            writer::clean_dir(&self.profile.output_dir())?;
        }
        Ok(())
    }

    /// Full build from scratch.
    pub async fn build(&self) -> Result<BuildSnapshot> {
        self.prepare_output()?;
        self.rebuild(None, &FxHashSet::default()).await
    }

    /// Build on top of `previous`, re-reading `touched` modules.
    pub async fn rebuild(
        &self,
        previous: Option<&BuildSnapshot>,
        touched: &FxHashSet<ModuleId>,
    ) -> Result<BuildSnapshot> {
        let started = Instant::now();
        let profile = self.profile.as_ref();

        let graph_build = self
            .graph_builder
            .rebuild(
                &profile.entries,
                previous.map(|snapshot| snapshot.graph.as_ref()),
                touched,
            )
            .await;
        let graph = Arc::new(graph_build.graph);
        let empty = ModuleGraph::default();
        let changes = ChangeSet::between(
            previous.map_or(&empty, |snapshot| snapshot.graph.as_ref()),
            &graph,
        );

        let (mut errors, warnings) = self.triage(graph_build.errors);

        let batch = match previous {
            Some(snapshot) => {
                self.transformer
                    .run_incremental(&graph, Some((&snapshot.modules, &changes.affected)))
                    .await
            }
            None => self.transformer.run(&graph).await,
        };
        let assets = batch.asset_ids();
        errors.extend(batch.errors);
        if let Some(err) = BuildError::aggregate(errors) {
            return Err(err);
        }
        let mut modules = batch.modules;
        if self.pipeline.contains(Stage::Minify) {
            self.minify(&mut modules).await?;
        }

        let chunks = split::split(&graph, profile, &assets);
        let rendered: Vec<RenderedChunk> = chunks
            .iter()
            .map(|chunk| render::render_chunk(chunk, &graph, &modules, profile))
            .collect();

        let mut artifacts: Vec<Artifact> = chunks
            .iter()
            .zip(&rendered)
            .flat_map(|(chunk, text)| {
                artifact::chunk_artifacts(
                    chunk,
                    text,
                    self.pipeline.contains(Stage::Fingerprint),
                    self.pipeline.contains(Stage::SourceMaps),
                )
            })
            .collect();
        artifacts.extend(artifact::asset_artifacts(&modules));

        let written = writer::write_artifacts(&profile.output_dir(), &artifacts)?;

        let manifest = match profile.manifest_path() {
            Some(path) if self.pipeline.contains(Stage::Manifest) => {
                let manifest = Manifest::emit(
                    profile.entries.keys(),
                    &graph,
                    &chunks,
                    &artifacts,
                    &modules,
                    &profile.output.public_path,
                );
                manifest.write(&profile.root.join(path))?;
                Some(manifest)
            }
            _ => None,
        };

        let hints = match &manifest {
            Some(manifest) if self.pipeline.contains(Stage::PerformanceHints) => hints::check(
                &profile.performance,
                &artifacts,
                manifest,
                &profile.output.public_path,
            ),
            _ => Vec::new(),
        };

        let update = match (previous, profile.dev_server()) {
            (Some(_), Some(server)) => Some(hot::plan(
                &changes,
                &graph,
                self.pipeline.contains(Stage::HotUpdate),
                &server.full_reload_patterns,
            )),
            _ => None,
        };

        let snapshot = BuildSnapshot {
            graph,
            modules,
            chunks,
            artifacts,
            manifest,
            changes,
            update,
            warnings,
            hints,
            written,
            duration: started.elapsed(),
        };

        info!(
            mode = %profile.mode(),
            modules = snapshot.graph.len(),
            chunks = snapshot.chunks.len(),
            files = snapshot.artifacts.len(),
            changed = snapshot.changes.changed_ids().len(),
            ms = snapshot.duration.as_millis() as u64,
            "build finished"
        );
        if self.pipeline.contains(Stage::Report) {
            let summary = snapshot.summary(profile.mode());
            match serde_json::to_string(&summary) {
                Ok(json) => info!(target: "sheaf::report", "{json}"),
                Err(err) => warn!("cannot serialize build summary: {err}"),
            }
        }
        Ok(snapshot)
    }

    /// Split graph errors into fatal errors and warnings for this mode.
    fn triage(&self, errors: Vec<GraphError>) -> (Vec<BuildError>, Vec<BuildError>) {
        let recoverable = self.profile.is_development();
        let mut fatal = Vec::new();
        let mut warnings = Vec::new();
        for err in errors {
            if recoverable && err.is_resolution() {
                warn!("{err}; using a stub");
                warnings.push(BuildError::Resolution(err));
            } else {
                fatal.push(BuildError::Resolution(err));
            }
        }
        (fatal, warnings)
    }

    /// Run every script module through the production minimizer, collecting every
    /// failure before giving up.
    async fn minify(&self, modules: &mut TransformedModules) -> Result<()> {
        let ModeSettings::Production(production) = &self.profile.mode else {
            return Ok(());
        };
        let name = production.minimizer.as_str();
        let engine = self.registry.get(name);

        let mut scripts: Vec<(ModuleId, String)> = modules
            .values()
            .filter_map(|done| match &done.output {
                ModuleOutput::Code {
                    kind: ContentKind::Script,
                    code,
                } => Some((done.id.clone(), code.clone())),
                _ => None,
            })
            .collect();
        scripts.sort_by(|a, b| a.0.cmp(&b.0));

        let mut errors = Vec::new();
        for (id, code) in scripts {
            let failure = |message: String| BuildError::Minify {
                module: id.clone(),
                engine: name.to_string(),
                message,
            };
            let Some(engine) = engine else {
                return Err(failure("engine is not registered".to_string()));
            };
            let limit = engine.timeout().unwrap_or(self.profile.transform_timeout);
            let input = TransformInput {
                module: id.clone(),
                code,
                kind: ContentKind::Script,
                options: serde_json::Value::Null,
                mode: self.profile.mode(),
            };
            match tokio::time::timeout(limit, engine.transform(input)).await {
                Ok(Ok(output)) => {
                    let output = ModuleOutput::Code {
                        kind: output.kind,
                        code: output.code,
                    };
                    modules.insert(id.clone(), Arc::new(TransformedModule { id, output }));
                }
                Ok(Err(err)) => errors.push(failure(err.to_string())),
                Err(_) => errors.push(failure(format!("timed out after {}ms", limit.as_millis()))),
            }
        }
        match BuildError::aggregate(errors) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
