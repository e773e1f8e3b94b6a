//! Transform execution.
//!
//! Every module is classified by the rule evaluator and run through its engine chain
//! on a bounded worker pool. Each engine call is wrapped in a timeout; a hung engine
//! becomes [`BuildError::TimedOut`] for that module. Failures are collected, never
//! short-circuited, so one build reports every broken module at once.

use std::sync::Arc;
use std::time::Duration;

use rustc_hash::{FxHashMap, FxHashSet};
use sheaf_config::{AssetRule, BuildProfile, Mode, Rule, default_asset_filename};
use sheaf_graph::{Module, ModuleGraph, ModuleId, SourceKind};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::engines::{ContentKind, EngineRegistry, TransformInput};
use crate::error::BuildError;
use crate::naming;
use crate::rules::{self, Treatment};

/// What a module became.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleOutput {
    Code { kind: ContentKind, code: String },
    /// Copied verbatim to `file_name` under the output directory.
    Asset { file_name: String, bytes: Arc<[u8]> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedModule {
    pub id: ModuleId,
    pub output: ModuleOutput,
}

impl TransformedModule {
    pub fn is_asset(&self) -> bool {
        matches!(self.output, ModuleOutput::Asset { .. })
    }
}

pub type TransformedModules = FxHashMap<ModuleId, Arc<TransformedModule>>;

/// Result of one transform pass.
#[derive(Debug, Default)]
pub struct TransformBatch {
    pub modules: TransformedModules,
    /// Sorted by module id.
    pub errors: Vec<BuildError>,
    pub transformed: usize,
    pub reused: usize,
}

impl TransformBatch {
    /// Ids of modules emitted as assets.
    pub fn asset_ids(&self) -> FxHashSet<ModuleId> {
        self.modules
            .values()
            .filter(|module| module.is_asset())
            .map(|module| module.id.clone())
            .collect()
    }
}

/// Runs rule chains over a graph snapshot.
#[derive(Debug, Clone)]
pub struct Transformer {
    registry: Arc<EngineRegistry>,
    rules: Arc<[Rule]>,
    assets: Arc<[AssetRule]>,
    timeout: Duration,
    mode: Mode,
    max_parallel: usize,
}

impl Transformer {
    pub fn new(profile: &BuildProfile, registry: Arc<EngineRegistry>) -> Self {
        Self {
            registry,
            rules: Arc::from(profile.rules.clone()),
            assets: Arc::from(profile.assets.clone()),
            timeout: profile.transform_timeout,
            mode: profile.mode(),
            max_parallel: num_cpus::get().max(1),
        }
    }

    pub fn max_parallel(mut self, max: usize) -> Self {
        self.max_parallel = max.max(1);
        self
    }

    /// Transform every module of `graph`.
    pub async fn run(&self, graph: &ModuleGraph) -> TransformBatch {
        self.run_incremental(graph, None).await
    }

    /// Transform `graph`, reusing `previous` outputs for modules outside
    /// `invalidated`.
    pub async fn run_incremental(
        &self,
        graph: &ModuleGraph,
        reuse: Option<(&TransformedModules, &FxHashSet<ModuleId>)>,
    ) -> TransformBatch {
        let mut batch = TransformBatch::default();
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let mut join_set: JoinSet<Result<TransformedModule, BuildError>> = JoinSet::new();

        for module in graph.modules() {
            let carried = reuse
                .filter(|(_, invalidated)| !invalidated.contains(&module.id))
                .and_then(|(previous, _)| previous.get(&module.id));
            if let Some(done) = carried {
                batch.modules.insert(module.id.clone(), Arc::clone(done));
                batch.reused += 1;
                continue;
            }

            let this = self.clone();
            let module = Arc::clone(module);
            let semaphore = Arc::clone(&semaphore);
            join_set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|err| BuildError::Task(err.to_string()))?;
                this.transform_module(&module).await
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(Ok(done)) => {
                    batch.modules.insert(done.id.clone(), Arc::new(done));
                    batch.transformed += 1;
                }
                Ok(Err(err)) => batch.errors.push(err),
                Err(join_err) => batch.errors.push(BuildError::Task(join_err.to_string())),
            }
        }

        batch
            .errors
            .sort_by_cached_key(|err| (err.module().cloned(), err.to_string()));
        info!(
            transformed = batch.transformed,
            reused = batch.reused,
            errors = batch.errors.len(),
            "transforms finished"
        );
        batch
    }

    async fn transform_module(&self, module: &Module) -> Result<TransformedModule, BuildError> {
        let id = module.id.clone();
        if module.is_stub {
            return Ok(TransformedModule {
                output: ModuleOutput::Code {
                    kind: ContentKind::Script,
                    code: module.text().into_owned(),
                },
                id,
            });
        }

        let treatment = rules::classify(id.as_str(), &self.rules, &self.assets);
        rules::check_engines(&id, &treatment, &self.registry)?;

        let output = match treatment {
            Treatment::Asset { filename, .. } => asset_output(module, filename),
            Treatment::PassThrough if module.kind == SourceKind::Resource => {
                asset_output(module, &default_asset_filename())
            }
            Treatment::PassThrough => ModuleOutput::Code {
                kind: initial_kind(module.kind),
                code: module.text().into_owned(),
            },
            Treatment::Transform { chain, rule_index } => {
                let mut kind = initial_kind(module.kind);
                let mut code = module.text().into_owned();
                for step in chain {
                    let engine = self.registry.get(&step.engine).ok_or_else(|| {
                        BuildError::UnknownTransform {
                            module: id.clone(),
                            rule_index,
                            engine: step.engine.clone(),
                        }
                    })?;
                    let limit = engine.timeout().unwrap_or(self.timeout);
                    let input = TransformInput {
                        module: id.clone(),
                        code,
                        kind,
                        options: step.options.clone(),
                        mode: self.mode,
                    };
                    let out = tokio::time::timeout(limit, engine.transform(input))
                        .await
                        .map_err(|_| BuildError::TimedOut {
                            module: id.clone(),
                            engine: step.engine.clone(),
                            timeout: limit,
                        })?
                        .map_err(|err| BuildError::Transform {
                            module: id.clone(),
                            engine: step.engine.clone(),
                            message: err.to_string(),
                        })?;
                    code = out.code;
                    kind = out.kind;
                }
                ModuleOutput::Code { kind, code }
            }
        };

        debug!(module = %id, asset = matches!(output, ModuleOutput::Asset { .. }), "transformed");
        Ok(TransformedModule { id, output })
    }
}

fn initial_kind(kind: SourceKind) -> ContentKind {
    match kind {
        SourceKind::Style => ContentKind::Style,
        SourceKind::Script | SourceKind::Resource => ContentKind::Script,
    }
}

fn asset_output(module: &Module, template: &str) -> ModuleOutput {
    ModuleOutput::Asset {
        file_name: naming::asset_file_name(template, &module.id, &module.source),
        bytes: Arc::clone(&module.source),
    }
}
