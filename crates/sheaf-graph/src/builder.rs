//! Parallel graph construction.
//!
//! Modules are read, scanned and resolved on a bounded pool of tokio tasks. The
//! builder joins every task before assembling the snapshot, so the graph is complete
//! (or the errors are) once [`GraphBuilder::build`] returns.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::error::GraphError;
use crate::graph::ModuleGraph;
use crate::module::Module;
use crate::module_id::ModuleId;
use crate::resolve::Resolver;
use crate::runtime::Runtime;

/// Result of one graph construction pass.
#[derive(Debug)]
pub struct GraphBuild {
    pub graph: ModuleGraph,
    /// Every failure seen while loading, sorted by message.
    pub errors: Vec<GraphError>,
    /// Modules read and scanned in this pass.
    pub loaded: usize,
    /// Modules carried over from the previous snapshot.
    pub reused: usize,
}

impl GraphBuild {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct GraphBuilder {
    runtime: Arc<dyn Runtime>,
    resolver: Arc<Resolver>,
    max_parallel: usize,
    stub_unresolved: bool,
}

struct Loaded {
    module: Module,
    errors: Vec<GraphError>,
}

impl GraphBuilder {
    pub fn new(runtime: Arc<dyn Runtime>, root: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            runtime,
            resolver: Arc::new(Resolver::new(root, extensions)),
            max_parallel: num_cpus::get().max(1),
            stub_unresolved: false,
        }
    }

    /// Upper bound on concurrently loading modules.
    pub fn max_parallel(mut self, max: usize) -> Self {
        self.max_parallel = max.max(1);
        self
    }

    /// Replace unresolvable specifiers with throwing stub modules instead of leaving
    /// the edge dangling. The error is still reported.
    pub fn stub_unresolved(mut self, enabled: bool) -> Self {
        self.stub_unresolved = enabled;
        self
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Build a fresh snapshot from entry declarations.
    pub async fn build(&self, entries: &IndexMap<String, Vec<String>>) -> GraphBuild {
        self.rebuild(entries, None, &FxHashSet::default()).await
    }

    /// Build a snapshot, reusing modules of `previous` that were not touched.
    ///
    /// Importers of touched modules and modules holding stubs are re-read too, so
    /// deleted and newly created files re-resolve.
    pub async fn rebuild(
        &self,
        entries: &IndexMap<String, Vec<String>>,
        previous: Option<&ModuleGraph>,
        touched: &FxHashSet<ModuleId>,
    ) -> GraphBuild {
        let reload = previous
            .map(|graph| reload_set(graph, touched))
            .unwrap_or_default();

        let mut errors = Vec::new();
        let mut modules: Vec<Arc<Module>> = Vec::new();
        let mut seen: FxHashSet<ModuleId> = FxHashSet::default();
        let mut pending: VecDeque<ModuleId> = VecDeque::new();
        let mut entry_ids: IndexMap<String, Vec<ModuleId>> = IndexMap::new();

        for (name, specifiers) in entries {
            let mut ids = Vec::with_capacity(specifiers.len());
            for specifier in specifiers {
                match self.resolve_entry(specifier).await {
                    Ok(id) => {
                        pending.push_back(id.clone());
                        ids.push(id);
                    }
                    Err(err) => {
                        if self.stub_unresolved {
                            let id = ModuleId::missing(specifier, None);
                            if seen.insert(id.clone()) {
                                modules.push(Arc::new(Module::stub(id.clone(), specifier)));
                            }
                            ids.push(id);
                        }
                        errors.push(err);
                    }
                }
            }
            entry_ids.insert(name.clone(), ids);
        }

        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let mut join_set: JoinSet<Result<Loaded, GraphError>> = JoinSet::new();
        let mut loaded = 0;
        let mut reused = 0;

        loop {
            while let Some(id) = pending.pop_front() {
                if id.is_missing() || !seen.insert(id.clone()) {
                    continue;
                }

                let carried = previous
                    .filter(|_| !reload.contains(&id))
                    .and_then(|graph| graph.module(&id));
                if let Some(module) = carried {
                    pending.extend(module.dependencies().map(|(target, _)| target.clone()));
                    modules.push(Arc::clone(module));
                    reused += 1;
                    continue;
                }

                let runtime = Arc::clone(&self.runtime);
                let resolver = Arc::clone(&self.resolver);
                let semaphore = Arc::clone(&semaphore);
                let stub = self.stub_unresolved;
                join_set.spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|err| GraphError::Task(err.to_string()))?;
                    load_module(runtime.as_ref(), &resolver, id, stub).await
                });
            }

            let Some(joined) = join_set.join_next().await else {
                break;
            };

            match joined {
                Ok(Ok(Loaded { module, errors: import_errors })) => {
                    errors.extend(import_errors);
                    for import in &module.imports {
                        let Some(target) = &import.resolved else {
                            continue;
                        };
                        if target.is_missing() {
                            if seen.insert(target.clone()) {
                                modules.push(Arc::new(Module::stub(
                                    target.clone(),
                                    &import.specifier,
                                )));
                            }
                        } else if !seen.contains(target) {
                            pending.push_back(target.clone());
                        }
                    }
                    modules.push(Arc::new(module));
                    loaded += 1;
                }
                Ok(Err(err)) => errors.push(err),
                Err(join_err) => errors.push(GraphError::Task(join_err.to_string())),
            }
        }

        errors.sort_by_cached_key(|err| err.to_string());
        let graph = ModuleGraph::new(entry_ids, modules);
        info!(
            modules = graph.len(),
            loaded,
            reused,
            errors = errors.len(),
            "module graph built"
        );

        GraphBuild {
            graph,
            errors,
            loaded,
            reused,
        }
    }

    async fn resolve_entry(&self, specifier: &str) -> Result<ModuleId, GraphError> {
        let unresolved = || GraphError::Unresolved {
            specifier: specifier.to_string(),
            importer: None,
        };
        let path = self
            .resolver
            .resolve(specifier, None, self.runtime.as_ref())
            .await
            .ok_or_else(unresolved)?;
        ModuleId::from_path(self.resolver.root(), &path)
    }
}

fn reload_set(previous: &ModuleGraph, touched: &FxHashSet<ModuleId>) -> FxHashSet<ModuleId> {
    let mut reload = touched.clone();
    for id in touched {
        reload.extend(
            previous
                .dependents(id)
                .iter()
                .map(|dependent| dependent.importer.clone()),
        );
    }
    for module in previous.modules() {
        let holds_stub = module
            .imports
            .iter()
            .any(|import| import.resolved.as_ref().is_none_or(ModuleId::is_missing));
        if holds_stub {
            reload.insert(module.id.clone());
        }
    }
    reload
}

async fn load_module(
    runtime: &dyn Runtime,
    resolver: &Resolver,
    id: ModuleId,
    stub_unresolved: bool,
) -> Result<Loaded, GraphError> {
    let path = id.to_path(resolver.root());
    let source = runtime
        .read_file(&path)
        .await
        .map_err(|source| GraphError::Read {
            path: path.clone(),
            source,
        })?;

    let mut module = Module::from_source(id, path, source);
    let mut errors = Vec::new();

    for import in &mut module.imports {
        match resolver
            .resolve(&import.specifier, Some(&module.path), runtime)
            .await
        {
            Some(target) => {
                import.resolved = Some(ModuleId::from_path(resolver.root(), &target)?);
            }
            None => {
                errors.push(GraphError::Unresolved {
                    specifier: import.specifier.clone(),
                    importer: Some(module.id.clone()),
                });
                if stub_unresolved {
                    import.resolved = Some(ModuleId::missing(&import.specifier, Some(&module.id)));
                }
            }
        }
    }

    debug!(module = %module.id, imports = module.imports.len(), "loaded module");
    Ok(Loaded { module, errors })
}
