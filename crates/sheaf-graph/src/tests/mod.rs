mod builder_tests;
mod graph_tests;

use std::sync::Arc;

use indexmap::IndexMap;

use crate::{GraphBuilder, MemoryRuntime};

pub(crate) const ROOT: &str = "/app";

pub(crate) fn extensions() -> Vec<String> {
    [".ts", ".tsx", ".js", ".jsx", ".css"]
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

pub(crate) fn builder(runtime: &MemoryRuntime) -> GraphBuilder {
    GraphBuilder::new(Arc::new(runtime.clone()), ROOT, extensions()).max_parallel(4)
}

pub(crate) fn entries(pairs: &[(&str, &[&str])]) -> IndexMap<String, Vec<String>> {
    pairs
        .iter()
        .map(|(name, modules)| {
            (
                name.to_string(),
                modules.iter().map(|module| module.to_string()).collect(),
            )
        })
        .collect()
}
