//! # sheaf-graph
//!
//! Module dependency graphs for the sheaf build pipeline.
//!
//! ```text
//!  entries ──▶ GraphBuilder ──(Runtime: read + resolve)──▶ ModuleGraph snapshot
//!                   ▲                                              │
//!                   └──── touched ids ◀── ChangeSet::between ◀─────┘
//! ```
//!
//! A [`ModuleGraph`] is an immutable snapshot for one build. Each module carries its
//! scanned imports (static, re-export, dynamic, `url()`), a blake3 content hash and a
//! flag for writes to global objects. Incremental rebuilds hand the previous
//! snapshot to [`GraphBuilder::rebuild`], which re-reads only the touched modules and
//! their importers; [`ChangeSet::between`] then names what actually changed.

pub mod builder;
pub mod changes;
pub mod error;
pub mod graph;
pub mod module;
pub mod module_id;
pub mod resolve;
pub mod runtime;
pub mod scan;

#[cfg(test)]
mod tests;

pub use builder::{GraphBuild, GraphBuilder};
pub use changes::ChangeSet;
pub use error::{GraphError, Result};
pub use graph::{Dependent, ModuleGraph};
pub use module::{Import, ImportKind, Module, SourceKind};
pub use module_id::ModuleId;
pub use resolve::Resolver;
pub use runtime::{FileMetadata, NativeRuntime, Runtime, RuntimeError, RuntimeResult};

#[cfg(any(test, feature = "test-utils"))]
pub use runtime::MemoryRuntime;
