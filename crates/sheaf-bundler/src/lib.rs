//! # sheaf-bundler
//!
//! Turns a resolved [`BuildProfile`](sheaf_config::BuildProfile) into output files.
//!
//! ```text
//! graph ─▶ rules + engines ─▶ minify ─▶ split ─▶ render ─▶ name/hash ─▶ write ─▶ manifest
//! ```
//!
//! The stages that run are fixed per profile by [`Pipeline::for_profile`]. A
//! [`Bundler`] can be driven once ([`Bundler::build`]) or repeatedly from its last
//! good [`BuildSnapshot`] ([`Bundler::rebuild`]), which is what the dev session does.
//!
//! ```rust,no_run
//! use sheaf_bundler::Bundler;
//! use sheaf_config::{ConfigFile, EnvFlags, Mode};
//!
//! # async fn run() -> sheaf_bundler::Result<()> {
//! let config = ConfigFile::load(std::path::Path::new("."), None)?;
//! let profile = config.resolve(Mode::Production, &EnvFlags::from_env());
//! let snapshot = Bundler::new(profile)?.build().await?;
//! println!("{} files", snapshot.artifacts.len());
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod bundler;
pub mod engines;
pub mod error;
pub mod hints;
pub mod hot;
pub mod manifest;
pub mod naming;
pub mod pipeline;
pub mod render;
pub mod rules;
pub mod sourcemap;
pub mod split;
pub mod transform;
pub mod writer;

#[cfg(test)]
mod tests;

pub use artifact::{Artifact, ArtifactKind};
pub use bundler::{BuildSnapshot, BuildSummary, Bundler};
pub use engines::{
    CommandEngine, ContentKind, EngineError, EngineRegistry, TransformEngine, TransformInput,
    TransformOutput,
};
pub use error::{BuildError, ErrorKind, Result};
pub use hints::PerformanceHint;
pub use hot::{HotUpdate, ReloadReason};
pub use manifest::{Manifest, ManifestFile};
pub use pipeline::{Pipeline, Stage};
pub use rules::{Treatment, classify, transforms_for};
pub use split::{Chunk, ChunkKind, ChunkSet, split};
pub use transform::{ModuleOutput, TransformedModule, Transformer};
