//! # sheaf-config
//!
//! Typed build profiles for the sheaf build pipeline.
//!
//! A build starts from three layers of configuration:
//!
//! ```text
//! built-in mode defaults  <-  [base] section  <-  [development] / [production] section
//! ```
//!
//! [`resolve`] collapses those layers into one immutable [`BuildProfile`]. The merge is
//! field-wise last-write-wins; ordered lists (rules, asset rules, chunk groups) are
//! replaced wholesale, never concatenated.
//!
//! ```
//! use sheaf_config::{resolve, EnvFlags, Mode, PartialProfile};
//!
//! let profile = resolve(
//!     &PartialProfile::default(),
//!     &PartialProfile::default(),
//!     Mode::Production,
//!     &EnvFlags::default(),
//! );
//! assert!(profile.is_production());
//! assert_eq!(profile.output.public_path, "/static/dist/");
//! ```

pub mod defaults;
pub mod error;
pub mod loading;
pub mod mode;
pub mod partial;
pub mod profile;
pub mod rules;
pub mod validation;

pub use error::{ConfigError, Result};
pub use loading::ConfigFile;
pub use mode::{EnvFlags, Mode};
pub use partial::{
    EngineConfig, PartialDevServer, PartialPerformance, PartialProfile, PartialSplit,
    SourceMapStrategy,
};
pub use profile::{
    BuildProfile, Capabilities, Capability, DevServerSettings, DevelopmentSettings, ModeSettings,
    OutputSettings, PerformanceSettings, ProductionSettings, SplitSettings, resolve,
};
pub use rules::{
    AssetRule, ChunkGroupRule, ChunkScope, Pattern, Rule, TransformDescriptor, default_asset_filename,
};
pub use validation::validate;
