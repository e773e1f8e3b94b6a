//! Build stages.
//!
//! The stage list is fixed once per profile from its resolved capabilities. Stages
//! run in ascending order; optional ones are simply absent.

use serde::Serialize;
use sheaf_config::{BuildProfile, Capability};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Resolve and load the module graph.
    Graph = 0,
    /// Run rule chains over every invalidated module.
    Transform = 10,
    /// Run script modules through the production minimizer.
    Minify = 15,
    /// Partition modules into chunks.
    Split = 20,
    Render = 30,
    /// Move style output into per-chunk `.css` files.
    ExtractCss = 35,
    /// Content-hash file names.
    Fingerprint = 50,
    /// Emit `.map` sidecars.
    SourceMaps = 55,
    Write = 60,
    Manifest = 70,
    PerformanceHints = 80,
    /// Compute the client update for a rebuild.
    HotUpdate = 90,
    /// Log a machine-readable summary.
    Report = 100,
}

impl Stage {
    fn for_capability(capability: Capability) -> Option<Stage> {
        match capability {
            Capability::ExtractCss => Some(Stage::ExtractCss),
            Capability::Minify => Some(Stage::Minify),
            Capability::SourceMapFiles => Some(Stage::SourceMaps),
            Capability::Manifest => Some(Stage::Manifest),
            Capability::HotUpdate => Some(Stage::HotUpdate),
            Capability::CiReport => Some(Stage::Report),
            // Serving is the binary's concern.
            Capability::DevServer => None,
        }
    }
}

/// Ordered stages for one profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn for_profile(profile: &BuildProfile) -> Self {
        let mut stages = vec![
            Stage::Graph,
            Stage::Transform,
            Stage::Split,
            Stage::Render,
            Stage::Write,
        ];
        if profile.is_production() {
            stages.push(Stage::Fingerprint);
            if profile.performance.hints {
                stages.push(Stage::PerformanceHints);
            }
        }
        stages.extend(profile.capabilities.iter().filter_map(Stage::for_capability));
        stages.sort();
        stages.dedup();
        Self { stages }
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.stages.binary_search(&stage).is_ok()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }
}

#[cfg(test)]
mod tests {
    use sheaf_config::{ConfigFile, EnvFlags, Mode};

    use super::*;

    fn pipeline(mode: Mode, flags: EnvFlags) -> Pipeline {
        Pipeline::for_profile(&ConfigFile::default().resolve(mode, &flags))
    }

    #[test]
    fn production_pipeline_is_ordered() {
        let stages = pipeline(Mode::Production, EnvFlags::default());
        assert_eq!(
            stages.stages(),
            &[
                Stage::Graph,
                Stage::Transform,
                Stage::Minify,
                Stage::Split,
                Stage::Render,
                Stage::ExtractCss,
                Stage::Fingerprint,
                Stage::SourceMaps,
                Stage::Write,
                Stage::Manifest,
                Stage::PerformanceHints,
            ]
        );
    }

    #[test]
    fn development_pipeline_has_no_production_stages() {
        let stages = pipeline(
            Mode::Development,
            EnvFlags {
                enable_dev_server: true,
                ci: true,
            },
        );
        assert!(stages.contains(Stage::HotUpdate));
        assert!(stages.contains(Stage::Report));
        for stage in [Stage::Fingerprint, Stage::Manifest, Stage::Minify, Stage::SourceMaps] {
            assert!(!stages.contains(stage), "{stage:?}");
        }
    }
}
