//! Rule chain evaluation.
//!
//! Asset rules run as their own pass and take precedence: a module matched by an
//! asset rule is emitted as a file and never reaches a code transform. Structural
//! rules are tried in declaration order and the first one whose `test` matches and
//! whose `exclude` does not wins.

use sheaf_config::{AssetRule, Rule, TransformDescriptor};
use sheaf_graph::ModuleId;

use crate::engines::EngineRegistry;
use crate::error::BuildError;

/// How one module is processed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Treatment<'a> {
    /// Copied to the output under `filename` (a `[name]`/`[ext]` template).
    Asset { rule_index: usize, filename: &'a str },
    /// Passed through the engines of structural rule `rule_index`, in order.
    Transform {
        rule_index: usize,
        chain: &'a [TransformDescriptor],
    },
    /// No rule matched; the source is used as is.
    PassThrough,
}

impl Treatment<'_> {
    pub fn is_asset(&self) -> bool {
        matches!(self, Treatment::Asset { .. })
    }

    /// Engines to run, empty for assets and pass-through modules.
    pub fn chain(&self) -> &[TransformDescriptor] {
        match self {
            Treatment::Transform { chain, .. } => chain,
            _ => &[],
        }
    }
}

/// Ordered transform list for `module_id`; empty when no structural rule matches.
pub fn transforms_for<'a>(module_id: &str, rules: &'a [Rule]) -> &'a [TransformDescriptor] {
    matching_rule(module_id, rules)
        .map(|(_, rule)| rule.chain.as_slice())
        .unwrap_or(&[])
}

/// First structural rule matching `module_id`, with its declaration index.
pub fn matching_rule<'a>(module_id: &str, rules: &'a [Rule]) -> Option<(usize, &'a Rule)> {
    rules.iter().enumerate().find(|(_, rule)| rule.matches(module_id))
}

/// First asset rule matching `module_id`.
pub fn matching_asset<'a>(module_id: &str, assets: &'a [AssetRule]) -> Option<(usize, &'a AssetRule)> {
    assets
        .iter()
        .enumerate()
        .find(|(_, asset)| asset.test.is_match(module_id))
}

/// Combine both passes for one module.
pub fn classify<'a>(module_id: &str, rules: &'a [Rule], assets: &'a [AssetRule]) -> Treatment<'a> {
    if let Some((rule_index, asset)) = matching_asset(module_id, assets) {
        return Treatment::Asset {
            rule_index,
            filename: &asset.filename,
        };
    }
    match matching_rule(module_id, rules) {
        Some((rule_index, rule)) => Treatment::Transform {
            rule_index,
            chain: &rule.chain,
        },
        None => Treatment::PassThrough,
    }
}

/// Fail on the first engine in `treatment` that `registry` cannot provide.
pub fn check_engines(
    module: &ModuleId,
    treatment: &Treatment<'_>,
    registry: &EngineRegistry,
) -> Result<(), BuildError> {
    let Treatment::Transform { rule_index, chain } = treatment else {
        return Ok(());
    };
    match chain.iter().find(|step| !registry.contains(&step.engine)) {
        Some(step) => Err(BuildError::UnknownTransform {
            module: module.clone(),
            rule_index: *rule_index,
            engine: step.engine.clone(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use sheaf_config::{Mode, Pattern, defaults};

    use super::*;

    fn rule(test: &str, engines: &[&str]) -> Rule {
        Rule::new(
            Pattern::new(test).unwrap(),
            engines.iter().map(|e| TransformDescriptor::new(*e)).collect(),
        )
    }

    fn engine_names(chain: &[TransformDescriptor]) -> Vec<&str> {
        chain.iter().map(|step| step.engine.as_str()).collect()
    }

    #[test]
    fn first_matching_rule_wins() {
        let rules = vec![rule(r"\.tsx?$", &["script"]), rule(r"\.ts$", &["other"])];
        assert_eq!(engine_names(transforms_for("a.ts", &rules)), vec!["script"]);
    }

    #[test]
    fn exclusion_is_checked_before_inclusion() {
        let rules = vec![
            rule(r"\.tsx$", &["script"]).exclude(Pattern::new(r"\.stories\.tsx$").unwrap()),
            rule(r"\.tsx$", &["fallback"]),
        ];
        assert_eq!(engine_names(transforms_for("button.tsx", &rules)), vec!["script"]);
        assert_eq!(
            engine_names(transforms_for("button.stories.tsx", &rules)),
            vec!["fallback"]
        );
    }

    #[test]
    fn unmatched_modules_pass_through() {
        let rules = vec![rule(r"\.css$", &["css"])];
        assert!(transforms_for("data.json", &rules).is_empty());
        assert_eq!(classify("data.json", &rules, &[]), Treatment::PassThrough);
    }

    #[test]
    fn asset_rules_take_precedence_over_structural_rules() {
        // The production defaults carry both a script rule and a font rule; `.svg`
        // would otherwise fall to nothing, so add a catch-all rule to force overlap.
        let profile = defaults::mode_defaults(Mode::Production);
        let mut rules = profile.rules.unwrap();
        rules.push(rule(r".*", &["script"]));
        let assets = profile.assets.unwrap();

        let treatment = classify("fonts/icons.svg", &rules, &assets);
        assert!(treatment.is_asset());
        assert!(treatment.chain().is_empty());
        assert_eq!(
            treatment,
            Treatment::Asset {
                rule_index: 0,
                filename: "fonts/[name].[ext]"
            }
        );
    }

    #[test]
    fn production_defaults_route_css_through_extraction() {
        let rules = defaults::mode_defaults(Mode::Production).rules.unwrap();
        assert_eq!(
            engine_names(transforms_for("client/app.css", &rules)),
            vec!["css", "css-extract"]
        );
        assert!(transforms_for("node_modules/lib/index.js", &rules).is_empty());
    }

    #[test]
    fn unknown_engine_reports_rule_index() {
        let rules = vec![rule(r"\.css$", &["css"]), rule(r"\.js$", &["script", "babel"])];
        let registry = EngineRegistry::with_builtins();
        let module = ModuleId::new("client/a.js").unwrap();
        let treatment = classify(module.as_str(), &rules, &[]);

        let err = check_engines(&module, &treatment, &registry).unwrap_err();
        assert!(matches!(
            err,
            BuildError::UnknownTransform { rule_index: 1, ref engine, .. } if engine == "babel"
        ));
    }
}
