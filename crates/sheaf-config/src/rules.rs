//! Transform rules, asset rules, and named chunk groups.

use std::fmt;

use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::ConfigError;

/// A compiled regular expression matched against module identifiers.
///
/// Two patterns are equal when their source text is equal.
#[derive(Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(source: &str) -> Result<Self, ConfigError> {
        Regex::new(source)
            .map(Self)
            .map_err(|err| ConfigError::InvalidPattern {
                pattern: source.to_string(),
                message: err.to_string(),
            })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Pattern {}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.as_str())
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Pattern::new(&source).map_err(D::Error::custom)
    }
}

/// Reference to a transform engine plus its options.
///
/// Accepts either a bare engine name (`"css"`) or a table
/// (`{ engine = "babel", options = { ... } }`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DescriptorRepr")]
pub struct TransformDescriptor {
    pub engine: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub options: Value,
}

impl TransformDescriptor {
    pub fn new(engine: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            options: Value::Null,
        }
    }

    pub fn with_options(engine: impl Into<String>, options: Value) -> Self {
        Self {
            engine: engine.into(),
            options,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DescriptorRepr {
    Name(String),
    Full {
        engine: String,
        #[serde(default)]
        options: Value,
    },
}

impl From<DescriptorRepr> for TransformDescriptor {
    fn from(repr: DescriptorRepr) -> Self {
        match repr {
            DescriptorRepr::Name(engine) => Self::new(engine),
            DescriptorRepr::Full { engine, options } => Self { engine, options },
        }
    }
}

/// Structural transform rule: first match wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub test: Pattern,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Pattern>,
    /// Transforms in application order.
    pub chain: Vec<TransformDescriptor>,
}

impl Rule {
    pub fn new(test: Pattern, chain: Vec<TransformDescriptor>) -> Self {
        Self {
            test,
            exclude: None,
            chain,
        }
    }

    pub fn exclude(mut self, pattern: Pattern) -> Self {
        self.exclude = Some(pattern);
        self
    }

    /// Exclusion is checked before inclusion.
    pub fn matches(&self, module_id: &str) -> bool {
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(module_id) {
                return false;
            }
        }
        self.test.is_match(module_id)
    }
}

/// Asset rule: matched modules are copied to a stable output location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRule {
    pub test: Pattern,
    /// File name template; `[name]` and `[ext]` are substituted.
    #[serde(default = "default_asset_filename")]
    pub filename: String,
}

pub fn default_asset_filename() -> String {
    "fonts/[name].[ext]".to_string()
}

/// Which chunks a named group may pull modules out of.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkScope {
    /// Any module, whatever its reachability.
    #[default]
    All,
    /// Only modules that would otherwise land in an async chunk.
    Async,
    /// Only modules statically reachable from an entry.
    Initial,
}

/// Named chunk group: every matching module moves into one dedicated shared chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkGroupRule {
    pub name: String,
    pub test: Pattern,
    #[serde(default)]
    pub chunks: ChunkScope,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusion_wins_over_inclusion() {
        let rule = Rule::new(
            Pattern::new(r"\.(ts|tsx|js|jsx)$").unwrap(),
            vec![TransformDescriptor::new("script")],
        )
        .exclude(Pattern::new(r"node_modules|\.stories\.tsx").unwrap());

        assert!(rule.matches("client/app.tsx"));
        assert!(!rule.matches("node_modules/react/index.js"));
        assert!(!rule.matches("client/button.stories.tsx"));
    }

    #[test]
    fn invalid_pattern_is_config_error() {
        let err = Pattern::new("(unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn descriptor_accepts_shorthand_and_table() {
        let chain: Vec<TransformDescriptor> = serde_json::from_str(
            r#"["css", {"engine": "babel", "options": {"cacheDirectory": true}}]"#,
        )
        .unwrap();
        assert_eq!(chain[0], TransformDescriptor::new("css"));
        assert_eq!(chain[1].engine, "babel");
        assert_eq!(chain[1].options["cacheDirectory"], Value::Bool(true));
    }
}
