//! Configuration for graph-sync.
//!
//! Layered: defaults -> config file -> env vars. The config file lives
//! at `~/.config/graph-sync/config.toml`; env vars use the
//! `GRAPHSYNC_` prefix.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use crate::entity::EntityKind;
use crate::error::ConfigError;

/// Which mapping strategy drives the write path.
///
/// A closed registry: unknown names are rejected when configuration is
/// loaded, not at first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MappingVariant {
    /// One fixed document layout, one index per entity kind
    #[default]
    SingleIndex,
    /// Projection rules decide per entity which documents go where
    RuleRouted,
}

impl MappingVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingVariant::SingleIndex => "single-index",
            MappingVariant::RuleRouted => "rule-routed",
        }
    }
}

impl FromStr for MappingVariant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single-index" => Ok(MappingVariant::SingleIndex),
            "rule-routed" => Ok(MappingVariant::RuleRouted),
            other => Err(ConfigError::UnknownVariant(other.to_string())),
        }
    }
}

impl std::fmt::Display for MappingVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One projection rule for the rule-routed mapping.
///
/// A rule with no condition never matches; it is inert, not a
/// catch-all. `index` and `doc_type` are literals unless they contain
/// expression grouping punctuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProjectionRuleConfig {
    /// Boolean expression over entity fields
    #[serde(default)]
    pub condition: Option<String>,

    /// Target index name, literal or expression
    #[serde(default)]
    pub index: Option<String>,

    /// Document type, literal or expression
    #[serde(default)]
    pub doc_type: Option<String>,

    /// Output field name -> expression over the entity
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

/// Top-level configuration consumed by the mapping and search layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Entity property holding the external key (e.g. a UUID)
    #[serde(default = "default_key_property")]
    pub key_property: String,

    /// Default index for node documents
    #[serde(default = "default_node_index")]
    pub node_index: String,

    /// Default index for relationship documents
    #[serde(default = "default_relationship_index")]
    pub relationship_index: String,

    /// Prefix for derived index names
    #[serde(default = "default_index_prefix")]
    pub index_prefix: String,

    /// Which mapping strategy to build
    #[serde(default)]
    pub mapping: MappingVariant,

    /// Whether properties a rule does not enumerate are copied verbatim
    #[serde(default = "default_include_remaining")]
    pub include_remaining_properties: bool,

    /// Node properties excluded from unenumerated copying
    #[serde(default)]
    pub blacklisted_node_properties: Vec<String>,

    /// Relationship properties excluded from unenumerated copying
    #[serde(default)]
    pub blacklisted_relationship_properties: Vec<String>,

    /// Projection rules for the rule-routed mapping
    #[serde(default)]
    pub rules: Vec<ProjectionRuleConfig>,
}

fn default_key_property() -> String {
    "uuid".to_string()
}

fn default_node_index() -> String {
    "graph-node".to_string()
}

fn default_relationship_index() -> String {
    "graph-relationship".to_string()
}

fn default_index_prefix() -> String {
    "graph".to_string()
}

fn default_include_remaining() -> bool {
    true
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            key_property: default_key_property(),
            node_index: default_node_index(),
            relationship_index: default_relationship_index(),
            index_prefix: default_index_prefix(),
            mapping: MappingVariant::default(),
            include_remaining_properties: default_include_remaining(),
            blacklisted_node_properties: Vec::new(),
            blacklisted_relationship_properties: Vec::new(),
            rules: Vec::new(),
        }
    }
}

impl SyncConfig {
    /// Load layered configuration from the default file location and
    /// environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::default_config_path())
    }

    /// Load layered configuration with an explicit config file path.
    pub fn load_from(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }

        let settings = builder
            .add_source(Environment::with_prefix("GRAPHSYNC").separator("__"))
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        let config: SyncConfig = settings
            .try_deserialize()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "graph-sync")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Validate values that serde defaults cannot enforce.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key_property.is_empty() {
            return Err(ConfigError::Invalid("key_property must not be empty".into()));
        }
        if self.node_index.is_empty() || self.relationship_index.is_empty() {
            return Err(ConfigError::Invalid(
                "default index names must not be empty".into(),
            ));
        }
        if self.mapping == MappingVariant::RuleRouted && self.rules.is_empty() {
            return Err(ConfigError::Invalid(
                "rule-routed mapping configured with no rules".into(),
            ));
        }
        Ok(())
    }

    /// Projection defaults view handed to the mapping layer.
    pub fn defaults(&self) -> MappingDefaults {
        MappingDefaults {
            key_property: self.key_property.clone(),
            node_index: self.node_index.clone(),
            relationship_index: self.relationship_index.clone(),
            include_remaining_properties: self.include_remaining_properties,
            blacklisted_node_properties: self.blacklisted_node_properties.clone(),
            blacklisted_relationship_properties: self.blacklisted_relationship_properties.clone(),
        }
    }
}

/// Fallbacks supplied to projection: default indices, the external key
/// property, and per-kind property blacklists.
#[derive(Debug, Clone)]
pub struct MappingDefaults {
    key_property: String,
    node_index: String,
    relationship_index: String,
    include_remaining_properties: bool,
    blacklisted_node_properties: Vec<String>,
    blacklisted_relationship_properties: Vec<String>,
}

impl MappingDefaults {
    pub fn key_property(&self) -> &str {
        &self.key_property
    }

    pub fn index_for(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Node => &self.node_index,
            EntityKind::Relationship => &self.relationship_index,
        }
    }

    pub fn include_remaining_properties(&self) -> bool {
        self.include_remaining_properties
    }

    pub fn blacklist_for(&self, kind: EntityKind) -> &[String] {
        match kind {
            EntityKind::Node => &self.blacklisted_node_properties,
            EntityKind::Relationship => &self.blacklisted_relationship_properties,
        }
    }

    pub fn is_blacklisted(&self, kind: EntityKind, property: &str) -> bool {
        self.blacklist_for(kind).iter().any(|p| p == property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.key_property, "uuid");
        assert_eq!(config.node_index, "graph-node");
        assert_eq!(config.relationship_index, "graph-relationship");
        assert_eq!(config.mapping, MappingVariant::SingleIndex);
        assert!(config.include_remaining_properties);
        config.validate().unwrap();
    }

    #[test]
    fn test_variant_from_str() {
        assert_eq!(
            "single-index".parse::<MappingVariant>().unwrap(),
            MappingVariant::SingleIndex
        );
        assert_eq!(
            "rule-routed".parse::<MappingVariant>().unwrap(),
            MappingVariant::RuleRouted
        );
    }

    #[test]
    fn test_unknown_variant_rejected_at_parse() {
        let err = "reflective".parse::<MappingVariant>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownVariant(_)));
    }

    #[test]
    fn test_rule_routed_requires_rules() {
        let config = SyncConfig {
            mapping: MappingVariant::RuleRouted,
            ..SyncConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_defaults_view() {
        let mut config = SyncConfig::default();
        config.blacklisted_node_properties = vec!["uuid".to_string()];

        let defaults = config.defaults();
        assert_eq!(defaults.index_for(EntityKind::Node), "graph-node");
        assert_eq!(
            defaults.index_for(EntityKind::Relationship),
            "graph-relationship"
        );
        assert!(defaults.is_blacklisted(EntityKind::Node, "uuid"));
        assert!(!defaults.is_blacklisted(EntityKind::Relationship, "uuid"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "key_property = \"id\"").unwrap();
        writeln!(file, "mapping = \"rule-routed\"").unwrap();
        writeln!(file, "[[rules]]").unwrap();
        writeln!(file, "condition = \"hasLabel('Person')\"").unwrap();

        let config = SyncConfig::load_from(Some(path)).unwrap();
        assert_eq!(config.key_property, "id");
        assert_eq!(config.mapping, MappingVariant::RuleRouted);
        assert_eq!(config.rules.len(), 1);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = SyncConfig::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config.node_index, "graph-node");
    }

    #[test]
    fn test_unknown_variant_rejected_at_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "mapping = \"reflective\"\n").unwrap();

        let err = SyncConfig::load_from(Some(path)).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }
}
