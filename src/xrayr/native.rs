//! Native XrayR configuration: YAML text <-> tree <-> simplified schema

use serde_yaml::{Mapping, Value};
use tracing::{debug, warn};

use super::error::TransformError;
use super::schema::{read_field, CoreConfig, LogConfig, NodeConfig, SimplifiedConfig};

const LOG_KEY: &str = "Log";
const NODES_KEY: &str = "Nodes";

/// Untyped tree mirroring the on-disk XrayR schema
///
/// Only obtainable by parsing native text or by expanding a simplified config.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeConfig {
    root: Mapping,
}

impl NativeConfig {
    fn from_mapping(root: Mapping) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Mapping {
        &self.root
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

/// Parse native YAML text
///
/// An empty (or comment-only) document yields an empty tree.
pub fn parse_native(text: &str) -> Result<NativeConfig, TransformError> {
    if text.trim().is_empty() {
        return Ok(NativeConfig::from_mapping(Mapping::new()));
    }

    let value: Value =
        serde_yaml::from_str(text).map_err(|e| TransformError::Parse(e.to_string()))?;

    match value {
        Value::Null => Ok(NativeConfig::from_mapping(Mapping::new())),
        Value::Mapping(map) => {
            debug!("Parsed native config with {} top-level keys", map.len());
            Ok(NativeConfig::from_mapping(map))
        }
        other => Err(TransformError::Parse(format!(
            "document root must be a mapping, found {}",
            value_kind(&other)
        ))),
    }
}

/// Serialize a native tree to YAML text, preserving key order and casing
pub fn serialize_native(tree: &NativeConfig) -> Result<String, TransformError> {
    serde_yaml::to_string(&tree.root).map_err(|e| TransformError::Serialization(e.to_string()))
}

/// Reduce a native tree to the simplified schema
///
/// Never fails: missing sections and keys take their defaults, and keys not
/// represented in the simplified schema are dropped. Node order is preserved.
pub fn simplify(tree: &NativeConfig) -> SimplifiedConfig {
    let root = Value::Mapping(tree.root.clone());

    let log: LogConfig = read_field(Some(&root), LOG_KEY).unwrap_or_default();

    let nodes = match tree.get(NODES_KEY) {
        Some(Value::Sequence(entries)) => entries
            .iter()
            .map(|entry| NodeConfig::from_native_section(Some(entry)))
            .collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            warn!(
                "Native {} is a {}, expected a sequence; treating as empty",
                NODES_KEY,
                value_kind(other)
            );
            Vec::new()
        }
    };

    SimplifiedConfig {
        log,
        core: CoreConfig::from_native_section(Some(&root)),
        nodes,
        api: Mapping::new(),
        cert: Mapping::new(),
    }
}

/// Expand a simplified config into the full native schema
///
/// Emits `Log`, the core keys, then `Nodes`, matching XrayR's sample layout.
pub fn expand(config: &SimplifiedConfig) -> NativeConfig {
    let mut root = Mapping::new();

    root.insert(Value::from(LOG_KEY), Value::Mapping(config.log.to_native_section()));

    for (key, value) in config.core.to_native_section() {
        root.insert(key, value);
    }

    let nodes = config
        .nodes
        .iter()
        .map(|node| Value::Mapping(node.to_native_section()))
        .collect();
    root.insert(Value::from(NODES_KEY), Value::Sequence(nodes));

    NativeConfig::from_mapping(root)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}
