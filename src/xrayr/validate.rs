//! Structural validation of a simplified config

use thiserror::Error;

use super::schema::SimplifiedConfig;

/// First rule a config broke. Node numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("At least one node must be configured, node list is empty")]
    NoNodes,

    #[error("Node {node}: api_host must not be empty")]
    MissingApiHost { node: usize },

    #[error("Node {node}: api_key must not be empty")]
    MissingApiKey { node: usize },

    #[error("Node {node}: node_id must be a positive integer, got {value}")]
    InvalidNodeId { node: usize, value: i64 },

    #[error("Node {node}: node_type must not be empty")]
    MissingNodeType { node: usize },
}

impl ValidationError {
    /// 1-based position of the offending node, if the error is node-specific
    pub fn node(&self) -> Option<usize> {
        match self {
            ValidationError::NoNodes => None,
            ValidationError::MissingApiHost { node }
            | ValidationError::MissingApiKey { node }
            | ValidationError::InvalidNodeId { node, .. }
            | ValidationError::MissingNodeType { node } => Some(*node),
        }
    }
}

/// Check the rules in order; the first failure wins
pub fn validate(config: &SimplifiedConfig) -> Result<(), ValidationError> {
    if config.nodes.is_empty() {
        return Err(ValidationError::NoNodes);
    }

    for (index, node) in config.nodes.iter().enumerate() {
        let position = index + 1;
        let api = &node.api_config;

        if api.api_host.is_empty() {
            return Err(ValidationError::MissingApiHost { node: position });
        }
        if api.api_key.is_empty() {
            return Err(ValidationError::MissingApiKey { node: position });
        }
        if api.node_id <= 0 {
            return Err(ValidationError::InvalidNodeId {
                node: position,
                value: api.node_id,
            });
        }
        if api.node_type.is_empty() {
            return Err(ValidationError::MissingNodeType { node: position });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xrayr::schema::{ApiConfig, NodeConfig};

    fn node(host: &str, key: &str, id: i64, kind: &str) -> NodeConfig {
        NodeConfig {
            api_config: ApiConfig {
                api_host: host.to_string(),
                api_key: key.to_string(),
                node_id: id,
                node_type: kind.to_string(),
                ..ApiConfig::default()
            },
            ..NodeConfig::default()
        }
    }

    fn config(nodes: Vec<NodeConfig>) -> SimplifiedConfig {
        SimplifiedConfig {
            nodes,
            ..SimplifiedConfig::default()
        }
    }

    #[test]
    fn test_empty_nodes_rejected() {
        let err = validate(&config(vec![])).unwrap_err();
        assert_eq!(err, ValidationError::NoNodes);

        let reason = err.to_string();
        assert!(reason.contains("node"));
        assert!(reason.contains("empty"));
    }

    #[test]
    fn test_non_positive_node_id_cites_position() {
        for bad in [0, -3] {
            let cfg = config(vec![node("http://a", "k", 1, "V2ray"), node("http://b", "k", bad, "V2ray")]);
            let err = validate(&cfg).unwrap_err();

            assert_eq!(err, ValidationError::InvalidNodeId { node: 2, value: bad });
            assert_eq!(err.node(), Some(2));
            assert!(err.to_string().starts_with("Node 2:"));
        }
    }

    #[test]
    fn test_rules_apply_in_order() {
        assert_eq!(
            validate(&config(vec![node("", "", 0, "")])),
            Err(ValidationError::MissingApiHost { node: 1 })
        );
        assert_eq!(
            validate(&config(vec![node("h", "", 0, "")])),
            Err(ValidationError::MissingApiKey { node: 1 })
        );
        assert_eq!(
            validate(&config(vec![node("h", "k", 0, "")])),
            Err(ValidationError::InvalidNodeId { node: 1, value: 0 })
        );
        assert_eq!(
            validate(&config(vec![node("h", "k", 1, "")])),
            Err(ValidationError::MissingNodeType { node: 1 })
        );
    }

    #[test]
    fn test_first_failing_node_wins() {
        let cfg = config(vec![
            node("h", "k", 1, "V2ray"),
            node("h", "", 2, "V2ray"),
            node("", "k", 3, "V2ray"),
        ]);
        assert_eq!(validate(&cfg), Err(ValidationError::MissingApiKey { node: 2 }));
    }

    #[test]
    fn test_valid_config() {
        let cfg = config(vec![node("http://h:1", "k", 7, "V2ray"), node("h", "k", 8, "Trojan")]);
        assert!(validate(&cfg).is_ok());
    }
}
