//! Transform pipeline errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    /// Native text is not well-formed YAML, or its root is not a mapping
    #[error("Failed to parse native config: {0}")]
    Parse(String),

    /// A value could not be represented as YAML
    #[error("Failed to serialize native config: {0}")]
    Serialization(String),
}
