//! XrayR Config Transform Pipeline
//!
//! ```text
//! text ──parse_native──▶ NativeConfig ──simplify──▶ SimplifiedConfig ──validate
//! text ◀─serialize_native─ NativeConfig ◀──expand──┘
//! ```

mod error;
mod native;
mod schema;
mod template;
mod validate;

pub use error::TransformError;
pub use native::{expand, parse_native, serialize_native, simplify, NativeConfig};
pub use schema::{
    ApiConfig, CertConfig, ControllerConfig, CoreConfig, FieldMapping, LogConfig, NodeConfig,
    SimplifiedConfig,
};
pub use template::default_template;
pub use validate::{validate, ValidationError};

/// Parse and reduce native text in one step
pub fn simplify_text(text: &str) -> Result<SimplifiedConfig, TransformError> {
    Ok(simplify(&parse_native(text)?))
}

/// Expand and serialize a simplified config in one step
pub fn render(config: &SimplifiedConfig) -> Result<String, TransformError> {
    serialize_native(&expand(config))
}
