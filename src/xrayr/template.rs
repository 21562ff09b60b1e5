//! Starting configuration for newly registered targets

use serde_yaml::{Mapping, Value};

use super::schema::{ApiConfig, CertConfig, LogConfig, NodeConfig, SimplifiedConfig};
use super::schema::{ControllerConfig, CoreConfig};

/// Xray connection policy shipped with XrayR's sample config
fn default_connection_config() -> Mapping {
    [
        ("Handshake", 4),
        ("ConnIdle", 30),
        ("UplinkOnly", 2),
        ("DownlinkOnly", 4),
        ("BufferSize", 64),
    ]
    .into_iter()
    .map(|(key, value)| (Value::from(key), Value::from(value)))
    .collect()
}

/// A complete, valid config with one placeholder SSpanel node
pub fn default_template() -> SimplifiedConfig {
    SimplifiedConfig {
        log: LogConfig::default(),
        core: CoreConfig {
            connection_config: default_connection_config(),
            ..CoreConfig::default()
        },
        nodes: vec![NodeConfig {
            panel_type: "SSpanel".to_string(),
            api_config: ApiConfig {
                api_host: "http://127.0.0.1:667".to_string(),
                api_key: "123".to_string(),
                node_id: 1,
                node_type: "V2ray".to_string(),
                ..ApiConfig::default()
            },
            controller_config: ControllerConfig::default(),
            cert_config: CertConfig {
                cert_mode: "none".to_string(),
                ..CertConfig::default()
            },
        }],
        api: Mapping::new(),
        cert: Mapping::new(),
    }
}
