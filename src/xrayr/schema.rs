//! Simplified XrayR configuration schema
//!
//! Each section is declared once with `native_section!`: the simplified field
//! name, its type, the native (capitalized) key and the default. The macro
//! derives the struct, its `Default`, and both directions of the mapping from
//! that single table, so `simplify` and `expand` cannot drift apart.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// One row of a section's field table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    pub simple: &'static str,
    pub native: &'static str,
}

/// Conversion between a typed simplified value and a native YAML value
pub(crate) trait NativeValue: Sized {
    /// `None` when the native value has a different shape
    fn from_native(value: &Value) -> Option<Self>;

    fn to_native(&self) -> Value;
}

impl NativeValue for String {
    fn from_native(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            // Unquoted scalars such as `ApiKey: 123`
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    fn to_native(&self) -> Value {
        Value::String(self.clone())
    }
}

impl NativeValue for i64 {
    fn from_native(value: &Value) -> Option<Self> {
        value.as_i64()
    }

    fn to_native(&self) -> Value {
        Value::Number((*self).into())
    }
}

impl NativeValue for bool {
    fn from_native(value: &Value) -> Option<Self> {
        value.as_bool()
    }

    fn to_native(&self) -> Value {
        Value::Bool(*self)
    }
}

impl NativeValue for Vec<String> {
    fn from_native(value: &Value) -> Option<Self> {
        value
            .as_sequence()
            .map(|seq| seq.iter().filter_map(String::from_native).collect())
    }

    fn to_native(&self) -> Value {
        Value::Sequence(self.iter().map(NativeValue::to_native).collect())
    }
}

impl NativeValue for BTreeMap<String, String> {
    fn from_native(value: &Value) -> Option<Self> {
        value.as_mapping().map(|map| {
            map.iter()
                .filter_map(|(k, v)| Some((String::from_native(k)?, String::from_native(v)?)))
                .collect()
        })
    }

    fn to_native(&self) -> Value {
        Value::Mapping(
            self.iter()
                .map(|(k, v)| (Value::String(k.clone()), Value::String(v.clone())))
                .collect(),
        )
    }
}

/// Opaque passthrough (e.g. `ConnectionConfig`)
impl NativeValue for Mapping {
    fn from_native(value: &Value) -> Option<Self> {
        value.as_mapping().cloned()
    }

    fn to_native(&self) -> Value {
        Value::Mapping(self.clone())
    }
}

/// Read `key` from a native section, `None` if absent or of the wrong shape
pub(crate) fn read_field<T: NativeValue>(section: Option<&Value>, key: &str) -> Option<T> {
    let raw = section?.get(key)?;
    let parsed = T::from_native(raw);
    if parsed.is_none() && !raw.is_null() {
        tracing::warn!("Native key {} has an unexpected type, using default", key);
    }
    parsed
}

macro_rules! native_section {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $field:ident : $ty:ty => $native:literal = $default:expr
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct $name {
            $( $(#[$fmeta])* pub $field: $ty, )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self { $( $field: $default, )* }
            }
        }

        impl $name {
            /// Simplified field names and their native keys, in native order
            pub const FIELDS: &'static [FieldMapping] = &[
                $( FieldMapping { simple: stringify!($field), native: $native }, )*
            ];

            /// Absent or mistyped native keys take the field default
            pub(crate) fn from_native_section(section: Option<&Value>) -> Self {
                let defaults = Self::default();
                Self {
                    $( $field: read_field(section, $native).unwrap_or(defaults.$field), )*
                }
            }

            pub(crate) fn to_native_section(&self) -> Mapping {
                let mut section = Mapping::new();
                $(
                    section.insert(
                        Value::String($native.to_string()),
                        NativeValue::to_native(&self.$field),
                    );
                )*
                section
            }
        }

        impl NativeValue for $name {
            fn from_native(value: &Value) -> Option<Self> {
                value.as_mapping().map(|_| Self::from_native_section(Some(value)))
            }

            fn to_native(&self) -> Value {
                Value::Mapping(self.to_native_section())
            }
        }
    };
}

native_section! {
    /// `Log` section
    pub struct LogConfig {
        level: String => "Level" = "warning".to_string(),
        access_path: String => "AccessPath" = String::new(),
        error_path: String => "ErrorPath" = String::new(),
    }
}

native_section! {
    /// Top-level core keys; natively these sit directly under the root
    pub struct CoreConfig {
        dns_config_path: String => "DnsConfigPath" = String::new(),
        route_config_path: String => "RouteConfigPath" = String::new(),
        inbound_config_path: String => "InboundConfigPath" = String::new(),
        outbound_config_path: String => "OutboundConfigPath" = String::new(),
        connection_config: Mapping => "ConnectionConfig" = Mapping::new(),
    }
}

native_section! {
    /// Panel API settings of one node
    pub struct ApiConfig {
        api_host: String => "ApiHost" = String::new(),
        api_key: String => "ApiKey" = String::new(),
        node_id: i64 => "NodeID" = 0,
        node_type: String => "NodeType" = String::new(),
        /// Seconds
        timeout: i64 => "Timeout" = 30,
        enable_vless: bool => "EnableVless" = false,
        enable_xtls: bool => "EnableXTLS" = false,
    }
}

native_section! {
    pub struct ControllerConfig {
        listen_ip: String => "ListenIP" = "0.0.0.0".to_string(),
        send_ip: String => "SendIP" = "0.0.0.0".to_string(),
        /// Seconds between panel polls
        update_period: i64 => "UpdatePeriod" = 60,
        enable_dns: bool => "EnableDNS" = false,
        dns_type: String => "DNSType" = String::new(),
        enable_proxy_protocol: bool => "EnableProxyProtocol" = false,
        auto_speed_limit: i64 => "AutoSpeedLimit" = 0,
        speed_limit: i64 => "SpeedLimit" = 0,
        device_limit: i64 => "DeviceLimit" = 0,
        local_rule_list: Vec<String> => "LocalRuleList" = Vec::new(),
    }
}

native_section! {
    pub struct CertConfig {
        cert_mode: String => "CertMode" = String::new(),
        cert_domain: String => "CertDomain" = String::new(),
        cert_file: String => "CertFile" = String::new(),
        key_file: String => "KeyFile" = String::new(),
        provider: String => "Provider" = String::new(),
        email: String => "Email" = String::new(),
        dns_env: BTreeMap<String, String> => "DNSEnv" = BTreeMap::new(),
    }
}

native_section! {
    /// One entry of the native `Nodes` sequence
    pub struct NodeConfig {
        panel_type: String => "PanelType" = String::new(),
        api_config: ApiConfig => "ApiConfig" = ApiConfig::default(),
        controller_config: ControllerConfig => "ControllerConfig" = ControllerConfig::default(),
        cert_config: CertConfig => "CertConfig" = CertConfig::default(),
    }
}

/// Flattened, defaulted configuration used for storage and editing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplifiedConfig {
    pub log: LogConfig,
    pub core: CoreConfig,
    pub nodes: Vec<NodeConfig>,
    /// Not populated from the native file
    pub api: Mapping,
    /// Not populated from the native file
    pub cert: Mapping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_every_field() {
        let node: NodeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(node, NodeConfig::default());
        assert_eq!(node.api_config.timeout, 30);
        assert_eq!(node.controller_config.listen_ip, "0.0.0.0");
        assert_eq!(node.controller_config.update_period, 60);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg: SimplifiedConfig =
            serde_json::from_str(r#"{"nodes":[{"api_config":{"node_id":3}}]}"#).unwrap();
        assert_eq!(cfg.log.level, "warning");
        assert_eq!(cfg.nodes[0].api_config.node_id, 3);
        assert_eq!(cfg.nodes[0].api_config.timeout, 30);
    }

    #[test]
    fn test_field_table_uses_native_casing() {
        let natives: Vec<&str> = ApiConfig::FIELDS.iter().map(|f| f.native).collect();
        assert_eq!(
            natives,
            vec!["ApiHost", "ApiKey", "NodeID", "NodeType", "Timeout", "EnableVless", "EnableXTLS"]
        );
        assert_eq!(NodeConfig::FIELDS[0].simple, "panel_type");
        assert_eq!(NodeConfig::FIELDS[0].native, "PanelType");
    }

    #[test]
    fn test_scalar_coercion() {
        assert_eq!(String::from_native(&Value::from(123)), Some("123".to_string()));
        assert_eq!(i64::from_native(&Value::from("7")), None);
        assert_eq!(bool::from_native(&Value::from(1)), None);
    }
}
