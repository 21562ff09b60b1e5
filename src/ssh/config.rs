//! SSH Connection Descriptor

use serde::{Deserialize, Serialize};

use super::error::ConfigurationError;

/// Everything the broker needs to reach one host
///
/// Credentials stay encrypted here; they are resolved through the vault only
/// for the attempt that uses them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    /// Remote host address
    pub host: String,

    /// SSH port (default: 22)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Username for authentication
    pub username: String,

    /// Sealed OpenSSH/PEM private key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_private_key: Option<String>,

    /// Sealed password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_password: Option<String>,
}

impl ConnectionDescriptor {
    pub fn new(host: impl Into<String>, port: u16, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            encrypted_private_key: None,
            encrypted_password: None,
        }
    }

    pub fn with_private_key(mut self, sealed: impl Into<String>) -> Self {
        self.encrypted_private_key = Some(sealed.into());
        self
    }

    pub fn with_password(mut self, sealed: impl Into<String>) -> Self {
        self.encrypted_password = Some(sealed.into());
        self
    }

    pub fn has_private_key(&self) -> bool {
        self.encrypted_private_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    pub fn has_password(&self) -> bool {
        self.encrypted_password.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Usable only with a host, a user, a valid port and at least one credential
    pub fn check(&self) -> Result<(), ConfigurationError> {
        if self.host.trim().is_empty() {
            return Err(ConfigurationError::EmptyHost);
        }
        if self.username.trim().is_empty() {
            return Err(ConfigurationError::EmptyUsername);
        }
        if self.port == 0 {
            return Err(ConfigurationError::InvalidPort(self.port));
        }
        if !self.has_private_key() && !self.has_password() {
            return Err(ConfigurationError::NoCredentials);
        }
        Ok(())
    }
}

/// Which credential opened the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethodUsed {
    Key,
    Password,
}

impl std::fmt::Display for AuthMethodUsed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMethodUsed::Key => f.write_str("key"),
            AuthMethodUsed::Password => f.write_str("password"),
        }
    }
}

fn default_port() -> u16 {
    22
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_requires_a_credential() {
        let bare = ConnectionDescriptor::new("10.0.0.1", 22, "root");
        assert_eq!(bare.check(), Err(ConfigurationError::NoCredentials));

        // Empty blobs count as absent
        let empty = bare.clone().with_password("");
        assert_eq!(empty.check(), Err(ConfigurationError::NoCredentials));

        assert!(bare.clone().with_password("v1:x").check().is_ok());
        assert!(bare.with_private_key("v1:y").check().is_ok());
    }

    #[test]
    fn test_check_fields() {
        let d = ConnectionDescriptor::new("", 22, "root").with_password("v1:x");
        assert_eq!(d.check(), Err(ConfigurationError::EmptyHost));

        let d = ConnectionDescriptor::new("h", 0, "root").with_password("v1:x");
        assert_eq!(d.check(), Err(ConfigurationError::InvalidPort(0)));

        let d = ConnectionDescriptor::new("h", 22, " ").with_password("v1:x");
        assert_eq!(d.check(), Err(ConfigurationError::EmptyUsername));
    }

    #[test]
    fn test_default_port_on_deserialize() {
        let d: ConnectionDescriptor =
            serde_json::from_str(r#"{"host":"h","username":"u"}"#).unwrap();
        assert_eq!(d.port, 22);
        assert_eq!(d.address(), "h:22");
    }
}
