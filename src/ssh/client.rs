//! SSH Client implementation using russh

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use russh::keys::key::PrivateKeyWithHashAlg;
use russh::keys::{PublicKey, PublicKeyBase64};
use russh::{client, ChannelMsg, Disconnect};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::error::SshError;
use super::transport::{Credential, Endpoint, ExecOutput, RemoteSession, Transport};

/// Compute SHA256 fingerprint of public key
pub fn fingerprint(key: &PublicKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.public_key_bytes());
    let hash = hasher.finalize();
    format!("SHA256:{}", BASE64.encode(hash).trim_end_matches('='))
}

/// Client handler for russh callbacks
///
/// Unknown host keys are accepted; the fingerprint is logged so operators
/// can audit which key a host presented.
pub struct ClientHandler {
    host: String,
    port: u16,
}

impl ClientHandler {
    pub fn new(host: String, port: u16) -> Self {
        Self { host, port }
    }
}

impl client::Handler for ClientHandler {
    type Error = SshError;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        info!(
            "Accepting host key for {}:{} (fingerprint: {})",
            self.host,
            self.port,
            fingerprint(server_public_key)
        );
        Ok(true)
    }
}

/// [`Transport`] over russh
#[derive(Debug, Clone)]
pub struct RusshTransport {
    keepalive_interval: Option<Duration>,
}

impl Default for RusshTransport {
    fn default() -> Self {
        Self {
            keepalive_interval: Some(Duration::from_secs(30)),
        }
    }
}

impl RusshTransport {
    pub fn new() -> Self {
        Self::default()
    }

    async fn handshake(
        &self,
        endpoint: &Endpoint,
    ) -> Result<client::Handle<ClientHandler>, SshError> {
        let addr = format!("{}:{}", endpoint.host, endpoint.port);

        let socket_addr = tokio::net::lookup_host(&addr)
            .await
            .map_err(|e| SshError::ConnectionFailed(format!("Failed to resolve address: {}", e)))?
            .next()
            .ok_or_else(|| SshError::ConnectionFailed("No address found".to_string()))?;

        let ssh_config = client::Config {
            inactivity_timeout: None,
            keepalive_interval: self.keepalive_interval,
            keepalive_max: 3,
            ..Default::default()
        };

        let handler = ClientHandler::new(endpoint.host.clone(), endpoint.port);

        let handle = client::connect(Arc::new(ssh_config), socket_addr, handler)
            .await
            .map_err(|e| match e {
                SshError::ProtocolError(msg) => SshError::ConnectionFailed(msg),
                other => other,
            })?;

        debug!("SSH handshake completed with {}", addr);
        Ok(handle)
    }

    async fn authenticate(
        handle: &mut client::Handle<ClientHandler>,
        username: &str,
        credential: &Credential,
    ) -> Result<(), SshError> {
        let result = match credential {
            Credential::Password(password) => handle
                .authenticate_password(username, password.as_str())
                .await
                .map_err(|e| SshError::ConnectionFailed(e.to_string()))?,
            Credential::PrivateKey(key) => {
                let key_with_hash = PrivateKeyWithHashAlg::new(Arc::clone(key), None);
                handle
                    .authenticate_publickey(username, key_with_hash)
                    .await
                    .map_err(|e| SshError::ConnectionFailed(e.to_string()))?
            }
        };

        if !result.success() {
            return Err(SshError::AuthRejected(format!(
                "{} authentication rejected by server",
                credential.method()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for RusshTransport {
    async fn connect(
        &self,
        endpoint: &Endpoint,
        credential: &Credential,
        timeout: Duration,
    ) -> Result<Box<dyn RemoteSession>, SshError> {
        info!(
            "Connecting to SSH server at {}:{} as {} ({})",
            endpoint.host,
            endpoint.port,
            endpoint.username,
            credential.method()
        );

        // Handshake and authentication share one deadline
        let deadline = tokio::time::Instant::now() + timeout;

        let mut handle = tokio::time::timeout_at(deadline, self.handshake(endpoint))
            .await
            .map_err(|_| SshError::Timeout("Connection timed out".to_string()))??;

        let auth = tokio::time::timeout_at(
            deadline,
            Self::authenticate(&mut handle, &endpoint.username, credential),
        )
        .await
        .unwrap_or_else(|_| Err(SshError::Timeout("Authentication timed out".to_string())));

        if let Err(e) = auth {
            // Handle is dropped either way; say goodbye first
            let _ = handle
                .disconnect(Disconnect::ByApplication, "Authentication failed", "en")
                .await;
            return Err(e);
        }

        info!("SSH authentication successful");
        Ok(Box::new(RusshSession {
            handle: Some(handle),
            label: format!("{}@{}:{}", endpoint.username, endpoint.host, endpoint.port),
        }))
    }
}

/// Authenticated russh connection; one exec channel per command
pub struct RusshSession {
    handle: Option<client::Handle<ClientHandler>>,
    label: String,
}

#[async_trait]
impl RemoteSession for RusshSession {
    async fn run(&mut self, command: &str, timeout: Duration) -> Result<ExecOutput, SshError> {
        let handle = self.handle.as_ref().ok_or(SshError::Disconnected)?;

        let mut channel = None;
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_code: Option<u32> = None;

        // Opening the channel counts against the command's timeout too
        let result = tokio::time::timeout(timeout, async {
            let channel = channel.insert(handle.channel_open_session().await.map_err(|e| {
                SshError::ChannelError(format!("Failed to open exec channel: {}", e))
            })?);

            channel
                .exec(true, command)
                .await
                .map_err(|e| SshError::ChannelError(format!("Failed to execute command: {}", e)))?;

            // Exit status may arrive after EOF, so read until the channel closes
            loop {
                match channel.wait().await {
                    Some(ChannelMsg::Data { data }) => {
                        stdout.extend_from_slice(&data);
                    }
                    Some(ChannelMsg::ExtendedData { data, ext: 1 }) => {
                        stderr.extend_from_slice(&data);
                    }
                    Some(ChannelMsg::ExitStatus { exit_status }) => {
                        exit_code = Some(exit_status);
                    }
                    Some(ChannelMsg::Close) | None => break,
                    Some(_) => {}
                }
            }
            Ok::<(), SshError>(())
        })
        .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                warn!("Exec on {} timed out after {:?}", self.label, timeout);
                if let Some(channel) = channel {
                    let _ = channel.close().await;
                }
                return Err(SshError::Timeout(format!(
                    "Command timed out after {} seconds",
                    timeout.as_secs()
                )));
            }
        }

        let output = ExecOutput {
            stdout,
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_code,
        };

        debug!(
            "Exec on {} completed: exit={:?} stdout_len={} stderr_len={}",
            self.label,
            output.exit_code,
            output.stdout.len(),
            output.stderr.len()
        );

        Ok(output)
    }

    async fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle
                .disconnect(Disconnect::ByApplication, "Session closed", "en")
                .await
            {
                debug!("Disconnect from {} failed: {}", self.label, e);
            }
            info!("SSH session closed: {}", self.label);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssh::auth::parse_private_key;
    use crate::testing::TEST_ED25519_KEY;
    use russh::server::{self, Auth, Msg, Session};
    use russh::{Channel, ChannelId, CryptoVec};
    use std::net::SocketAddr;
    use zeroize::Zeroizing;

    /// How the in-process server behaves once a client is in
    #[derive(Clone)]
    enum Script {
        StallAuth,
        StallChannelOpen,
        Reply { stdout: Vec<u8>, exit_status: u32 },
    }

    struct ScriptedServer {
        script: Script,
    }

    const STALL: Duration = Duration::from_secs(3600);

    impl server::Handler for ScriptedServer {
        type Error = russh::Error;

        async fn auth_password(&mut self, _user: &str, _password: &str) -> Result<Auth, Self::Error> {
            if let Script::StallAuth = self.script {
                tokio::time::sleep(STALL).await;
            }
            Ok(Auth::Accept)
        }

        async fn channel_open_session(
            &mut self,
            _channel: Channel<Msg>,
            _session: &mut Session,
        ) -> Result<bool, Self::Error> {
            if let Script::StallChannelOpen = self.script {
                tokio::time::sleep(STALL).await;
            }
            Ok(true)
        }

        async fn exec_request(
            &mut self,
            channel: ChannelId,
            _data: &[u8],
            session: &mut Session,
        ) -> Result<(), Self::Error> {
            if let Script::Reply {
                stdout,
                exit_status,
            } = &self.script
            {
                session.channel_success(channel)?;
                session.data(channel, CryptoVec::from(&stdout[..]))?;
                session.exit_status_request(channel, *exit_status)?;
                session.eof(channel)?;
                session.close(channel)?;
            }
            Ok(())
        }
    }

    /// Serve one connection on a loopback port
    async fn scripted_server(script: Script) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut config = server::Config::default();
        config.keys.push(parse_private_key(TEST_ED25519_KEY).unwrap());
        let config = Arc::new(config);

        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            if let Ok(session) = server::run_stream(config, socket, ScriptedServer { script }).await {
                let _ = session.await;
            }
        });

        addr
    }

    fn loopback(addr: SocketAddr) -> Endpoint {
        Endpoint {
            host: "127.0.0.1".to_string(),
            port: addr.port(),
            username: "root".to_string(),
        }
    }

    fn password() -> Credential {
        Credential::Password(Zeroizing::new("pw".to_string()))
    }

    #[test]
    fn test_fingerprint_format() {
        let key = parse_private_key(TEST_ED25519_KEY).unwrap();
        let fp = fingerprint(key.public_key());

        assert!(fp.starts_with("SHA256:"));
        assert!(!fp.ends_with('='));
        // 32-byte digest, unpadded base64
        assert_eq!(fp.len(), "SHA256:".len() + 43);
        assert_eq!(fp, fingerprint(key.public_key()));
    }

    #[tokio::test]
    async fn test_connect_unresolvable_host() {
        let endpoint = Endpoint {
            host: "host.invalid".to_string(),
            port: 22,
            username: "root".to_string(),
        };

        let result = RusshTransport::new()
            .connect(&endpoint, &password(), Duration::from_secs(5))
            .await;
        assert!(matches!(
            result,
            Err(SshError::ConnectionFailed(_)) | Err(SshError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn test_run_returns_raw_stdout_and_status() {
        let addr = scripted_server(Script::Reply {
            stdout: b"Log:\n  Level: \xff\n".to_vec(),
            exit_status: 3,
        })
        .await;

        let mut session = RusshTransport::new()
            .connect(&loopback(addr), &password(), Duration::from_secs(10))
            .await
            .unwrap();
        let output = session
            .run("cat /etc/XrayR/config.yml", Duration::from_secs(10))
            .await
            .unwrap();
        session.close().await;

        assert_eq!(output.stdout, b"Log:\n  Level: \xff\n".to_vec());
        assert!(output.stdout_text().is_err());
        assert_eq!(output.exit_code, Some(3));
    }

    #[tokio::test]
    async fn test_stalled_channel_open_hits_command_timeout() {
        let addr = scripted_server(Script::StallChannelOpen).await;

        let mut session = RusshTransport::new()
            .connect(&loopback(addr), &password(), Duration::from_secs(10))
            .await
            .unwrap();

        let started = std::time::Instant::now();
        let result = session.run("true", Duration::from_millis(500)).await;
        session.close().await;

        assert!(matches!(result, Err(SshError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_stalled_auth_hits_connect_deadline() {
        let addr = scripted_server(Script::StallAuth).await;

        let started = std::time::Instant::now();
        let result = RusshTransport::new()
            .connect(&loopback(addr), &password(), Duration::from_secs(1))
            .await;

        assert!(matches!(result, Err(SshError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
