use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, Handle};
use russh::{ChannelMsg, Disconnect};
use russh_keys::key;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::{
    CommandRunner, HostKeyPolicy, RemoteError, RemoteExecutorFactory, ShellResult,
};

/// Connection target for one application VM.
#[derive(Debug, Clone)]
pub struct SshTarget {
    pub hostname: String,
    pub port: u16,
    pub username: String,
    pub auth: SshAuth,
    pub connect_timeout: Duration,
    pub auth_timeout: Duration,
    pub command_timeout: Duration,
}

impl SshTarget {
    /// host:port label used in logs and error context.
    pub fn address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

/// Credential material for authenticating an SSH target.
#[derive(Debug, Clone)]
pub enum SshAuth {
    Password(String),
    KeyFile {
        path: PathBuf,
        passphrase: Option<String>,
    },
}

struct HostKeyVerifier {
    policy: HostKeyPolicy,
    target: String,
}

#[async_trait]
impl client::Handler for HostKeyVerifier {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &key::PublicKey,
    ) -> Result<bool, Self::Error> {
        match &self.policy {
            HostKeyPolicy::AcceptAny => {
                warn!(
                    target = %self.target,
                    "accepting server host key without verification (accept_any policy)"
                );
                Ok(true)
            }
            HostKeyPolicy::Fingerprints(allowed) => {
                let fingerprint = server_public_key.fingerprint();
                let accepted = allowed.iter().any(|known| known == &fingerprint);
                if !accepted {
                    warn!(
                        target = %self.target,
                        fingerprint = %fingerprint,
                        "server host key fingerprint not in allow list"
                    );
                }
                Ok(accepted)
            }
        }
    }
}

/// SSH client bound to one host: connect and authenticate once, then
/// execute commands, one fresh session per command.
///
/// Connect-time or authentication-time failure leaves the client
/// unconstructed; there is no half-connected state to misuse.
pub struct SshCommandClient {
    handle: Handle<HostKeyVerifier>,
    target: SshTarget,
}

impl SshCommandClient {
    /// Open the transport, verify the host key per `policy`, authenticate.
    pub async fn connect(target: SshTarget, policy: HostKeyPolicy) -> Result<Self, RemoteError> {
        let label = target.address();
        info!(
            target = %label,
            username = %target.username,
            policy = policy.label(),
            "opening SSH connection"
        );

        let policy_label = policy.label();
        let config = Arc::new(client::Config {
            inactivity_timeout: Some(Duration::from_secs(300)),
            ..Default::default()
        });
        let verifier = HostKeyVerifier {
            policy,
            target: label.clone(),
        };

        let mut handle = timeout(
            target.connect_timeout,
            client::connect(
                config,
                (target.hostname.as_str(), target.port),
                verifier,
            ),
        )
        .await
        .map_err(|_| RemoteError::Timeout {
            target: label.clone(),
            operation: "connect",
            timeout: target.connect_timeout,
        })?
        .map_err(|source| match source {
            russh::Error::UnknownKey => RemoteError::HostKeyRejected {
                target: label.clone(),
                policy: policy_label,
            },
            source => RemoteError::Connection {
                target: label.clone(),
                source,
            },
        })?;

        let authenticated = match &target.auth {
            SshAuth::Password(password) => timeout(
                target.auth_timeout,
                handle.authenticate_password(&target.username, password),
            )
            .await
            .map_err(|_| RemoteError::Timeout {
                target: label.clone(),
                operation: "authenticate",
                timeout: target.auth_timeout,
            })?
            .map_err(|source| RemoteError::Connection {
                target: label.clone(),
                source,
            })?,
            SshAuth::KeyFile { path, passphrase } => {
                let pair = russh_keys::load_secret_key(path, passphrase.as_deref()).map_err(
                    |source| RemoteError::KeyMaterial {
                        path: path.display().to_string(),
                        source,
                    },
                )?;
                timeout(
                    target.auth_timeout,
                    handle.authenticate_publickey(&target.username, Arc::new(pair)),
                )
                .await
                .map_err(|_| RemoteError::Timeout {
                    target: label.clone(),
                    operation: "authenticate",
                    timeout: target.auth_timeout,
                })?
                .map_err(|source| RemoteError::Connection {
                    target: label.clone(),
                    source,
                })?
            }
        };

        if !authenticated {
            return Err(RemoteError::AuthenticationRejected {
                target: label,
                username: target.username.clone(),
            });
        }

        debug!(target = %label, "SSH connection authenticated");
        Ok(Self { handle, target })
    }

    /// Execute one command in a fresh session: write the command, drain
    /// stdout until the remote process exits, capture the exit code. The
    /// session is closed on every exit path, including timeout and I/O
    /// error.
    pub async fn execute(&mut self, command: &str) -> Result<ShellResult, RemoteError> {
        let label = self.target.address();
        debug!(target = %label, command, "executing remote command");

        let mut channel =
            self.handle
                .channel_open_session()
                .await
                .map_err(|source| RemoteError::Session {
                    target: label.clone(),
                    source,
                })?;

        if let Err(source) = channel.exec(true, command).await {
            let _ = channel.close().await;
            return Err(RemoteError::Session {
                target: label,
                source,
            });
        }

        let mut capture = ExecCapture::default();
        let outcome = timeout(
            self.target.command_timeout,
            drain_session(&mut channel, &mut capture),
        )
        .await;

        // Session teardown happens before any result is interpreted.
        let _ = channel.eof().await;
        let _ = channel.close().await;

        match outcome {
            Err(_) => Err(RemoteError::Timeout {
                target: label,
                operation: "execute",
                timeout: self.target.command_timeout,
            }),
            Ok(()) => capture.into_result().ok_or_else(|| RemoteError::Execution {
                target: label,
                command: command.to_string(),
                reason: "session closed before the remote process reported an exit status"
                    .to_string(),
            }),
        }
    }

    /// Tear the transport down politely.
    pub async fn disconnect(self) -> Result<(), RemoteError> {
        self.handle
            .disconnect(Disconnect::ByApplication, "cutover step complete", "English")
            .await
            .map_err(|source| RemoteError::Connection {
                target: self.target.address(),
                source,
            })
    }
}

#[async_trait]
impl CommandRunner for SshCommandClient {
    async fn run(&mut self, command: &str) -> Result<ShellResult, RemoteError> {
        self.execute(command).await
    }

    fn target(&self) -> &str {
        &self.target.hostname
    }
}

/// Pump channel messages until the remote side closes the session.
async fn drain_session(channel: &mut russh::Channel<client::Msg>, capture: &mut ExecCapture) {
    loop {
        let Some(msg) = channel.wait().await else {
            break;
        };
        capture.absorb(msg);
    }
}

/// Accumulates the observable outcome of one exec session.
#[derive(Debug, Default)]
struct ExecCapture {
    stdout: Vec<u8>,
    exit_code: Option<u32>,
}

impl ExecCapture {
    fn absorb(&mut self, msg: ChannelMsg) {
        match msg {
            ChannelMsg::Data { ref data } => self.stdout.extend_from_slice(data),
            ChannelMsg::ExitStatus { exit_status } => self.exit_code = Some(exit_status),
            _ => {}
        }
    }

    /// None when the session ended without an exit status; the caller
    /// classifies that as an execution failure.
    fn into_result(self) -> Option<ShellResult> {
        self.exit_code.map(|exit_code| ShellResult {
            stdout: String::from_utf8_lossy(&self.stdout).into_owned(),
            exit_code,
        })
    }
}

/// Builds SSH-backed runners from shared connection settings, one per VM
/// hostname.
#[derive(Debug)]
pub struct SshExecutorFactory {
    pub port: u16,
    pub username: String,
    pub auth: SshAuth,
    pub policy: HostKeyPolicy,
    pub connect_timeout: Duration,
    pub auth_timeout: Duration,
    pub command_timeout: Duration,
}

impl SshExecutorFactory {
    fn target_for(&self, hostname: &str) -> SshTarget {
        SshTarget {
            hostname: hostname.to_string(),
            port: self.port,
            username: self.username.clone(),
            auth: self.auth.clone(),
            connect_timeout: self.connect_timeout,
            auth_timeout: self.auth_timeout,
            command_timeout: self.command_timeout,
        }
    }
}

#[async_trait]
impl RemoteExecutorFactory for SshExecutorFactory {
    async fn connect(&self, hostname: &str) -> Result<Box<dyn CommandRunner>, RemoteError> {
        let client =
            SshCommandClient::connect(self.target_for(hostname), self.policy.clone()).await?;
        Ok(Box::new(client))
    }
}
