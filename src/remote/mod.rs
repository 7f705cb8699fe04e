//! Remote command execution on application VMs.
//!
//! [`SshCommandClient`] is the production client; orchestration code goes
//! through the [`CommandRunner`] / [`RemoteExecutorFactory`] seams so jobs
//! can be driven with test doubles. One client binds to one host;
//! orchestrating N hosts takes N clients.

pub mod ssh;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use ssh::{SshAuth, SshCommandClient, SshExecutorFactory, SshTarget};

/// Captured output of one remote command.
///
/// A non-zero exit code is data for the caller to interpret, not a client
/// error; only transport failures surface as [`RemoteError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellResult {
    pub stdout: String,
    pub exit_code: u32,
}

impl ShellResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Server host key verification policy.
///
/// There is deliberately no default: accepting unverified host keys is
/// permitted for internal networks but has to be an explicit choice in
/// configuration, never something the client decides silently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostKeyPolicy {
    /// Accept whatever key the server presents. Logged loudly.
    AcceptAny,
    /// Accept only keys whose SHA-256 fingerprint is listed.
    Fingerprints(Vec<String>),
}

impl HostKeyPolicy {
    pub fn label(&self) -> &'static str {
        match self {
            Self::AcceptAny => "accept_any",
            Self::Fingerprints(_) => "fingerprints",
        }
    }
}

/// Failures classified at the remote-execution boundary. Raw transport
/// errors never escape; every variant names the target it concerns.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Transport connect or authentication exchange failed.
    #[error("connection to {target} failed: {source}")]
    Connection {
        target: String,
        #[source]
        source: russh::Error,
    },

    /// The server rejected the presented credentials.
    #[error("authentication as '{username}' rejected by {target}")]
    AuthenticationRejected { target: String, username: String },

    /// The server's host key did not satisfy the configured policy.
    #[error("host key for {target} rejected by {policy} policy")]
    HostKeyRejected { target: String, policy: &'static str },

    /// Key material could not be loaded or decrypted.
    #[error("unusable key material at {path}: {source}")]
    KeyMaterial {
        path: String,
        #[source]
        source: russh_keys::Error,
    },

    /// A per-command session could not be opened or driven.
    #[error("could not drive an execution session on {target}: {source}")]
    Session {
        target: String,
        #[source]
        source: russh::Error,
    },

    /// The command's session ended without a usable outcome.
    #[error("execution of `{command}` on {target} failed: {reason}")]
    Execution {
        target: String,
        command: String,
        reason: String,
    },

    /// An operation exceeded its configured timeout.
    #[error("{operation} on {target} timed out after {timeout:?}")]
    Timeout {
        target: String,
        operation: &'static str,
        timeout: Duration,
    },
}

/// Seam over a connected, authenticated remote shell.
#[async_trait]
pub trait CommandRunner: Send {
    /// Execute one command in a fresh session and capture its outcome.
    async fn run(&mut self, command: &str) -> Result<ShellResult, RemoteError>;

    /// Hostname this runner is bound to, for logging and error context.
    fn target(&self) -> &str;
}

/// Connects [`CommandRunner`]s on demand, one per host.
#[async_trait]
pub trait RemoteExecutorFactory: Send + Sync {
    async fn connect(&self, hostname: &str) -> Result<Box<dyn CommandRunner>, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_result_success() {
        let ok = ShellResult {
            stdout: "done\n".to_string(),
            exit_code: 0,
        };
        let failed = ShellResult {
            stdout: String::new(),
            exit_code: 2,
        };
        assert!(ok.success());
        assert!(!failed.success());
    }

    #[test]
    fn test_host_key_policy_serde() {
        let json = serde_json::to_string(&HostKeyPolicy::AcceptAny).unwrap();
        assert_eq!(json, "\"accept_any\"");

        let parsed: HostKeyPolicy =
            serde_json::from_str(r#"{"fingerprints": ["SHA256:abc"]}"#).unwrap();
        assert_eq!(
            parsed,
            HostKeyPolicy::Fingerprints(vec!["SHA256:abc".to_string()])
        );
    }
}
