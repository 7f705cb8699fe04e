use thiserror::Error;

use crate::config::ConfigurationError;
use crate::events::PublishError;
use crate::http_session::HttpSessionError;
use crate::remote::RemoteError;
use crate::state_machine::StateMachineError;
use crate::storage::StorageError;
use crate::validation::PairingViolation;

/// Crate-level error: every component failure, already classified at the
/// boundary where it happened. Remote-I/O failures never surface as raw
/// transport errors, and invariant/state failures are raised before any
/// remote side effect.
#[derive(Debug, Error)]
pub enum CutoverError {
    #[error(transparent)]
    Pairing(#[from] PairingViolation),

    #[error(transparent)]
    StateMachine(#[from] StateMachineError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    HttpSession(#[from] HttpSessionError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A job request the driver handed us cannot be executed as stated.
    #[error("job error: {0}")]
    Job(String),
}

pub type Result<T> = std::result::Result<T, CutoverError>;
