use chrono::{DateTime, Utc};
use thiserror::Error;

use super::states::FreezeMode;
use crate::validation::PairingViolation;

/// Failures raised by the freeze-mode state machine. All are raised
/// synchronously, before any remote action runs, so an invalid request
/// never produces a remote side effect.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateMachineError {
    /// The current mode does not accept the requested event.
    #[error("logical database {logical_database_id} is {current}; {event} is not allowed from there")]
    InvalidTransition {
        logical_database_id: i64,
        current: FreezeMode,
        event: &'static str,
    },

    /// Another attempt is in flight; the existing progress is untouched.
    #[error("logical database {logical_database_id} already has a {mode} attempt in flight, started by {username} at {started_at}")]
    AttemptInFlight {
        logical_database_id: i64,
        mode: FreezeMode,
        username: String,
        started_at: DateTime<Utc>,
    },

    /// The live/other pairing is invalid; no freeze action may target it.
    #[error(transparent)]
    Pairing(#[from] PairingViolation),
}

pub type StateMachineResult<T> = std::result::Result<T, StateMachineError>;
