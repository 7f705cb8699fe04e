//! Pairing invariant for logical databases.
//!
//! A logical database may not pair two physical databases that share a
//! connection descriptor. The check is a plain callable so it can run at
//! every mutation site and again before any freeze action, independent of
//! storage.

use thiserror::Error;

use crate::models::LogicalDatabase;

/// Violation of the live/other distinctness invariant. Carries the logical
/// database identity and both conflicting connection identities.
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "logical database '{logical_name}' (id {logical_database_id}) pairs equivalent physical databases: live is {live}, other is {other}"
)]
pub struct PairingViolation {
    pub logical_database_id: i64,
    pub logical_name: String,
    pub live: String,
    pub other: String,
}

/// Validate the live/other pairing of a logical database.
///
/// Valid when either role is absent; invalid only when both are present
/// and structurally equivalent (same driver, url, username, password —
/// ids are ignored, since unpersisted records share a default id of 0).
pub fn validate_physical_pairing(logical: &LogicalDatabase) -> Result<(), PairingViolation> {
    match (&logical.live, &logical.other) {
        (Some(live), Some(other)) if live.same_connection(other) => Err(PairingViolation {
            logical_database_id: logical.logical_database_id,
            logical_name: logical.name.clone(),
            live: live.to_string(),
            other: other.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Boolean form of [`validate_physical_pairing`].
pub fn is_valid_pairing(logical: &LogicalDatabase) -> bool {
    validate_physical_pairing(logical).is_ok()
}
