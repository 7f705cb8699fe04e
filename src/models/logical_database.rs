use serde::{Deserialize, Serialize};

use super::physical_database::PhysicalDatabase;
use crate::validation::{validate_physical_pairing, PairingViolation};

/// LogicalDatabase is the named unit of migration: it pairs the physical
/// database currently serving writes ("live") with the migration target
/// ("other").
///
/// Invariant: when both roles are populated they must not share a
/// connection descriptor. Either role may be unset. The check runs at every
/// mutation of the pairing, and again before any freeze action targets the
/// pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalDatabase {
    pub logical_database_id: i64,
    pub name: String,
    pub live: Option<PhysicalDatabase>,
    pub other: Option<PhysicalDatabase>,
}

impl LogicalDatabase {
    /// Create an unpersisted logical database with both roles unset.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            logical_database_id: 0,
            name: name.into(),
            live: None,
            other: None,
        }
    }

    /// Assign the live role, re-validating the pairing. On violation the
    /// previous value is restored and the violation returned.
    pub fn set_live(&mut self, physical: Option<PhysicalDatabase>) -> Result<(), PairingViolation> {
        let previous = std::mem::replace(&mut self.live, physical);
        if let Err(violation) = validate_physical_pairing(self) {
            self.live = previous;
            return Err(violation);
        }
        Ok(())
    }

    /// Assign the other role, re-validating the pairing. On violation the
    /// previous value is restored and the violation returned.
    pub fn set_other(
        &mut self,
        physical: Option<PhysicalDatabase>,
    ) -> Result<(), PairingViolation> {
        let previous = std::mem::replace(&mut self.other, physical);
        if let Err(violation) = validate_physical_pairing(self) {
            self.other = previous;
            return Err(violation);
        }
        Ok(())
    }

    /// Swap the live and other roles. Used after a completed migration when
    /// the copy becomes the serving side. Swapping cannot introduce a
    /// pairing violation, so this never fails.
    pub fn promote_other(&mut self) {
        std::mem::swap(&mut self.live, &mut self.other);
    }
}
