use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::states::FreezeMode;
use crate::utils::serde::deserialize_optional_datetime;

/// Progress of the current or most recent freeze/thaw attempt for one
/// logical database.
///
/// Created when an attempt begins and updated in place until it concludes;
/// after that it is historical. The wire shape is the camelCase JSON
/// payload remote applications report:
/// `{mode: {...}, username, startTime, endTime, lockError, transitionError}`.
/// Absent optional fields are defaulted, unknown fields ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreezeProgress {
    pub mode: FreezeMode,
    pub username: String,
    pub start_time: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_optional_datetime")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub lock_error: bool,
    #[serde(default)]
    pub transition_error: Option<String>,
}

impl FreezeProgress {
    /// Open a new attempt starting now.
    pub fn begin(mode: FreezeMode, username: impl Into<String>) -> Self {
        Self {
            mode,
            username: username.into(),
            start_time: Utc::now(),
            end_time: None,
            lock_error: false,
            transition_error: None,
        }
    }

    /// Conclude the attempt: settle the mode, stamp the end time, record
    /// whether locking failed and why the migration step failed, if it did.
    pub fn conclude(
        &mut self,
        mode: FreezeMode,
        lock_error: bool,
        transition_error: Option<String>,
    ) {
        self.mode = mode;
        self.end_time = Some(Utc::now());
        self.lock_error = lock_error;
        self.transition_error = transition_error;
    }

    /// An attempt is concluded once it has an end time.
    pub fn is_concluded(&self) -> bool {
        self.end_time.is_some()
    }
}
