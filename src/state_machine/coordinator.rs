use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{info, warn};

use super::errors::{StateMachineError, StateMachineResult};
use super::events::FreezeEvent;
use super::progress::FreezeProgress;
use super::states::FreezeMode;
use crate::events::{EventPublisher, FreezeTransitionEvent};
use crate::models::LogicalDatabase;
use crate::validation::validate_physical_pairing;

/// Tracks freeze-mode state per logical database and applies transitions.
///
/// Invariant: at most one in-flight attempt per logical database. Every
/// transition is a check-and-set under the entry lock of the per-database
/// map shard, so two racing jobs cannot both begin an attempt; the loser
/// gets a conflict error and the winner's progress is untouched.
pub struct FreezeCoordinator {
    attempts: DashMap<i64, FreezeProgress>,
    publisher: EventPublisher,
}

impl FreezeCoordinator {
    pub fn new(publisher: EventPublisher) -> Self {
        Self {
            attempts: DashMap::new(),
            publisher,
        }
    }

    /// Current mode of a logical database. A database with no recorded
    /// attempt is `Normal`.
    pub fn mode(&self, logical_database_id: i64) -> FreezeMode {
        self.attempts
            .get(&logical_database_id)
            .map(|progress| progress.mode)
            .unwrap_or_default()
    }

    /// Current or most recent attempt for a logical database.
    pub fn progress(&self, logical_database_id: i64) -> Option<FreezeProgress> {
        self.attempts
            .get(&logical_database_id)
            .map(|progress| progress.clone())
    }

    /// Apply a freeze event to a logical database. Event-style entry point
    /// for drivers that carry transitions as data (queues, audit replay).
    pub fn apply(
        &self,
        logical: &LogicalDatabase,
        event: &FreezeEvent,
    ) -> StateMachineResult<FreezeProgress> {
        match event {
            FreezeEvent::BeginFreeze { username } => self.begin_freeze(logical, username),
            FreezeEvent::CompleteFreeze {
                lock_succeeded,
                transition_error,
            } => self.complete_freeze(
                logical.logical_database_id,
                *lock_succeeded,
                transition_error.clone(),
            ),
            FreezeEvent::BeginThaw { username } => self.begin_thaw(logical, username),
            FreezeEvent::CompleteThaw {
                lock_succeeded,
                transition_error,
            } => self.complete_thaw(
                logical.logical_database_id,
                *lock_succeeded,
                transition_error.clone(),
            ),
        }
    }

    /// Begin revoking write access. Allowed only from `Normal`; the pairing
    /// invariant is validated first, so an invalid pair never starts an
    /// attempt.
    pub fn begin_freeze(
        &self,
        logical: &LogicalDatabase,
        username: &str,
    ) -> StateMachineResult<FreezeProgress> {
        validate_physical_pairing(logical)?;
        self.begin(logical.logical_database_id, username, FreezeMode::Freezing)
    }

    /// Begin restoring write access. Allowed only from `Frozen`. The
    /// pairing is re-validated: a pair edited while frozen must not thaw.
    pub fn begin_thaw(
        &self,
        logical: &LogicalDatabase,
        username: &str,
    ) -> StateMachineResult<FreezeProgress> {
        validate_physical_pairing(logical)?;
        self.begin(logical.logical_database_id, username, FreezeMode::Thawing)
    }

    /// Conclude a freeze attempt. Lock acquired → `Frozen`; lock failed →
    /// back to `Normal` with the lock error recorded. Either way the end
    /// time is stamped and the attempt becomes historical.
    pub fn complete_freeze(
        &self,
        logical_database_id: i64,
        lock_succeeded: bool,
        transition_error: Option<String>,
    ) -> StateMachineResult<FreezeProgress> {
        self.complete(
            logical_database_id,
            FreezeMode::Freezing,
            lock_succeeded,
            transition_error,
        )
    }

    /// Conclude a thaw attempt. Mirror image of [`complete_freeze`]:
    /// success lands in `Normal`, failure falls back to `Frozen`.
    ///
    /// [`complete_freeze`]: FreezeCoordinator::complete_freeze
    pub fn complete_thaw(
        &self,
        logical_database_id: i64,
        lock_succeeded: bool,
        transition_error: Option<String>,
    ) -> StateMachineResult<FreezeProgress> {
        self.complete(
            logical_database_id,
            FreezeMode::Thawing,
            lock_succeeded,
            transition_error,
        )
    }

    fn begin(
        &self,
        logical_database_id: i64,
        username: &str,
        target: FreezeMode,
    ) -> StateMachineResult<FreezeProgress> {
        let required = target.fallback();
        let snapshot = match self.attempts.entry(logical_database_id) {
            Entry::Occupied(mut entry) => {
                let current = entry.get();
                if current.mode.is_in_flight() {
                    return Err(StateMachineError::AttemptInFlight {
                        logical_database_id,
                        mode: current.mode,
                        username: current.username.clone(),
                        started_at: current.start_time,
                    });
                }
                if current.mode != required {
                    return Err(StateMachineError::InvalidTransition {
                        logical_database_id,
                        current: current.mode,
                        event: Self::begin_event_name(target),
                    });
                }
                let progress = FreezeProgress::begin(target, username);
                entry.insert(progress.clone());
                progress
            }
            Entry::Vacant(entry) => {
                if required != FreezeMode::Normal {
                    return Err(StateMachineError::InvalidTransition {
                        logical_database_id,
                        current: FreezeMode::Normal,
                        event: Self::begin_event_name(target),
                    });
                }
                let progress = FreezeProgress::begin(target, username);
                entry.insert(progress.clone());
                progress
            }
        };

        info!(
            logical_database_id,
            mode = %snapshot.mode,
            username,
            "freeze attempt started"
        );
        self.publish(logical_database_id, required, &snapshot);
        Ok(snapshot)
    }

    fn complete(
        &self,
        logical_database_id: i64,
        expected: FreezeMode,
        lock_succeeded: bool,
        transition_error: Option<String>,
    ) -> StateMachineResult<FreezeProgress> {
        let snapshot = match self.attempts.entry(logical_database_id) {
            Entry::Occupied(mut entry) => {
                let current = entry.get().mode;
                if current != expected {
                    return Err(StateMachineError::InvalidTransition {
                        logical_database_id,
                        current,
                        event: Self::complete_event_name(expected),
                    });
                }
                let settled = if lock_succeeded {
                    match expected {
                        FreezeMode::Freezing => FreezeMode::Frozen,
                        _ => FreezeMode::Normal,
                    }
                } else {
                    expected.fallback()
                };
                let progress = entry.get_mut();
                progress.conclude(settled, !lock_succeeded, transition_error);
                progress.clone()
            }
            Entry::Vacant(_) => {
                return Err(StateMachineError::InvalidTransition {
                    logical_database_id,
                    current: FreezeMode::Normal,
                    event: Self::complete_event_name(expected),
                });
            }
        };

        if snapshot.lock_error || snapshot.transition_error.is_some() {
            warn!(
                logical_database_id,
                mode = %snapshot.mode,
                lock_error = snapshot.lock_error,
                transition_error = snapshot.transition_error.as_deref(),
                "freeze attempt concluded with errors"
            );
        } else {
            info!(
                logical_database_id,
                mode = %snapshot.mode,
                "freeze attempt concluded"
            );
        }
        self.publish(logical_database_id, expected, &snapshot);
        Ok(snapshot)
    }

    fn publish(&self, logical_database_id: i64, from: FreezeMode, progress: &FreezeProgress) {
        let _ = self.publisher.publish(FreezeTransitionEvent {
            logical_database_id,
            from,
            to: progress.mode,
            username: progress.username.clone(),
            occurred_at: Utc::now(),
        });
    }

    fn begin_event_name(target: FreezeMode) -> &'static str {
        match target {
            FreezeMode::Thawing => "begin_thaw",
            _ => "begin_freeze",
        }
    }

    fn complete_event_name(expected: FreezeMode) -> &'static str {
        match expected {
            FreezeMode::Thawing => "complete_thaw",
            _ => "complete_freeze",
        }
    }
}

impl Default for FreezeCoordinator {
    fn default() -> Self {
        Self::new(EventPublisher::default())
    }
}
