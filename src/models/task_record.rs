use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Status of one orchestration step's audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Step is currently executing
    #[default]
    Running,
    /// Step finished successfully
    Succeeded,
    /// Step finished with an error
    Failed,
}

impl TaskStatus {
    /// Check if this is a terminal status (the record is frozen).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid task status: {s}")),
        }
    }
}

impl TryFrom<String> for TaskStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// TaskRecord is the audit row for one orchestration step: identity,
/// status, and timing. Created when the step begins, concluded exactly
/// once, and immutable after that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TaskRecord {
    pub task_record_id: i64,
    pub task_name: String,
    #[sqlx(try_from = "String")]
    pub status: TaskStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub detail: Option<String>,
}

impl TaskRecord {
    /// Open a running record for a step that is starting now.
    pub fn begin(task_name: impl Into<String>) -> Self {
        Self {
            task_record_id: 0,
            task_name: task_name.into(),
            status: TaskStatus::Running,
            start_time: Utc::now(),
            end_time: None,
            detail: None,
        }
    }

    /// Conclude the record. Returns false (and leaves the record untouched)
    /// if it was already concluded.
    pub fn conclude(&mut self, status: TaskStatus, detail: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = status;
        self.end_time = Some(Utc::now());
        self.detail = Some(detail.into());
        true
    }

    pub fn is_concluded(&self) -> bool {
        self.status.is_terminal()
    }
}
