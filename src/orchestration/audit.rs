use std::sync::Arc;
use tracing::warn;

use crate::models::{TaskRecord, TaskStatus};
use crate::storage::{StorageError, TaskRecordStore};

/// Opens and concludes task records around orchestration steps.
///
/// A record is persisted as soon as the step begins, so an abandoned step
/// still leaves an audit trail; conclusion is write-once.
pub struct TaskAudit {
    store: Arc<dyn TaskRecordStore>,
}

impl TaskAudit {
    pub fn new(store: Arc<dyn TaskRecordStore>) -> Self {
        Self { store }
    }

    /// Persist a running record for a step starting now.
    pub async fn begin(&self, task_name: &str) -> Result<TaskRecord, StorageError> {
        let mut record = TaskRecord::begin(task_name);
        self.store.persist(&mut record).await?;
        Ok(record)
    }

    /// Conclude and merge the record. A record that was already concluded
    /// is left untouched.
    pub async fn conclude(
        &self,
        record: &mut TaskRecord,
        status: TaskStatus,
        detail: impl Into<String>,
    ) -> Result<(), StorageError> {
        if !record.conclude(status, detail) {
            warn!(
                task_record_id = record.task_record_id,
                task_name = %record.task_name,
                "task record already concluded; leaving it untouched"
            );
            return Ok(());
        }
        self.store.merge(record).await
    }
}
