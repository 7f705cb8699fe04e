use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{EntityStore, EnvironmentStore, StorageError};
use crate::models::{Environment, TaskRecord};

/// In-memory store backing tests and administrative loaders.
#[derive(Debug)]
pub struct MemoryStore {
    environments: RwLock<Vec<Environment>>,
    task_records: RwLock<HashMap<i64, TaskRecord>>,
    next_id: AtomicI64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            environments: RwLock::new(Vec::new()),
            task_records: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Register an environment, assigning an id if it has none yet.
    pub fn add_environment(&self, mut environment: Environment) {
        if environment.environment_id == 0 {
            environment.environment_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        }
        self.environments.write().push(environment);
    }

    /// Snapshot of a stored task record, for assertions.
    pub fn task_record(&self, id: i64) -> Option<TaskRecord> {
        self.task_records.read().get(&id).cloned()
    }
}

#[async_trait]
impl EnvironmentStore for MemoryStore {
    async fn find_environments_existing(
        &self,
        names: &[String],
    ) -> Result<Vec<bool>, StorageError> {
        let environments = self.environments.read();
        Ok(names
            .iter()
            .map(|name| environments.iter().any(|env| &env.name == name))
            .collect())
    }

    async fn load_environment_with_applications(
        &self,
        name: &str,
    ) -> Result<Environment, StorageError> {
        self.environments
            .read()
            .iter()
            .find(|env| env.name == name)
            .cloned()
            .ok_or_else(|| StorageError::EnvironmentNotFound(name.to_string()))
    }
}

#[async_trait]
impl EntityStore<TaskRecord> for MemoryStore {
    async fn get(&self, id: i64) -> Result<Option<TaskRecord>, StorageError> {
        Ok(self.task_records.read().get(&id).cloned())
    }

    async fn persist(&self, entity: &mut TaskRecord) -> Result<(), StorageError> {
        if entity.task_record_id == 0 {
            entity.task_record_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        }
        self.task_records
            .write()
            .insert(entity.task_record_id, entity.clone());
        Ok(())
    }

    async fn merge(&self, entity: &TaskRecord) -> Result<(), StorageError> {
        let mut records = self.task_records.write();
        match records.get_mut(&entity.task_record_id) {
            Some(stored) => {
                *stored = entity.clone();
                Ok(())
            }
            None => Err(StorageError::NotFound {
                entity: "task record",
                id: entity.task_record_id,
            }),
        }
    }

    async fn contains(&self, id: i64) -> Result<bool, StorageError> {
        Ok(self.task_records.read().contains_key(&id))
    }
}
