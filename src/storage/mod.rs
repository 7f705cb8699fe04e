//! Storage collaborator interface.
//!
//! The orchestration core needs very little from persistence: find
//! environments by name, eager-load one environment's subtree, and keep
//! task records. Those capabilities are small composed traits implemented
//! once per backend — [`MemoryStore`] for tests and loaders,
//! [`PostgresStore`] for the real thing.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Environment, TaskRecord};

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Failures classified at the storage boundary.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Strict single-environment load found nothing by that name. Distinct
    /// from the lenient batch existence check, which reports `false`.
    #[error("environment '{0}' not found")]
    EnvironmentNotFound(String),

    /// An entity addressed by id does not exist.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("storage backend error: {0}")]
    Backend(#[from] sqlx::Error),
}

/// Generic per-entity storage capability set: composed, never inherited.
#[async_trait]
pub trait EntityStore<T>: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<T>, StorageError>;

    /// Persist a new entity, assigning its id in place.
    async fn persist(&self, entity: &mut T) -> Result<(), StorageError>;

    /// Update an existing entity. Fails with [`StorageError::NotFound`]
    /// when it was never persisted.
    async fn merge(&self, entity: &T) -> Result<(), StorageError>;

    async fn contains(&self, id: i64) -> Result<bool, StorageError>;
}

/// Environment lookup and eager loading.
#[async_trait]
pub trait EnvironmentStore: Send + Sync {
    /// Existence flags for candidate names: equal length, input order
    /// preserved, duplicates and unknown names tolerated (unknown is
    /// `false`, never an error).
    async fn find_environments_existing(
        &self,
        names: &[String],
    ) -> Result<Vec<bool>, StorageError>;

    /// Fully materialize an environment's VM/application/database tree.
    /// Lazy hierarchies are not safely traversable outside a transaction
    /// boundary, so the whole subtree is fetched eagerly here.
    async fn load_environment_with_applications(
        &self,
        name: &str,
    ) -> Result<Environment, StorageError>;
}

/// Task-record persistence, as the entity capability set.
pub trait TaskRecordStore: EntityStore<TaskRecord> {}

impl<S: EntityStore<TaskRecord> + ?Sized> TaskRecordStore for S {}
