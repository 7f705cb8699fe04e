use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use tracing::debug;

use super::{EntityStore, EnvironmentStore, StorageError};
use crate::config::DatabaseSettings;
use crate::models::{
    Application, ApplicationVm, Environment, LogicalDatabase, PhysicalDatabase, TaskRecord,
};

/// Postgres-backed store. Queries are bound at runtime so the crate builds
/// without a reachable database.
pub struct PostgresStore {
    pool: PgPool,
}

#[derive(FromRow)]
struct EnvironmentRow {
    environment_id: i64,
    name: String,
}

#[derive(FromRow)]
struct VmRow {
    application_vm_id: i64,
    hostname: String,
}

#[derive(FromRow)]
struct ApplicationRow {
    application_id: i64,
    application_vm_id: i64,
    name: String,
    hostname: String,
}

#[derive(FromRow)]
struct LogicalRow {
    logical_database_id: i64,
    name: String,
    live_physical_id: Option<i64>,
    other_physical_id: Option<i64>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool from configuration.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.pool)
            .acquire_timeout(settings.acquire_timeout())
            .connect(&settings.url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl EnvironmentStore for PostgresStore {
    async fn find_environments_existing(
        &self,
        names: &[String],
    ) -> Result<Vec<bool>, StorageError> {
        let known: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM environments WHERE name = ANY($1)",
        )
        .bind(names)
        .fetch_all(&self.pool)
        .await?;

        let known: std::collections::HashSet<&str> =
            known.iter().map(String::as_str).collect();
        Ok(names
            .iter()
            .map(|name| known.contains(name.as_str()))
            .collect())
    }

    async fn load_environment_with_applications(
        &self,
        name: &str,
    ) -> Result<Environment, StorageError> {
        let env: EnvironmentRow = sqlx::query_as(
            "SELECT environment_id, name FROM environments WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StorageError::EnvironmentNotFound(name.to_string()))?;

        let vms: Vec<VmRow> = sqlx::query_as(
            "SELECT application_vm_id, hostname \
             FROM application_vms WHERE environment_id = $1 \
             ORDER BY application_vm_id",
        )
        .bind(env.environment_id)
        .fetch_all(&self.pool)
        .await?;

        let vm_ids: Vec<i64> = vms.iter().map(|vm| vm.application_vm_id).collect();
        let applications: Vec<ApplicationRow> = sqlx::query_as(
            "SELECT application_id, application_vm_id, name, hostname \
             FROM applications WHERE application_vm_id = ANY($1) \
             ORDER BY application_id",
        )
        .bind(&vm_ids)
        .fetch_all(&self.pool)
        .await?;

        let logicals: Vec<LogicalRow> = sqlx::query_as(
            "SELECT logical_database_id, name, live_physical_id, other_physical_id \
             FROM logical_databases WHERE environment_id = $1 \
             ORDER BY logical_database_id",
        )
        .bind(env.environment_id)
        .fetch_all(&self.pool)
        .await?;

        let physical_ids: Vec<i64> = logicals
            .iter()
            .flat_map(|row| [row.live_physical_id, row.other_physical_id])
            .flatten()
            .collect();
        let physicals: Vec<PhysicalDatabase> = sqlx::query_as(
            "SELECT physical_database_id, driver, url, username, password \
             FROM physical_databases WHERE physical_database_id = ANY($1)",
        )
        .bind(&physical_ids)
        .fetch_all(&self.pool)
        .await?;

        debug!(
            environment = name,
            vms = vms.len(),
            applications = applications.len(),
            logical_databases = logicals.len(),
            "eager-loaded environment subtree"
        );
        Ok(assemble_environment(
            env,
            vms,
            applications,
            logicals,
            physicals,
        ))
    }
}

/// Stitch the eagerly fetched rows into the owned environment tree.
fn assemble_environment(
    env: EnvironmentRow,
    vms: Vec<VmRow>,
    applications: Vec<ApplicationRow>,
    logicals: Vec<LogicalRow>,
    physicals: Vec<PhysicalDatabase>,
) -> Environment {
    let mut apps_by_vm: HashMap<i64, Vec<Application>> = HashMap::new();
    for app in applications {
        apps_by_vm
            .entry(app.application_vm_id)
            .or_default()
            .push(Application {
                application_id: app.application_id,
                name: app.name,
                hostname: app.hostname,
            });
    }

    let physicals_by_id: HashMap<i64, PhysicalDatabase> = physicals
        .into_iter()
        .map(|p| (p.physical_database_id, p))
        .collect();

    Environment {
        environment_id: env.environment_id,
        name: env.name,
        vms: vms
            .into_iter()
            .map(|vm| ApplicationVm {
                application_vm_id: vm.application_vm_id,
                hostname: vm.hostname,
                applications: apps_by_vm.remove(&vm.application_vm_id).unwrap_or_default(),
            })
            .collect(),
        logical_databases: logicals
            .into_iter()
            .map(|row| LogicalDatabase {
                logical_database_id: row.logical_database_id,
                name: row.name,
                live: row
                    .live_physical_id
                    .and_then(|id| physicals_by_id.get(&id).cloned()),
                other: row
                    .other_physical_id
                    .and_then(|id| physicals_by_id.get(&id).cloned()),
            })
            .collect(),
    }
}

#[async_trait]
impl EntityStore<TaskRecord> for PostgresStore {
    async fn get(&self, id: i64) -> Result<Option<TaskRecord>, StorageError> {
        let record: Option<TaskRecord> = sqlx::query_as(
            "SELECT task_record_id, task_name, status, start_time, end_time, detail \
             FROM task_records WHERE task_record_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn persist(&self, entity: &mut TaskRecord) -> Result<(), StorageError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO task_records (task_name, status, start_time, end_time, detail) \
             VALUES ($1, $2, $3, $4, $5) RETURNING task_record_id",
        )
        .bind(&entity.task_name)
        .bind(entity.status.to_string())
        .bind(entity.start_time)
        .bind(entity.end_time)
        .bind(&entity.detail)
        .fetch_one(&self.pool)
        .await?;
        entity.task_record_id = id;
        Ok(())
    }

    async fn merge(&self, entity: &TaskRecord) -> Result<(), StorageError> {
        let result = sqlx::query(
            "UPDATE task_records \
             SET task_name = $2, status = $3, start_time = $4, end_time = $5, detail = $6 \
             WHERE task_record_id = $1",
        )
        .bind(entity.task_record_id)
        .bind(&entity.task_name)
        .bind(entity.status.to_string())
        .bind(entity.start_time)
        .bind(entity.end_time)
        .bind(&entity.detail)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound {
                entity: "task record",
                id: entity.task_record_id,
            });
        }
        Ok(())
    }

    async fn contains(&self, id: i64) -> Result<bool, StorageError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM task_records WHERE task_record_id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_environment_stitches_subtree() {
        let env = EnvironmentRow {
            environment_id: 1,
            name: "staging".to_string(),
        };
        let vms = vec![
            VmRow {
                application_vm_id: 10,
                hostname: "vm-a".to_string(),
            },
            VmRow {
                application_vm_id: 11,
                hostname: "vm-b".to_string(),
            },
        ];
        let applications = vec![
            ApplicationRow {
                application_id: 100,
                application_vm_id: 10,
                name: "storefront".to_string(),
                hostname: "store.internal".to_string(),
            },
            ApplicationRow {
                application_id: 101,
                application_vm_id: 11,
                name: "backoffice".to_string(),
                hostname: "admin.internal".to_string(),
            },
        ];
        let mut live = PhysicalDatabase::new("postgres", "db://blue", "app", "secret");
        live.physical_database_id = 200;
        let mut other = PhysicalDatabase::new("postgres", "db://green", "app", "secret");
        other.physical_database_id = 201;
        let logicals = vec![LogicalRow {
            logical_database_id: 300,
            name: "orders".to_string(),
            live_physical_id: Some(200),
            other_physical_id: Some(201),
        }];

        let environment =
            assemble_environment(env, vms, applications, logicals, vec![live, other]);

        assert_eq!(environment.vms.len(), 2);
        assert_eq!(environment.vms[0].applications[0].name, "storefront");
        assert_eq!(environment.vms[1].applications[0].name, "backoffice");
        let orders = environment.logical_database("orders").unwrap();
        assert_eq!(orders.live.as_ref().unwrap().url, "db://blue");
        assert_eq!(orders.other.as_ref().unwrap().url, "db://green");
    }

    #[test]
    fn test_assemble_environment_tolerates_unset_roles() {
        let env = EnvironmentRow {
            environment_id: 1,
            name: "staging".to_string(),
        };
        let logicals = vec![LogicalRow {
            logical_database_id: 300,
            name: "orders".to_string(),
            live_physical_id: None,
            other_physical_id: None,
        }];

        let environment = assemble_environment(env, vec![], vec![], logicals, vec![]);
        let orders = environment.logical_database("orders").unwrap();
        assert!(orders.live.is_none());
        assert!(orders.other.is_none());
    }
}
