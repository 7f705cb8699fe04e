use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::audit::TaskAudit;
use super::gateway::AppGateway;
use super::job::JobRequest;
use crate::error::{CutoverError, Result};
use crate::models::{Environment, LogicalDatabase, TaskRecord, TaskStatus};
use crate::remote::RemoteExecutorFactory;
use crate::state_machine::{FreezeCoordinator, FreezeProgress};
use crate::storage::{EnvironmentStore, TaskRecordStore};

/// Job names the driver may dispatch.
pub const FREEZE_JOB: &str = "freeze";
pub const THAW_JOB: &str = "thaw";

/// Parameter group names.
pub const ENVIRONMENT_PARAM: &str = "environment";
pub const DATABASES_PARAM: &str = "databases";
pub const USERNAME_PARAM: &str = "username";

/// Placeholder replaced with the logical database name in command
/// templates.
const DATABASE_PLACEHOLDER: &str = "{database}";

/// What happened to one logical database during a job run.
#[derive(Debug, Clone)]
pub struct DatabaseOutcome {
    pub database: String,
    pub progress: FreezeProgress,
}

impl DatabaseOutcome {
    /// The attempt concluded without lock or transition errors.
    pub fn succeeded(&self) -> bool {
        !self.progress.lock_error && self.progress.transition_error.is_none()
    }
}

/// Result of one job run: the concluded audit record plus per-database
/// outcomes. A failed attempt is an outcome, not a hidden error — partially
/// applied remote state stays visible.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub record: TaskRecord,
    pub outcomes: Vec<DatabaseOutcome>,
}

impl JobReport {
    pub fn succeeded(&self) -> bool {
        self.record.status == TaskStatus::Succeeded
    }
}

/// The freeze/thaw job driver: resolves an environment, validates and
/// transitions each target database, and drives the remote side through
/// the command and gateway seams. No retries live here; retry policy
/// belongs to the external driver.
pub struct CutoverJobs {
    environments: Arc<dyn EnvironmentStore>,
    coordinator: Arc<FreezeCoordinator>,
    executors: Arc<dyn RemoteExecutorFactory>,
    gateway: Arc<dyn AppGateway>,
    audit: TaskAudit,
    freeze_command: String,
    thaw_command: String,
}

impl CutoverJobs {
    pub fn new(
        environments: Arc<dyn EnvironmentStore>,
        coordinator: Arc<FreezeCoordinator>,
        executors: Arc<dyn RemoteExecutorFactory>,
        gateway: Arc<dyn AppGateway>,
        records: Arc<dyn TaskRecordStore>,
    ) -> Self {
        Self {
            environments,
            coordinator,
            executors,
            gateway,
            audit: TaskAudit::new(records),
            freeze_command: format!("db-freeze {DATABASE_PLACEHOLDER}"),
            thaw_command: format!("db-thaw {DATABASE_PLACEHOLDER}"),
        }
    }

    /// Override the command templates run on each VM. `{database}` expands
    /// to the logical database name.
    pub fn with_commands(
        mut self,
        freeze_command: impl Into<String>,
        thaw_command: impl Into<String>,
    ) -> Self {
        self.freeze_command = freeze_command.into();
        self.thaw_command = thaw_command.into();
        self
    }

    /// Dispatch a tokenized job request by name.
    pub async fn run(&self, request: &JobRequest) -> Result<JobReport> {
        match request.name.as_str() {
            FREEZE_JOB => self.run_job(request, Direction::Freeze).await,
            THAW_JOB => self.run_job(request, Direction::Thaw).await,
            other => Err(CutoverError::Job(format!("unknown job '{other}'"))),
        }
    }

    async fn run_job(&self, request: &JobRequest, direction: Direction) -> Result<JobReport> {
        let environment_name = request.require_value(ENVIRONMENT_PARAM)?;
        let username = request.require_value(USERNAME_PARAM)?;
        let requested = request.values(DATABASES_PARAM);

        let run_id = Uuid::new_v4();
        let mut record = self.audit.begin(&request.name).await?;
        info!(
            job = %request.name,
            run_id = %run_id,
            environment = environment_name,
            username,
            task_record_id = record.task_record_id,
            "job started"
        );

        let result = self
            .run_against_environment(environment_name, username, requested, direction)
            .await;

        match result {
            Ok(outcomes) => {
                let status = if outcomes.iter().all(DatabaseOutcome::succeeded) {
                    TaskStatus::Succeeded
                } else {
                    TaskStatus::Failed
                };
                self.audit
                    .conclude(&mut record, status, summarize(&outcomes))
                    .await?;
                Ok(JobReport { record, outcomes })
            }
            Err(err) => {
                error!(job = %request.name, error = %err, "job failed before completion");
                let _ = self
                    .audit
                    .conclude(&mut record, TaskStatus::Failed, err.to_string())
                    .await;
                Err(err)
            }
        }
    }

    async fn run_against_environment(
        &self,
        environment_name: &str,
        username: &str,
        requested: &[String],
        direction: Direction,
    ) -> Result<Vec<DatabaseOutcome>> {
        let environment = self
            .environments
            .load_environment_with_applications(environment_name)
            .await?;
        let targets = select_databases(&environment, requested)?;

        let mut outcomes = Vec::with_capacity(targets.len());
        for logical in targets {
            let outcome = match direction {
                Direction::Freeze => self.freeze_database(&environment, logical, username).await?,
                Direction::Thaw => self.thaw_database(&environment, logical, username).await?,
            };
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Freeze one logical database: begin the attempt (pairing validated,
    /// conflicts rejected, no remote side effect on failure), put the
    /// environment's applications into maintenance, then run the freeze
    /// command on every VM. The attempt concludes frozen only if every
    /// step held.
    async fn freeze_database(
        &self,
        environment: &Environment,
        logical: &LogicalDatabase,
        username: &str,
    ) -> Result<DatabaseOutcome> {
        let id = logical.logical_database_id;
        self.coordinator.begin_freeze(logical, username)?;

        let maintenance = try_join_all(
            environment
                .applications()
                .map(|app| self.gateway.enter_maintenance(app)),
        )
        .await;
        if let Err(cause) = maintenance {
            warn!(database = %logical.name, error = %cause, "maintenance entry failed; freeze abandoned");
            let progress =
                self.coordinator
                    .complete_freeze(id, false, Some(cause.to_string()))?;
            return Ok(DatabaseOutcome {
                database: logical.name.clone(),
                progress,
            });
        }

        let progress = match self
            .run_on_all_vms(environment, &self.freeze_command, &logical.name)
            .await
        {
            CommandSweep::AllSucceeded => self.coordinator.complete_freeze(id, true, None)?,
            CommandSweep::LockRefused { host, exit_code } => {
                warn!(database = %logical.name, host = %host, exit_code, "freeze command refused the lock");
                self.coordinator.complete_freeze(id, false, None)?
            }
            CommandSweep::Failed { cause } => {
                self.coordinator.complete_freeze(id, false, Some(cause))?
            }
        };

        Ok(DatabaseOutcome {
            database: logical.name.clone(),
            progress,
        })
    }

    /// Thaw one logical database: run the thaw command on every VM, then
    /// bring applications out of maintenance. A maintenance exit failure
    /// after a successful unlock is recorded as a transition error — the
    /// writes are restored, the partial state stays visible.
    async fn thaw_database(
        &self,
        environment: &Environment,
        logical: &LogicalDatabase,
        username: &str,
    ) -> Result<DatabaseOutcome> {
        let id = logical.logical_database_id;
        self.coordinator.begin_thaw(logical, username)?;

        let progress = match self
            .run_on_all_vms(environment, &self.thaw_command, &logical.name)
            .await
        {
            CommandSweep::AllSucceeded => {
                let maintenance = try_join_all(
                    environment
                        .applications()
                        .map(|app| self.gateway.exit_maintenance(app)),
                )
                .await;
                match maintenance {
                    Ok(_) => self.coordinator.complete_thaw(id, true, None)?,
                    Err(cause) => {
                        warn!(database = %logical.name, error = %cause, "maintenance exit failed after thaw");
                        self.coordinator
                            .complete_thaw(id, true, Some(cause.to_string()))?
                    }
                }
            }
            CommandSweep::LockRefused { host, exit_code } => {
                warn!(database = %logical.name, host = %host, exit_code, "thaw command refused the unlock");
                self.coordinator.complete_thaw(id, false, None)?
            }
            CommandSweep::Failed { cause } => {
                self.coordinator.complete_thaw(id, false, Some(cause))?
            }
        };

        Ok(DatabaseOutcome {
            database: logical.name.clone(),
            progress,
        })
    }

    /// Run one command template on every VM in order. The first refusal or
    /// transport failure stops the sweep; later VMs are left untouched for
    /// the driver to inspect.
    async fn run_on_all_vms(
        &self,
        environment: &Environment,
        template: &str,
        database: &str,
    ) -> CommandSweep {
        let command = template.replace(DATABASE_PLACEHOLDER, database);
        for vm in &environment.vms {
            let mut runner = match self.executors.connect(&vm.hostname).await {
                Ok(runner) => runner,
                Err(cause) => {
                    return CommandSweep::Failed {
                        cause: cause.to_string(),
                    }
                }
            };
            match runner.run(&command).await {
                Ok(result) if result.success() => {
                    info!(host = %vm.hostname, command = %command, "command succeeded");
                }
                Ok(result) => {
                    return CommandSweep::LockRefused {
                        host: vm.hostname.clone(),
                        exit_code: result.exit_code,
                    };
                }
                Err(cause) => {
                    return CommandSweep::Failed {
                        cause: cause.to_string(),
                    };
                }
            }
        }
        CommandSweep::AllSucceeded
    }
}

enum Direction {
    Freeze,
    Thaw,
}

/// Outcome of running one command across an environment's VMs.
enum CommandSweep {
    AllSucceeded,
    /// A VM ran the command, which declined with a non-zero exit code.
    LockRefused {
        host: String,
        exit_code: u32,
    },
    /// Transport-level failure; the command's effect on that VM is
    /// unknown.
    Failed {
        cause: String,
    },
}

/// Resolve the requested database names against the environment; an empty
/// request selects every logical database.
fn select_databases<'a>(
    environment: &'a Environment,
    requested: &[String],
) -> Result<Vec<&'a LogicalDatabase>> {
    if requested.is_empty() {
        return Ok(environment.logical_databases.iter().collect());
    }
    requested
        .iter()
        .map(|name| {
            environment.logical_database(name).ok_or_else(|| {
                CutoverError::Job(format!(
                    "environment '{}' has no logical database '{name}'",
                    environment.name
                ))
            })
        })
        .collect()
}

fn summarize(outcomes: &[DatabaseOutcome]) -> String {
    outcomes
        .iter()
        .map(|outcome| {
            let mut line = format!("{}: {}", outcome.database, outcome.progress.mode);
            if outcome.progress.lock_error {
                line.push_str(" (lock error)");
            }
            if let Some(reason) = &outcome.progress.transition_error {
                line.push_str(&format!(" ({reason})"));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("; ")
}
