//! End-to-end freeze/thaw flows over the orchestration seams: in-memory
//! storage, scripted command runners, and a recording application gateway.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use cutover_core::http_session::HttpSessionError;
use cutover_core::models::{
    Application, ApplicationVm, Environment, LogicalDatabase, PhysicalDatabase, TaskStatus,
};
use cutover_core::orchestration::{AppGateway, CutoverJobs, JobRequest};
use cutover_core::remote::{CommandRunner, RemoteError, RemoteExecutorFactory, ShellResult};
use cutover_core::state_machine::{FreezeCoordinator, FreezeMode, FreezeProgress};
use cutover_core::storage::MemoryStore;
use cutover_core::CutoverError;

const ORDERS_ID: i64 = 31;

fn staging_environment() -> Environment {
    let mut live = PhysicalDatabase::new("postgres", "db://blue", "app", "secret");
    live.physical_database_id = 1;
    let mut other = PhysicalDatabase::new("postgres", "db://green", "app", "secret");
    other.physical_database_id = 2;

    let mut orders = LogicalDatabase::new("orders");
    orders.logical_database_id = ORDERS_ID;
    orders.set_live(Some(live)).unwrap();
    orders.set_other(Some(other)).unwrap();

    Environment::new("staging")
        .with_vm(
            ApplicationVm::new("vm-a.internal")
                .with_application(Application::new("storefront", "store.internal")),
        )
        .with_vm(
            ApplicationVm::new("vm-b.internal")
                .with_application(Application::new("backoffice", "admin.internal")),
        )
        .with_logical_database(orders)
}

/// Scripted runner: answers every command with a fixed exit code and
/// records what ran where.
struct ScriptedRunner {
    host: String,
    exit_code: u32,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&mut self, command: &str) -> Result<ShellResult, RemoteError> {
        self.log.lock().push(format!("{}: {}", self.host, command));
        Ok(ShellResult {
            stdout: "ok\n".to_string(),
            exit_code: self.exit_code,
        })
    }

    fn target(&self) -> &str {
        &self.host
    }
}

#[derive(Default)]
struct ScriptedFactory {
    exit_code: u32,
    refuse_connections: bool,
    commands: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl RemoteExecutorFactory for ScriptedFactory {
    async fn connect(&self, hostname: &str) -> Result<Box<dyn CommandRunner>, RemoteError> {
        if self.refuse_connections {
            return Err(RemoteError::Execution {
                target: hostname.to_string(),
                command: String::new(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(Box::new(ScriptedRunner {
            host: hostname.to_string(),
            exit_code: self.exit_code,
            log: self.commands.clone(),
        }))
    }
}

/// Records maintenance transitions per application; optionally fails
/// every call.
#[derive(Default)]
struct RecordingGateway {
    entered: Mutex<Vec<String>>,
    exited: Mutex<Vec<String>>,
    fail_calls: bool,
}

#[async_trait]
impl AppGateway for RecordingGateway {
    async fn enter_maintenance(&self, app: &Application) -> Result<(), HttpSessionError> {
        if self.fail_calls {
            return Err(HttpSessionError::Authentication {
                base: format!("http://{}:8080/", app.hostname),
                status: 401,
                cookie: "null".to_string(),
                body: "{\"loggedIn\": false}".to_string(),
            });
        }
        self.entered.lock().push(app.name.clone());
        Ok(())
    }

    async fn exit_maintenance(&self, app: &Application) -> Result<(), HttpSessionError> {
        self.exited.lock().push(app.name.clone());
        Ok(())
    }

    async fn freeze_progress(
        &self,
        _app: &Application,
    ) -> Result<FreezeProgress, HttpSessionError> {
        Ok(FreezeProgress::begin(FreezeMode::Frozen, "remote"))
    }
}

struct Harness {
    jobs: CutoverJobs,
    store: Arc<MemoryStore>,
    coordinator: Arc<FreezeCoordinator>,
    gateway: Arc<RecordingGateway>,
    commands: Arc<Mutex<Vec<String>>>,
}

fn harness(factory: ScriptedFactory, gateway: RecordingGateway) -> Harness {
    cutover_core::logging::init();
    let store = Arc::new(MemoryStore::new());
    store.add_environment(staging_environment());
    let coordinator = Arc::new(FreezeCoordinator::default());
    let gateway = Arc::new(gateway);
    let commands = factory.commands.clone();
    let jobs = CutoverJobs::new(
        store.clone(),
        coordinator.clone(),
        Arc::new(factory),
        gateway.clone(),
        store.clone(),
    );
    Harness {
        jobs,
        store,
        coordinator,
        gateway,
        commands,
    }
}

fn freeze_request() -> JobRequest {
    JobRequest::new("freeze")
        .with_group("environment", vec!["staging".to_string()])
        .with_group("username", vec!["amy".to_string()])
        .with_group("databases", vec!["orders".to_string()])
}

fn thaw_request() -> JobRequest {
    JobRequest::new("thaw")
        .with_group("environment", vec!["staging".to_string()])
        .with_group("username", vec!["amy".to_string()])
        .with_group("databases", vec!["orders".to_string()])
}

#[tokio::test]
async fn freeze_job_locks_database_and_audits() {
    let h = harness(ScriptedFactory::default(), RecordingGateway::default());

    let report = h.jobs.run(&freeze_request()).await.unwrap();
    assert!(report.succeeded());
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].progress.mode, FreezeMode::Frozen);
    assert!(!report.outcomes[0].progress.lock_error);
    assert!(report.outcomes[0].progress.end_time.is_some());

    assert_eq!(h.coordinator.mode(ORDERS_ID), FreezeMode::Frozen);

    // both applications went into maintenance before any command ran
    assert_eq!(
        *h.gateway.entered.lock(),
        vec!["storefront".to_string(), "backoffice".to_string()]
    );
    assert!(h.gateway.exited.lock().is_empty());

    // the freeze command ran once per VM, in VM order
    assert_eq!(
        *h.commands.lock(),
        vec![
            "vm-a.internal: db-freeze orders".to_string(),
            "vm-b.internal: db-freeze orders".to_string(),
        ]
    );

    // the audit record concluded successfully
    let record = h.store.task_record(report.record.task_record_id).unwrap();
    assert_eq!(record.status, TaskStatus::Succeeded);
    assert!(record.end_time.is_some());
    assert!(record.detail.unwrap().contains("orders: Frozen"));
}

#[tokio::test]
async fn freeze_then_thaw_round_trip_restores_normal() {
    let h = harness(ScriptedFactory::default(), RecordingGateway::default());

    h.jobs.run(&freeze_request()).await.unwrap();
    let report = h.jobs.run(&thaw_request()).await.unwrap();

    assert!(report.succeeded());
    assert_eq!(h.coordinator.mode(ORDERS_ID), FreezeMode::Normal);
    assert_eq!(
        *h.gateway.exited.lock(),
        vec!["storefront".to_string(), "backoffice".to_string()]
    );
    let progress = h.coordinator.progress(ORDERS_ID).unwrap();
    assert!(!progress.lock_error);
    assert!(progress.is_concluded());
}

#[tokio::test]
async fn refused_lock_reverts_to_normal_and_fails_the_job() {
    let h = harness(
        ScriptedFactory {
            exit_code: 3,
            ..ScriptedFactory::default()
        },
        RecordingGateway::default(),
    );

    let report = h.jobs.run(&freeze_request()).await.unwrap();
    assert!(!report.succeeded());
    let progress = &report.outcomes[0].progress;
    assert_eq!(progress.mode, FreezeMode::Normal);
    assert!(progress.lock_error);
    assert!(progress.end_time.is_some());

    // the sweep stopped at the first refusal
    assert_eq!(h.commands.lock().len(), 1);

    let record = h.store.task_record(report.record.task_record_id).unwrap();
    assert_eq!(record.status, TaskStatus::Failed);
}

#[tokio::test]
async fn transport_failure_records_transition_error() {
    let h = harness(
        ScriptedFactory {
            refuse_connections: true,
            ..ScriptedFactory::default()
        },
        RecordingGateway::default(),
    );

    let report = h.jobs.run(&freeze_request()).await.unwrap();
    assert!(!report.succeeded());
    let progress = &report.outcomes[0].progress;
    assert_eq!(progress.mode, FreezeMode::Normal);
    assert!(progress.lock_error);
    assert!(progress
        .transition_error
        .as_deref()
        .unwrap()
        .contains("connection refused"));
}

#[tokio::test]
async fn maintenance_failure_abandons_freeze_before_commands() {
    let h = harness(
        ScriptedFactory::default(),
        RecordingGateway {
            fail_calls: true,
            ..RecordingGateway::default()
        },
    );

    let report = h.jobs.run(&freeze_request()).await.unwrap();
    assert!(!report.succeeded());
    let progress = &report.outcomes[0].progress;
    assert_eq!(progress.mode, FreezeMode::Normal);
    assert!(progress.lock_error);
    assert!(progress.transition_error.as_deref().unwrap().contains("401"));

    // no command ran against any VM
    assert!(h.commands.lock().is_empty());
}

#[tokio::test]
async fn freezing_an_already_frozen_database_is_a_hard_error() {
    let h = harness(ScriptedFactory::default(), RecordingGateway::default());

    let first = h.jobs.run(&freeze_request()).await.unwrap();
    let frozen_progress = h.coordinator.progress(ORDERS_ID).unwrap();

    let err = h.jobs.run(&freeze_request()).await.unwrap_err();
    assert!(matches!(err, CutoverError::StateMachine(_)));

    // the existing progress was not mutated by the losing attempt
    assert_eq!(h.coordinator.progress(ORDERS_ID).unwrap(), frozen_progress);

    // the failed run still left a concluded audit record (ids are
    // sequential in the memory store)
    let failed = h
        .store
        .task_record(first.record.task_record_id + 1)
        .unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
}

#[tokio::test]
async fn unknown_environment_fails_strictly() {
    let h = harness(ScriptedFactory::default(), RecordingGateway::default());

    let request = JobRequest::new("freeze")
        .with_group("environment", vec!["nowhere".to_string()])
        .with_group("username", vec!["amy".to_string()]);
    let err = h.jobs.run(&request).await.unwrap_err();
    assert!(err.to_string().contains("nowhere"));
    assert!(h.commands.lock().is_empty());
}

#[tokio::test]
async fn unknown_job_name_is_rejected() {
    let h = harness(ScriptedFactory::default(), RecordingGateway::default());
    let err = h
        .jobs
        .run(&JobRequest::new("defragment"))
        .await
        .unwrap_err();
    assert!(matches!(err, CutoverError::Job(_)));
}
