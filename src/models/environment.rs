use serde::{Deserialize, Serialize};

use super::logical_database::LogicalDatabase;

/// Application hosted on a VM. The hostname is the HTTP target for driving
/// the application's lifecycle endpoints and may differ from its VM's
/// hostname (virtual hosts, load-balancer aliases).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub application_id: i64,
    pub name: String,
    pub hostname: String,
}

impl Application {
    pub fn new(name: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            application_id: 0,
            name: name.into(),
            hostname: hostname.into(),
        }
    }
}

/// A VM hosting applications. The hostname is the SSH target for remote
/// command execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationVm {
    pub application_vm_id: i64,
    pub hostname: String,
    pub applications: Vec<Application>,
}

impl ApplicationVm {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            application_vm_id: 0,
            hostname: hostname.into(),
            applications: Vec::new(),
        }
    }

    pub fn with_application(mut self, application: Application) -> Self {
        self.applications.push(application);
        self
    }
}

/// Environment is a named grouping of application VMs and logical databases
/// under common management. It is assembled by an administrator or loader
/// and is read-only while orchestration runs against it; the orchestration
/// core never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub environment_id: i64,
    pub name: String,
    pub vms: Vec<ApplicationVm>,
    pub logical_databases: Vec<LogicalDatabase>,
}

impl Environment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            environment_id: 0,
            name: name.into(),
            vms: Vec::new(),
            logical_databases: Vec::new(),
        }
    }

    pub fn with_vm(mut self, vm: ApplicationVm) -> Self {
        self.vms.push(vm);
        self
    }

    pub fn with_logical_database(mut self, logical: LogicalDatabase) -> Self {
        self.logical_databases.push(logical);
        self
    }

    /// Look up a logical database by name.
    pub fn logical_database(&self, name: &str) -> Option<&LogicalDatabase> {
        self.logical_databases.iter().find(|db| db.name == name)
    }

    /// All applications across all VMs, in VM order.
    pub fn applications(&self) -> impl Iterator<Item = &Application> {
        self.vms.iter().flat_map(|vm| vm.applications.iter())
    }
}
