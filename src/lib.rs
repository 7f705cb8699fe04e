#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Cutover Core
//!
//! Coordination core for blue-green database cutovers.
//!
//! ## Overview
//!
//! A cutover freezes write access on a source physical database, performs
//! or verifies a migration onto its paired target, and later thaws access
//! — while remote applications are held in maintenance mode. This crate is
//! the layer that makes that safe across unreliable remote systems: the
//! environment/database model and its invariants, the freeze-mode state
//! machine, the SSH command client, and the authenticated HTTP session
//! client, plus the job glue and audit records that tie one run together.
//!
//! ## Module Organization
//!
//! - [`models`] - Environments, VMs, applications, logical/physical
//!   databases, task records
//! - [`validation`] - The live/other pairing invariant
//! - [`state_machine`] - Freeze-mode transitions and per-database
//!   single-writer enforcement
//! - [`remote`] - SSH command execution on application VMs
//! - [`http_session`] - Cookie-authenticated application lifecycle client
//! - [`storage`] - Storage collaborator interface with memory and
//!   Postgres backends
//! - [`orchestration`] - Freeze/thaw jobs, request parameters, task audit
//! - [`events`] - Transition event broadcasting
//! - [`config`] - Layered configuration loading
//! - [`error`] - Classified error taxonomy
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cutover_core::config::ConfigManager;
//! use cutover_core::http_session::Credentials;
//! use cutover_core::orchestration::{CutoverJobs, HttpAppGateway, JobRequest};
//! use cutover_core::state_machine::FreezeCoordinator;
//! use cutover_core::storage::PostgresStore;
//!
//! # async fn example() -> cutover_core::Result<()> {
//! let config = ConfigManager::load()?;
//! let store = Arc::new(PostgresStore::connect(&config.config().database).await?);
//! let jobs = CutoverJobs::new(
//!     store.clone(),
//!     Arc::new(FreezeCoordinator::default()),
//!     Arc::new(config.config().ssh.executor_factory()?),
//!     Arc::new(HttpAppGateway::new(
//!         config.config().http.clone(),
//!         Credentials {
//!             username: config.config().http.username.clone(),
//!             password: config.config().http.password.clone(),
//!         },
//!     )),
//!     store,
//! );
//!
//! let request = JobRequest::new("freeze")
//!     .with_group("environment", vec!["staging".to_string()])
//!     .with_group("username", vec!["amy".to_string()]);
//! let report = jobs.run(&request).await?;
//! println!("job {}: {}", report.record.task_name, report.record.status);
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! One job at a time per process is assumed. Every remote operation is an
//! async call with an explicit timeout and is safe to drive from parallel
//! tasks across independent targets; the one ordering guarantee the core
//! enforces is a single in-flight freeze attempt per logical database.

pub mod config;
pub mod error;
pub mod events;
pub mod http_session;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod remote;
pub mod state_machine;
pub mod storage;
pub mod utils;
pub mod validation;

pub use error::{CutoverError, Result};
