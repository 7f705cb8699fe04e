//! Orchestration glue: tokenized job requests in, audited freeze/thaw
//! runs out. Everything remote goes through the [`AppGateway`] and
//! [`RemoteExecutorFactory`](crate::remote::RemoteExecutorFactory) seams.

pub mod audit;
pub mod gateway;
pub mod job;
pub mod jobs;

pub use audit::TaskAudit;
pub use gateway::{AppGateway, HttpAppGateway};
pub use job::{JobRequest, ParameterGroup};
pub use jobs::{
    CutoverJobs, DatabaseOutcome, JobReport, DATABASES_PARAM, ENVIRONMENT_PARAM, FREEZE_JOB,
    THAW_JOB, USERNAME_PARAM,
};
