//! Backend abstraction for AWS Batch operations.
//!
//! The [`BatchApi`] trait lists exactly the Batch operations the manager
//! consumes, allowing for different implementations (the AWS SDK, an
//! in-memory fake for testing).

pub mod aws;
#[cfg(test)]
pub(crate) mod fake;

use crate::error::Result;
use crate::render::Payload;
use crate::types::{
    JobDefinitionRevision, JobStatus, JobSubmission, LiveComputeEnvironment, LiveQueue, Page,
};

/// Backend trait for AWS Batch operations.
///
/// Create, update and register calls take a rendered [`Payload`]; the
/// backend maps it onto the request shape of the underlying client.
pub trait BatchApi: Send + Sync {
    /// One page of the ACTIVE revisions registered under `name`.
    fn describe_job_definitions(
        &self,
        name: &str,
        next_token: Option<&str>,
    ) -> Result<Page<JobDefinitionRevision>>;

    /// Deregister one revision by ARN.
    fn deregister_job_definition(&self, arn: &str) -> Result<()>;

    /// Register a new revision from a rendered job definition.
    fn register_job_definition(&self, payload: &Payload) -> Result<JobDefinitionRevision>;

    /// Describe compute environments by name. Unknown names are omitted.
    fn describe_compute_environments(&self, names: &[String])
    -> Result<Vec<LiveComputeEnvironment>>;

    fn create_compute_environment(&self, payload: &Payload) -> Result<()>;

    fn update_compute_environment(&self, payload: &Payload) -> Result<()>;

    fn delete_compute_environment(&self, name: &str) -> Result<()>;

    /// Describe job queues by name. Unknown names are omitted.
    fn describe_job_queues(&self, names: &[String]) -> Result<Vec<LiveQueue>>;

    fn create_job_queue(&self, payload: &Payload) -> Result<()>;

    fn update_job_queue(&self, payload: &Payload) -> Result<()>;

    fn delete_job_queue(&self, name: &str) -> Result<()>;

    /// One page of job IDs in `queue` with the given status.
    fn list_jobs(
        &self,
        queue: &str,
        status: JobStatus,
        next_token: Option<&str>,
    ) -> Result<Page<String>>;

    /// Submit a job and return its ID.
    fn submit_job(&self, submission: &JobSubmission) -> Result<String>;

    fn cancel_job(&self, job_id: &str, reason: &str) -> Result<()>;

    fn terminate_job(&self, job_id: &str, reason: &str) -> Result<()>;
}
