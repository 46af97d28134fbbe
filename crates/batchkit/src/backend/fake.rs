//! In-memory [`BatchApi`] for tests.
//!
//! Records every call and simulates the asynchronous status transitions of
//! AWS Batch: each describe call moves `CREATING`/`UPDATING` resources to
//! `VALID` and `DELETING` ones to `DELETED`.

use std::sync::{Arc, Mutex, MutexGuard};

use indexmap::IndexMap;
use serde_json::Value;

use super::BatchApi;
use crate::error::{Error, Result};
use crate::render::Payload;
use crate::types::{
    JobDefinitionRevision, JobStatus, JobSubmission, LiveComputeEnvironment, LiveQueue, Page,
    state, status,
};

const ARN_PREFIX: &str = "arn:aws:batch:us-east-1:000000000000";

/// A recorded API call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    DescribeJobDefinitions(String),
    DeregisterJobDefinition(String),
    RegisterJobDefinition(Payload),
    DescribeComputeEnvironments(Vec<String>),
    CreateComputeEnvironment(Payload),
    UpdateComputeEnvironment(Payload),
    DeleteComputeEnvironment(String),
    DescribeJobQueues(Vec<String>),
    CreateJobQueue(Payload),
    UpdateJobQueue(Payload),
    DeleteJobQueue(String),
    ListJobs(String, JobStatus),
    SubmitJob(JobSubmission),
    CancelJob(String),
    TerminateJob(String),
}

#[derive(Debug)]
struct Revision {
    name: String,
    revision: i32,
    active: bool,
}

#[derive(Debug)]
struct Job {
    id: String,
    queue: String,
    status: JobStatus,
}

#[derive(Debug)]
struct State {
    page_size: usize,
    stalled: bool,
    instant_jobs: bool,
    revisions: Vec<Revision>,
    environments: IndexMap<String, LiveComputeEnvironment>,
    queues: IndexMap<String, LiveQueue>,
    jobs: Vec<Job>,
    calls: Vec<Call>,
}

/// Shared-state fake; clones observe the same resources and call log.
#[derive(Debug, Clone)]
pub struct FakeBatch {
    state: Arc<Mutex<State>>,
}

impl Default for FakeBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBatch {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                page_size: 100,
                stalled: false,
                instant_jobs: false,
                revisions: Vec::new(),
                environments: IndexMap::new(),
                queues: IndexMap::new(),
                jobs: Vec::new(),
                calls: Vec::new(),
            })),
        }
    }

    /// Limit the number of items per page of paginated calls.
    pub fn with_page_size(self, page_size: usize) -> Self {
        self.lock().page_size = page_size;
        self
    }

    /// Freeze status transitions, so polls never succeed.
    pub fn with_stalled_transitions(self) -> Self {
        self.lock().stalled = true;
        self
    }

    /// Submitted jobs succeed immediately.
    pub fn with_instant_jobs(self) -> Self {
        self.lock().instant_jobs = true;
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Register an ACTIVE revision directly, returning it.
    pub fn add_job_definition(&self, name: &str) -> JobDefinitionRevision {
        let mut inner = self.lock();
        let revision = next_revision(&inner.revisions, name);
        inner.revisions.push(Revision {
            name: name.to_string(),
            revision,
            active: true,
        });
        job_definition_revision(name, revision)
    }

    /// Seed a live compute environment.
    pub fn add_environment(&self, name: &str, live_state: &str, live_status: &str) -> String {
        let arn = format!("{ARN_PREFIX}:compute-environment/{name}");
        self.lock().environments.insert(
            name.to_string(),
            LiveComputeEnvironment {
                name: name.to_string(),
                arn: arn.clone(),
                state: Some(live_state.to_string()),
                status: Some(live_status.to_string()),
                ..Default::default()
            },
        );
        arn
    }

    /// Seed a live job queue.
    pub fn add_queue(&self, name: &str, live_state: &str, live_status: &str) -> String {
        let arn = format!("{ARN_PREFIX}:job-queue/{name}");
        self.lock().queues.insert(
            name.to_string(),
            LiveQueue {
                name: name.to_string(),
                arn: arn.clone(),
                state: Some(live_state.to_string()),
                status: Some(live_status.to_string()),
                ..Default::default()
            },
        );
        arn
    }

    /// Seed a job, returning its ID.
    pub fn add_job(&self, queue: &str, job_status: JobStatus) -> String {
        let mut inner = self.lock();
        let id = format!("job-{}", inner.jobs.len() + 1);
        inner.jobs.push(Job {
            id: id.clone(),
            queue: queue.to_string(),
            status: job_status,
        });
        id
    }

    pub fn environment(&self, name: &str) -> Option<LiveComputeEnvironment> {
        self.lock().environments.get(name).cloned()
    }

    pub fn queue(&self, name: &str) -> Option<LiveQueue> {
        self.lock().queues.get(name).cloned()
    }

    pub fn job_status(&self, id: &str) -> Option<JobStatus> {
        self.lock().jobs.iter().find(|j| j.id == id).map(|j| j.status)
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Number of recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| pred(c)).count()
    }

    /// Position of the first recorded call matching `pred`.
    pub fn position(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.lock().calls.iter().position(pred)
    }

    fn record(&self, call: Call) -> MutexGuard<'_, State> {
        let mut inner = self.lock();
        inner.calls.push(call);
        inner
    }
}

fn next_revision(revisions: &[Revision], name: &str) -> i32 {
    revisions
        .iter()
        .filter(|r| r.name == name)
        .map(|r| r.revision)
        .max()
        .unwrap_or(0)
        + 1
}

fn job_definition_revision(name: &str, revision: i32) -> JobDefinitionRevision {
    JobDefinitionRevision {
        name: name.to_string(),
        arn: format!("{ARN_PREFIX}:job-definition/{name}:{revision}"),
        revision,
    }
}

fn text(payload: &Payload, key: &str) -> Option<String> {
    payload.get(key).and_then(Value::as_str).map(str::to_string)
}

fn rejected(operation: &'static str, message: impl Into<String>) -> Error {
    Error::Api {
        operation,
        message: message.into(),
    }
}

fn settle(current: &mut Option<String>) {
    let next = match current.as_deref() {
        Some(status::CREATING | status::UPDATING) => status::VALID,
        Some(status::DELETING) => status::DELETED,
        _ => return,
    };
    *current = Some(next.to_string());
}

/// Key of the entry whose name or ARN equals `identifier`.
fn find_key<T>(
    entries: &IndexMap<String, T>,
    identifier: &str,
    arn: impl Fn(&T) -> &str,
) -> Option<String> {
    entries
        .iter()
        .find(|(name, entry)| *name == identifier || arn(entry) == identifier)
        .map(|(name, _)| name.clone())
}

fn page<T: Clone>(items: &[T], page_size: usize, next_token: Option<&str>) -> Page<T> {
    let start = next_token.and_then(|t| t.parse().ok()).unwrap_or(0);
    let end = (start + page_size).min(items.len());
    Page {
        items: items[start.min(end)..end].to_vec(),
        next_token: (end < items.len()).then(|| end.to_string()),
    }
}

impl BatchApi for FakeBatch {
    fn describe_job_definitions(
        &self,
        name: &str,
        next_token: Option<&str>,
    ) -> Result<Page<JobDefinitionRevision>> {
        let inner = self.record(Call::DescribeJobDefinitions(name.to_string()));
        let active: Vec<JobDefinitionRevision> = inner
            .revisions
            .iter()
            .filter(|r| r.name == name && r.active)
            .map(|r| job_definition_revision(&r.name, r.revision))
            .collect();
        Ok(page(&active, inner.page_size, next_token))
    }

    fn deregister_job_definition(&self, arn: &str) -> Result<()> {
        let mut inner = self.record(Call::DeregisterJobDefinition(arn.to_string()));
        let revision = inner
            .revisions
            .iter_mut()
            .find(|r| job_definition_revision(&r.name, r.revision).arn == arn)
            .ok_or_else(|| rejected("DeregisterJobDefinition", format!("unknown {arn}")))?;
        revision.active = false;
        Ok(())
    }

    fn register_job_definition(&self, payload: &Payload) -> Result<JobDefinitionRevision> {
        let mut inner = self.record(Call::RegisterJobDefinition(payload.clone()));
        let name = text(payload, "jobDefinitionName")
            .ok_or_else(|| rejected("RegisterJobDefinition", "missing jobDefinitionName"))?;
        let revision = next_revision(&inner.revisions, &name);
        inner.revisions.push(Revision {
            name: name.clone(),
            revision,
            active: true,
        });
        Ok(job_definition_revision(&name, revision))
    }

    fn describe_compute_environments(
        &self,
        names: &[String],
    ) -> Result<Vec<LiveComputeEnvironment>> {
        let mut inner = self.record(Call::DescribeComputeEnvironments(names.to_vec()));
        if !inner.stalled {
            for environment in inner.environments.values_mut() {
                settle(&mut environment.status);
            }
        }
        Ok(names
            .iter()
            .filter_map(|n| inner.environments.get(n).cloned())
            .collect())
    }

    fn create_compute_environment(&self, payload: &Payload) -> Result<()> {
        const OP: &str = "CreateComputeEnvironment";
        let mut inner = self.record(Call::CreateComputeEnvironment(payload.clone()));
        let name = text(payload, "computeEnvironmentName")
            .ok_or_else(|| rejected(OP, "missing computeEnvironmentName"))?;
        if inner.environments.contains_key(&name) {
            return Err(rejected(OP, format!("{name} already exists")));
        }
        inner.environments.insert(
            name.clone(),
            LiveComputeEnvironment {
                arn: format!("{ARN_PREFIX}:compute-environment/{name}"),
                name,
                state: text(payload, "state").or_else(|| Some(state::ENABLED.to_string())),
                status: Some(status::CREATING.to_string()),
                service_role: text(payload, "serviceRole"),
                ..Default::default()
            },
        );
        Ok(())
    }

    fn update_compute_environment(&self, payload: &Payload) -> Result<()> {
        const OP: &str = "UpdateComputeEnvironment";
        let mut inner = self.record(Call::UpdateComputeEnvironment(payload.clone()));
        let identifier =
            text(payload, "computeEnvironment").ok_or_else(|| rejected(OP, "missing identifier"))?;
        let key = find_key(&inner.environments, &identifier, |e| e.arn.as_str())
            .ok_or_else(|| rejected(OP, format!("{identifier} not found")))?;
        if let Some(environment) = inner.environments.get_mut(&key) {
            if let Some(new_state) = text(payload, "state") {
                environment.state = Some(new_state);
            }
            environment.status = Some(status::UPDATING.to_string());
        }
        Ok(())
    }

    fn delete_compute_environment(&self, name: &str) -> Result<()> {
        const OP: &str = "DeleteComputeEnvironment";
        let mut inner = self.record(Call::DeleteComputeEnvironment(name.to_string()));
        let key = find_key(&inner.environments, name, |e| e.arn.as_str())
            .ok_or_else(|| rejected(OP, format!("{name} not found")))?;
        if let Some(environment) = inner.environments.get_mut(&key) {
            if environment.state.as_deref() != Some(state::DISABLED) {
                return Err(rejected(OP, "compute environment must be DISABLED"));
            }
            environment.status = Some(status::DELETING.to_string());
        }
        Ok(())
    }

    fn describe_job_queues(&self, names: &[String]) -> Result<Vec<LiveQueue>> {
        let mut inner = self.record(Call::DescribeJobQueues(names.to_vec()));
        if !inner.stalled {
            for queue in inner.queues.values_mut() {
                settle(&mut queue.status);
            }
        }
        Ok(names
            .iter()
            .filter_map(|n| inner.queues.get(n).cloned())
            .collect())
    }

    fn create_job_queue(&self, payload: &Payload) -> Result<()> {
        const OP: &str = "CreateJobQueue";
        let mut inner = self.record(Call::CreateJobQueue(payload.clone()));
        let name =
            text(payload, "jobQueueName").ok_or_else(|| rejected(OP, "missing jobQueueName"))?;
        if inner.queues.contains_key(&name) {
            return Err(rejected(OP, format!("{name} already exists")));
        }
        inner.queues.insert(
            name.clone(),
            LiveQueue {
                arn: format!("{ARN_PREFIX}:job-queue/{name}"),
                name,
                state: text(payload, "state").or_else(|| Some(state::ENABLED.to_string())),
                status: Some(status::CREATING.to_string()),
                status_reason: None,
                priority: payload
                    .get("priority")
                    .and_then(Value::as_i64)
                    .and_then(|p| i32::try_from(p).ok()),
            },
        );
        Ok(())
    }

    fn update_job_queue(&self, payload: &Payload) -> Result<()> {
        const OP: &str = "UpdateJobQueue";
        let mut inner = self.record(Call::UpdateJobQueue(payload.clone()));
        let identifier =
            text(payload, "jobQueue").ok_or_else(|| rejected(OP, "missing identifier"))?;
        let key = find_key(&inner.queues, &identifier, |q| q.arn.as_str())
            .ok_or_else(|| rejected(OP, format!("{identifier} not found")))?;
        if let Some(queue) = inner.queues.get_mut(&key) {
            if let Some(new_state) = text(payload, "state") {
                queue.state = Some(new_state);
            }
            queue.status = Some(status::UPDATING.to_string());
        }
        Ok(())
    }

    fn delete_job_queue(&self, name: &str) -> Result<()> {
        const OP: &str = "DeleteJobQueue";
        let mut inner = self.record(Call::DeleteJobQueue(name.to_string()));
        let key = find_key(&inner.queues, name, |q| q.arn.as_str())
            .ok_or_else(|| rejected(OP, format!("{name} not found")))?;
        if let Some(queue) = inner.queues.get_mut(&key) {
            if queue.state.as_deref() != Some(state::DISABLED) {
                return Err(rejected(OP, "job queue must be DISABLED"));
            }
            queue.status = Some(status::DELETING.to_string());
        }
        Ok(())
    }

    fn list_jobs(
        &self,
        queue: &str,
        job_status: JobStatus,
        next_token: Option<&str>,
    ) -> Result<Page<String>> {
        let inner = self.record(Call::ListJobs(queue.to_string(), job_status));
        let ids: Vec<String> = inner
            .jobs
            .iter()
            .filter(|j| j.queue == queue && j.status == job_status)
            .map(|j| j.id.clone())
            .collect();
        Ok(page(&ids, inner.page_size, next_token))
    }

    fn submit_job(&self, submission: &JobSubmission) -> Result<String> {
        let mut inner = self.record(Call::SubmitJob(submission.clone()));
        let id = format!("job-{}", inner.jobs.len() + 1);
        let initial = if inner.instant_jobs {
            JobStatus::Succeeded
        } else {
            JobStatus::Submitted
        };
        inner.jobs.push(Job {
            id: id.clone(),
            queue: submission.job_queue.clone(),
            status: initial,
        });
        Ok(id)
    }

    fn cancel_job(&self, job_id: &str, _reason: &str) -> Result<()> {
        let mut inner = self.record(Call::CancelJob(job_id.to_string()));
        fail_job(&mut inner, "CancelJob", job_id)
    }

    fn terminate_job(&self, job_id: &str, _reason: &str) -> Result<()> {
        let mut inner = self.record(Call::TerminateJob(job_id.to_string()));
        fail_job(&mut inner, "TerminateJob", job_id)
    }
}

fn fail_job(inner: &mut State, operation: &'static str, job_id: &str) -> Result<()> {
    let job = inner
        .jobs
        .iter_mut()
        .find(|j| j.id == job_id)
        .ok_or_else(|| rejected(operation, format!("unknown job {job_id}")))?;
    if !job.status.is_terminal() {
        job.status = JobStatus::Failed;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_transitions_on_describe() {
        let fake = FakeBatch::new();
        fake.create_job_queue(&payload(json!({"jobQueueName": "q", "priority": 1})))
            .unwrap();
        assert_eq!(fake.queue("q").unwrap().status.as_deref(), Some("CREATING"));

        let described = fake.describe_job_queues(&["q".to_string()]).unwrap();
        assert_eq!(described[0].status.as_deref(), Some("VALID"));
        assert_eq!(described[0].priority, Some(1));
    }

    #[test]
    fn test_delete_requires_disabled() {
        let fake = FakeBatch::new();
        fake.add_queue("q", "ENABLED", "VALID");
        assert!(fake.delete_job_queue("q").is_err());

        fake.update_job_queue(&payload(json!({"jobQueue": "q", "state": "DISABLED"})))
            .unwrap();
        fake.delete_job_queue("q").unwrap();
        assert_eq!(fake.queue("q").unwrap().status.as_deref(), Some("DELETING"));
    }

    #[test]
    fn test_pagination() {
        let fake = FakeBatch::new().with_page_size(2);
        for _ in 0..3 {
            fake.add_job("q", JobStatus::Running);
        }
        let first = fake.list_jobs("q", JobStatus::Running, None).unwrap();
        assert_eq!(first.items.len(), 2);
        let second = fake
            .list_jobs("q", JobStatus::Running, first.next_token.as_deref())
            .unwrap();
        assert_eq!(second.items, vec!["job-3".to_string()]);
        assert_eq!(second.next_token, None);
    }
}
