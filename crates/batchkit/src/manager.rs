//! Resource manager: declared resources cross-referenced with live state.

use indexmap::IndexMap;
use serde_json::Value;

use crate::backend::BatchApi;
use crate::declaration::Declaration;
use crate::error::{Error, Result};
use crate::poll::{NoCallback, PollCallback, PollConfig};
use crate::render::Render;
use crate::resources::{ComputeEnvironment, JobDefinition, Queue, indent_item};
use crate::types::{ApplyResult, ResourceKind, state};

/// Owns the declared resources and the API client that manages them.
///
/// Every declared entity carries a snapshot of its live counterpart, taken
/// on construction and on each [`Manager::refresh`].
pub struct Manager {
    pub(crate) api: Box<dyn BatchApi>,
    pub(crate) queues: IndexMap<String, Queue>,
    pub(crate) compute_environments: IndexMap<String, ComputeEnvironment>,
    pub(crate) job_definitions: IndexMap<String, JobDefinition>,
    pub(crate) poll: PollConfig,
    pub(crate) job_poll: PollConfig,
    pub(crate) callback: Box<dyn PollCallback>,
}

impl Manager {
    /// Take ownership of a declaration and fetch the live state of everything in it.
    pub fn new(declaration: Declaration, api: Box<dyn BatchApi>) -> Result<Self> {
        // Later duplicates replace earlier ones
        let mut manager = Self {
            api,
            queues: declaration
                .queues
                .into_iter()
                .map(|q| (q.name.clone(), q))
                .collect(),
            compute_environments: declaration
                .compute_environments
                .into_iter()
                .map(|ce| (ce.name.clone(), ce))
                .collect(),
            job_definitions: declaration
                .job_definitions
                .into_iter()
                .map(|jd| (jd.name.clone(), jd))
                .collect(),
            poll: PollConfig::resources(),
            job_poll: PollConfig::jobs(),
            callback: Box::new(NoCallback),
        };
        manager.refresh()?;
        Ok(manager)
    }

    /// Override the interval and bound of resource polls.
    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Override the interval and bound of job queue polls.
    pub fn with_job_poll(mut self, poll: PollConfig) -> Self {
        self.job_poll = poll;
        self
    }

    /// Bound every poll loop to `max_attempts` checks.
    pub fn with_max_polls(mut self, max_attempts: u32) -> Self {
        self.poll = self.poll.with_max_attempts(max_attempts);
        self.job_poll = self.job_poll.with_max_attempts(max_attempts);
        self
    }

    /// Receive progress notifications from poll loops.
    pub fn with_callback(mut self, callback: Box<dyn PollCallback>) -> Self {
        self.callback = callback;
        self
    }

    // ========================================================================
    // Refresh
    // ========================================================================

    /// Re-describe every declared resource and overwrite its live snapshot.
    pub fn refresh(&mut self) -> Result<()> {
        log::debug!("Refreshing live state");

        let queue_names: Vec<String> = self.queues.keys().cloned().collect();
        let live_queues = if queue_names.is_empty() {
            Vec::new()
        } else {
            self.api.describe_job_queues(&queue_names)?
        };
        for (name, queue) in &mut self.queues {
            queue.attach(live_queues.iter().find(|l| l.name == *name).cloned());
        }

        // Environments referenced by queues are described even when undeclared
        let mut ce_names: Vec<String> = self.compute_environments.keys().cloned().collect();
        for queue in self.queues.values() {
            for name in queue.compute_environments.keys() {
                if !ce_names.contains(name) {
                    ce_names.push(name.clone());
                }
            }
        }
        let live_environments = if ce_names.is_empty() {
            Vec::new()
        } else {
            self.api.describe_compute_environments(&ce_names)?
        };
        for (name, ce) in &mut self.compute_environments {
            ce.attach(live_environments.iter().find(|l| l.name == *name).cloned());
            let order = self
                .queues
                .values()
                .find_map(|q| q.compute_environments.get(name).map(|r| r.order))
                .unwrap_or_default();
            ce.set_order(order);
        }
        for queue in self.queues.values_mut() {
            queue.resolve_compute_environments(&live_environments);
        }

        for jd in self.job_definitions.values_mut() {
            let newest = jd
                .active_revisions(self.api.as_ref())?
                .into_iter()
                .max_by_key(|r| r.revision);
            jd.attach(newest);
        }
        Ok(())
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    pub fn queue(&self, name: &str) -> Result<&Queue> {
        self.queues.get(name).ok_or_else(|| unknown(ResourceKind::Queue, name))
    }

    pub fn compute_environment(&self, name: &str) -> Result<&ComputeEnvironment> {
        self.compute_environments
            .get(name)
            .ok_or_else(|| unknown(ResourceKind::ComputeEnvironment, name))
    }

    pub fn job_definition(&self, name: &str) -> Result<&JobDefinition> {
        self.job_definitions
            .get(name)
            .ok_or_else(|| unknown(ResourceKind::JobDefinition, name))
    }

    /// A declared job definition together with the client that registers it.
    pub(crate) fn job_definition_with_api(
        &mut self,
        name: &str,
    ) -> Result<(&dyn BatchApi, &mut JobDefinition)> {
        let jd = self
            .job_definitions
            .get_mut(name)
            .ok_or_else(|| unknown(ResourceKind::JobDefinition, name))?;
        Ok((self.api.as_ref(), jd))
    }

    pub fn queues(&self) -> impl Iterator<Item = &Queue> {
        self.queues.values()
    }

    pub fn compute_environments(&self) -> impl Iterator<Item = &ComputeEnvironment> {
        self.compute_environments.values()
    }

    pub fn job_definitions(&self) -> impl Iterator<Item = &JobDefinition> {
        self.job_definitions.values()
    }

    // ========================================================================
    // Queues
    // ========================================================================

    pub fn create_queue(&self, name: &str) -> Result<ApplyResult> {
        let queue = self.queue(name)?;
        if queue.exists() {
            return Ok(skipped(format!("Queue {name} already exists")));
        }
        self.api.create_job_queue(&queue.render(false))?;
        log::info!("Created queue {name}");
        Ok(ApplyResult::Created)
    }

    pub fn update_queue(&self, name: &str) -> Result<ApplyResult> {
        let queue = self.queue(name)?;
        if !queue.exists() {
            return Ok(skipped(format!("Queue {name} does not exist")));
        }
        self.api.update_job_queue(&queue.render(true))?;
        log::info!("Updated queue {name}");
        Ok(ApplyResult::Modified)
    }

    pub fn disable_queue(&self, name: &str) -> Result<ApplyResult> {
        let queue = self.queue(name)?;
        if !queue.exists() {
            return Ok(skipped(format!("Queue {name} does not exist")));
        }
        let mut payload = queue.render(true);
        payload.insert("state".to_string(), Value::from(state::DISABLED));
        self.api.update_job_queue(&payload)?;
        log::info!("Disabled queue {name}");
        Ok(ApplyResult::Disabled)
    }

    pub fn destroy_queue(&self, name: &str) -> Result<ApplyResult> {
        let queue = self.queue(name)?;
        if !queue.exists() {
            return Ok(skipped(format!("Queue {name} does not exist")));
        }
        if queue.aws_state() != Some(state::DISABLED) {
            return Ok(skipped(format!(
                "Queue {name} must be DISABLED before it can be destroyed (state: {})",
                queue.aws_state().unwrap_or("-")
            )));
        }
        self.api.delete_job_queue(name)?;
        log::info!("Requested deletion of queue {name}");
        Ok(ApplyResult::Removed)
    }

    // ========================================================================
    // Compute environments
    // ========================================================================

    pub fn create_compute_environment(&self, name: &str) -> Result<ApplyResult> {
        let ce = self.compute_environment(name)?;
        if ce.exists() {
            return Ok(skipped(format!("Compute environment {name} already exists")));
        }
        self.api.create_compute_environment(&ce.render(false))?;
        log::info!("Created compute environment {name}");
        Ok(ApplyResult::Created)
    }

    pub fn update_compute_environment(&self, name: &str) -> Result<ApplyResult> {
        let ce = self.compute_environment(name)?;
        if !ce.exists() {
            return Ok(skipped(format!("Compute environment {name} does not exist")));
        }
        self.api.update_compute_environment(&ce.render(true))?;
        log::info!("Updated compute environment {name}");
        Ok(ApplyResult::Modified)
    }

    pub fn disable_compute_environment(&self, name: &str) -> Result<ApplyResult> {
        let ce = self.compute_environment(name)?;
        if !ce.exists() {
            return Ok(skipped(format!("Compute environment {name} does not exist")));
        }
        let mut payload = ce.render(true);
        payload.insert("state".to_string(), Value::from(state::DISABLED));
        self.api.update_compute_environment(&payload)?;
        log::info!("Disabled compute environment {name}");
        Ok(ApplyResult::Disabled)
    }

    pub fn destroy_compute_environment(&self, name: &str) -> Result<ApplyResult> {
        let ce = self.compute_environment(name)?;
        if !ce.exists() {
            return Ok(skipped(format!("Compute environment {name} does not exist")));
        }
        if ce.aws_state() != Some(state::DISABLED) {
            return Ok(skipped(format!(
                "Compute environment {name} must be DISABLED before it can be destroyed (state: {})",
                ce.aws_state().unwrap_or("-")
            )));
        }
        self.api.delete_compute_environment(name)?;
        log::info!("Requested deletion of compute environment {name}");
        Ok(ApplyResult::Removed)
    }

    // ========================================================================
    // Job definitions
    // ========================================================================

    /// Register a fresh revision, replacing any ACTIVE ones.
    pub fn create_job_definition(&mut self, name: &str) -> Result<ApplyResult> {
        let (api, jd) = self.job_definition_with_api(name)?;
        let registered = jd.register(api)?;
        Ok(ApplyResult::Registered {
            arn: registered.arn,
            revision: registered.revision,
        })
    }

    /// Same as [`Manager::create_job_definition`]; revisions are immutable.
    pub fn update_job_definition(&mut self, name: &str) -> Result<ApplyResult> {
        self.create_job_definition(name)
    }

    /// Deregister every ACTIVE revision.
    pub fn deregister_job_definition(&mut self, name: &str) -> Result<ApplyResult> {
        let (api, jd) = self.job_definition_with_api(name)?;
        let count = jd.deregister(api)?;
        log::info!("Deregistered {count} revisions of job definition {name}");
        Ok(ApplyResult::Deregistered { count })
    }

    // ========================================================================
    // Description
    // ========================================================================

    /// Human-readable description of every declared resource.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::new();
        section(
            &mut lines,
            "Queues",
            self.queues.values().map(Queue::describe),
        );
        section(
            &mut lines,
            "Compute Environments",
            self.compute_environments
                .values()
                .map(ComputeEnvironment::describe),
        );
        section(
            &mut lines,
            "Job Definitions",
            self.job_definitions.values().map(JobDefinition::describe),
        );
        lines
    }
}

fn section<I>(lines: &mut Vec<String>, title: &str, items: I)
where
    I: Iterator<Item = Vec<String>>,
{
    lines.push(format!("{title}:"));
    let mut empty = true;
    for item in items {
        empty = false;
        lines.extend(indent_item(&item));
    }
    if empty {
        lines.push("  (none declared)".to_string());
    }
}

fn unknown(kind: ResourceKind, name: &str) -> Error {
    Error::UnknownResource {
        kind,
        name: name.to_string(),
    }
}

pub(crate) fn skipped(reason: String) -> ApplyResult {
    log::info!("Skipped: {reason}");
    ApplyResult::Skipped { reason }
}
