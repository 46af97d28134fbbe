//! Reconciliation: bring everything declared up, or tear it all down.
//!
//! Both drivers run phase by phase, waiting for AWS Batch to settle and
//! refreshing live state between phases.

use crate::error::Result;
use crate::manager::Manager;
use crate::poll::poll_until;
use crate::types::{LiveComputeEnvironment, LiveQueue, ReconcileSummary, state, status};

impl Manager {
    /// Create or update every declared resource.
    ///
    /// 1. Compute environments, then wait until all are `VALID`.
    /// 2. Queues.
    /// 3. Job definitions, always registering a fresh revision.
    pub fn assemble(&mut self) -> Result<ReconcileSummary> {
        let mut summary = ReconcileSummary::default();

        log::info!("Assembling compute environments");
        let environments = self.declared_environments();
        for name in &environments {
            let result = if self.compute_environment(name)?.exists() {
                self.update_compute_environment(name)?
            } else {
                self.create_compute_environment(name)?
            };
            summary.add_result(&result);
        }
        self.wait_compute_environments_valid(&environments)?;
        self.refresh()?;

        log::info!("Assembling queues");
        for name in self.declared_queues() {
            let result = if self.queue(&name)?.exists() {
                self.update_queue(&name)?
            } else {
                self.create_queue(&name)?
            };
            summary.add_result(&result);
        }
        self.refresh()?;

        log::info!("Registering job definitions");
        let definitions: Vec<String> = self.job_definitions.keys().cloned().collect();
        for name in definitions {
            let result = self.create_job_definition(&name)?;
            summary.add_result(&result);
        }

        Ok(summary)
    }

    /// Remove every declared resource.
    ///
    /// Job definitions are deregistered and queued jobs terminated first;
    /// queues and then compute environments are disabled, awaited and
    /// deleted. Only declared names are touched.
    pub fn teardown(&mut self) -> Result<ReconcileSummary> {
        let mut summary = ReconcileSummary::default();

        log::info!("Deregistering job definitions");
        let definitions: Vec<String> = self.job_definitions.keys().cloned().collect();
        for name in definitions {
            let result = self.deregister_job_definition(&name)?;
            summary.add_result(&result);
        }

        let queues = self.declared_queues();
        for name in &queues {
            let queue = self.queue(name)?;
            if queue.exists() && !is_gone(queue.status()) {
                let count = self.terminate_all_jobs(name)?;
                log::info!("Terminated {count} jobs in queue {name}");
            }
        }

        log::info!("Disabling queues");
        self.refresh()?;
        for name in &queues {
            let queue = self.queue(name)?;
            if queue.exists() && queue.aws_state() != Some(state::DISABLED) {
                summary.add_result(&self.disable_queue(name)?);
            }
        }
        self.wait_queues_disabled(&queues)?;
        self.refresh()?;

        log::info!("Deleting queues");
        for name in &queues {
            let queue = self.queue(name)?;
            if queue.exists() && !is_gone(queue.status()) {
                summary.add_result(&self.destroy_queue(name)?);
            }
        }
        self.wait_queues_deleted(&queues)?;
        self.refresh()?;

        let environments = self.declared_environments();

        log::info!("Disabling compute environments");
        for name in &environments {
            let ce = self.compute_environment(name)?;
            if ce.exists() && ce.aws_state() != Some(state::DISABLED) {
                summary.add_result(&self.disable_compute_environment(name)?);
            }
        }
        self.wait_compute_environments_disabled(&environments)?;
        self.refresh()?;

        log::info!("Deleting compute environments");
        for name in &environments {
            let ce = self.compute_environment(name)?;
            if ce.exists() && !is_gone(ce.status()) {
                summary.add_result(&self.destroy_compute_environment(name)?);
            }
        }
        self.wait_compute_environments_deleted(&environments)?;
        self.refresh()?;

        Ok(summary)
    }

    // ========================================================================
    // Barriers
    // ========================================================================

    /// Wait until every named compute environment reports status `VALID`.
    pub fn wait_compute_environments_valid(&self, names: &[String]) -> Result<u32> {
        self.wait_compute_environments(names, "compute environments to become VALID", false, |ce| {
            ce.status.as_deref() == Some(status::VALID)
        })
    }

    /// Wait until every named compute environment is `DISABLED` and no longer updating.
    pub fn wait_compute_environments_disabled(&self, names: &[String]) -> Result<u32> {
        self.wait_compute_environments(names, "compute environments to disable", true, |ce| {
            settled_disabled(ce.state.as_deref(), ce.status.as_deref())
        })
    }

    /// Wait until every named compute environment is `DELETED` or gone.
    pub fn wait_compute_environments_deleted(&self, names: &[String]) -> Result<u32> {
        self.wait_compute_environments(names, "compute environments to delete", true, |ce| {
            ce.status.as_deref() == Some(status::DELETED)
        })
    }

    /// Wait until every named queue is `DISABLED` and no longer updating.
    pub fn wait_queues_disabled(&self, names: &[String]) -> Result<u32> {
        self.wait_queues(names, "queues to disable", |q| {
            settled_disabled(q.state.as_deref(), q.status.as_deref())
        })
    }

    /// Wait until every named queue is `DELETED` or gone.
    pub fn wait_queues_deleted(&self, names: &[String]) -> Result<u32> {
        self.wait_queues(names, "queues to delete", |q| {
            q.status.as_deref() == Some(status::DELETED)
        })
    }

    fn wait_compute_environments<F>(
        &self,
        names: &[String],
        what: &str,
        missing_ok: bool,
        done: F,
    ) -> Result<u32>
    where
        F: Fn(&LiveComputeEnvironment) -> bool,
    {
        if names.is_empty() {
            return Ok(0);
        }
        poll_until(&self.poll, self.callback.as_ref(), what, || {
            let live = self.api.describe_compute_environments(names)?;
            Ok(names.iter().all(|name| {
                live.iter()
                    .find(|ce| ce.name == *name)
                    .map_or(missing_ok, &done)
            }))
        })
    }

    // A queue that is not returned at all needs no further waiting
    fn wait_queues<F>(&self, names: &[String], what: &str, done: F) -> Result<u32>
    where
        F: Fn(&LiveQueue) -> bool,
    {
        if names.is_empty() {
            return Ok(0);
        }
        poll_until(&self.poll, self.callback.as_ref(), what, || {
            let live = self.api.describe_job_queues(names)?;
            Ok(names
                .iter()
                .all(|name| live.iter().find(|q| q.name == *name).is_none_or(&done)))
        })
    }

    fn declared_queues(&self) -> Vec<String> {
        self.queues.keys().cloned().collect()
    }

    fn declared_environments(&self) -> Vec<String> {
        self.compute_environments.keys().cloned().collect()
    }
}

fn settled_disabled(live_state: Option<&str>, live_status: Option<&str>) -> bool {
    live_state == Some(state::DISABLED) && live_status != Some(status::UPDATING)
}

fn is_gone(live_status: Option<&str>) -> bool {
    matches!(live_status, Some(status::DELETED | status::DELETING))
}
