//! Job submission and queue monitoring.

use std::io::Read;

use indexmap::IndexMap;

use crate::error::Result;
use crate::manager::Manager;
use crate::poll::poll_until;
use crate::types::{JobStatus, JobSubmission};

const CANCEL_REASON: &str = "Cancelling all jobs.";
const TERMINATE_REASON: &str = "Terminating all jobs.";

/// Column order of the status table.
const TABLE_ORDER: [JobStatus; 7] = [
    JobStatus::Submitted,
    JobStatus::Pending,
    JobStatus::Runnable,
    JobStatus::Starting,
    JobStatus::Running,
    JobStatus::Failed,
    JobStatus::Succeeded,
];

/// Number of jobs per status in one queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts([usize; 7]);

impl StatusCounts {
    pub fn get(&self, status: JobStatus) -> usize {
        self.0[status.index()]
    }

    pub fn add(&mut self, status: JobStatus, count: usize) {
        self.0[status.index()] += count;
    }

    /// Jobs that have not reached a terminal status.
    pub fn runnable(&self) -> usize {
        JobStatus::ALL
            .iter()
            .filter(|s| !s.is_terminal())
            .map(|s| self.get(*s))
            .sum()
    }

    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }

    /// The `Job Status:` table.
    pub fn table(&self) -> Vec<String> {
        let row = TABLE_ORDER
            .iter()
            .map(|s| format!("{:5}", self.get(*s)))
            .collect::<Vec<_>>()
            .join(" |");
        vec![
            "Job Status:".to_string(),
            "SUB   |PEND  |READY |START |RUN   |FAIL  |SUCCESS ".to_string(),
            row,
        ]
    }
}

/// Every job in a queue, across all statuses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobListing {
    pub job_ids: Vec<String>,
    pub counts: StatusCounts,
}

/// When submission registers the job definition first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RegisterPolicy {
    /// Reuse the known ACTIVE revision; register only if there is none
    #[default]
    IfMissing,
    /// Always register a fresh revision
    Always,
}

impl Manager {
    /// Make sure `definition` has an ACTIVE revision and return its ARN.
    pub fn ensure_registered(
        &mut self,
        definition: &str,
        policy: RegisterPolicy,
    ) -> Result<String> {
        let (api, jd) = self.job_definition_with_api(definition)?;
        if policy == RegisterPolicy::IfMissing {
            if let Some(arn) = jd.arn() {
                log::debug!("Using registered job definition {arn}");
                return Ok(arn.to_string());
            }
        }
        Ok(jd.register(api)?.arn)
    }

    /// Submit one job and return its ID.
    pub fn submit_job(
        &mut self,
        name: &str,
        definition: &str,
        queue: &str,
        parameters: IndexMap<String, String>,
        policy: RegisterPolicy,
    ) -> Result<String> {
        let arn = self.ensure_registered(definition, policy)?;
        let job_id = self.api.submit_job(&JobSubmission {
            job_name: name.to_string(),
            job_queue: queue.to_string(),
            job_definition: arn,
            parameters,
        })?;
        log::info!("Submitted job {name} ({job_id}) to {queue}");
        Ok(job_id)
    }

    /// Submit one job per row of a CSV parameter table.
    ///
    /// The header row names the parameters; each following row supplies
    /// their values for one job. Returns the submitted job IDs.
    pub fn submit_jobs<R: Read>(
        &mut self,
        name: &str,
        definition: &str,
        queue: &str,
        parameters: R,
        policy: RegisterPolicy,
    ) -> Result<Vec<String>> {
        let arn = self.ensure_registered(definition, policy)?;

        let mut reader = csv::Reader::from_reader(parameters);
        let headers = reader.headers()?.clone();
        let mut job_ids = Vec::new();
        for record in reader.records() {
            let record = record?;
            let parameters = headers
                .iter()
                .zip(record.iter())
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            job_ids.push(self.api.submit_job(&JobSubmission {
                job_name: name.to_string(),
                job_queue: queue.to_string(),
                job_definition: arn.clone(),
                parameters,
            })?);
        }
        log::info!("Submitted {} jobs to {queue}", job_ids.len());
        Ok(job_ids)
    }

    /// List every job in `queue`, one paginated listing per status.
    pub fn get_jobs(&self, queue: &str) -> Result<JobListing> {
        let mut listing = JobListing::default();
        for status in JobStatus::ALL {
            let mut next_token: Option<String> = None;
            loop {
                let page = self.api.list_jobs(queue, status, next_token.as_deref())?;
                listing.counts.add(status, page.items.len());
                listing.job_ids.extend(page.items);
                next_token = page.next_token;
                if next_token.is_none() {
                    break;
                }
            }
        }
        Ok(listing)
    }

    /// The status table of `queue` and its runnable count.
    pub fn list_jobs(&self, queue: &str) -> Result<(Vec<String>, usize)> {
        let counts = self.get_jobs(queue)?.counts;
        Ok((counts.table(), counts.runnable()))
    }

    /// Cancel every job in `queue`. Returns how many were cancelled.
    pub fn cancel_all_jobs(&self, queue: &str) -> Result<usize> {
        let listing = self.get_jobs(queue)?;
        for job_id in &listing.job_ids {
            self.api.cancel_job(job_id, CANCEL_REASON)?;
        }
        Ok(listing.job_ids.len())
    }

    /// Terminate every job in `queue`. Returns how many were terminated.
    pub fn terminate_all_jobs(&self, queue: &str) -> Result<usize> {
        let listing = self.get_jobs(queue)?;
        for job_id in &listing.job_ids {
            self.api.terminate_job(job_id, TERMINATE_REASON)?;
        }
        Ok(listing.job_ids.len())
    }

    /// Poll `queue` until no job is runnable, reporting each listing.
    pub fn wait_for_jobs<F>(&self, queue: &str, mut report: F) -> Result<u32>
    where
        F: FnMut(&StatusCounts),
    {
        let what = format!("jobs in {queue} to finish");
        poll_until(&self.job_poll, self.callback.as_ref(), &what, || {
            let counts = self.get_jobs(queue)?.counts;
            report(&counts);
            Ok(counts.runnable() == 0)
        })
    }
}
