//! Job definitions and their revision lifecycle.

use indexmap::IndexMap;
use serde::Deserialize;

use super::container::ContainerSpec;
use crate::backend::BatchApi;
use crate::error::Result;
use crate::render::{Fields, Render, string_map};
use crate::types::JobDefinitionRevision;

/// How many times a failed job is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetryStrategy {
    pub attempts: i32,
}

/// A declared job definition.
///
/// Only the declared fields come from the configuration file; `registered`
/// is filled in by a refresh or by [`JobDefinition::register`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobDefinition {
    pub name: String,
    pub container: ContainerSpec,
    #[serde(default)]
    pub parameters: IndexMap<String, String>,
    #[serde(rename = "retryStrategy", default)]
    pub retry_strategy: Option<RetryStrategy>,
    #[serde(skip)]
    registered: Option<JobDefinitionRevision>,
}

impl Render for JobDefinition {
    fn fields(&self, for_update: bool) -> Fields {
        let mut f = Fields::new();
        f.field("jobDefinitionName", self.name.as_str())
            .field("type", "container")
            .field("containerProperties", self.container.render(for_update))
            .field("parameters", string_map(&self.parameters))
            .field(
                "retryStrategy",
                self.retry_strategy
                    .map(|r| serde_json::json!({ "attempts": r.attempts })),
            );
        f
    }
}

impl JobDefinition {
    /// ARN of the active revision, if one is known.
    pub fn arn(&self) -> Option<&str> {
        self.registered.as_ref().map(|r| r.arn.as_str())
    }

    /// Number of the active revision, if one is known.
    pub fn revision(&self) -> Option<i32> {
        self.registered.as_ref().map(|r| r.revision)
    }

    /// Whether an active revision is known.
    pub fn is_registered(&self) -> bool {
        self.registered.is_some()
    }

    pub(crate) fn attach(&mut self, revision: Option<JobDefinitionRevision>) {
        self.registered = revision;
    }

    /// List every ACTIVE revision registered under this name, following pagination.
    pub fn active_revisions(&self, api: &dyn BatchApi) -> Result<Vec<JobDefinitionRevision>> {
        let mut active = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let page = api.describe_job_definitions(&self.name, next_token.as_deref())?;
            active.extend(page.items);
            next_token = page.next_token;
            if next_token.is_none() {
                break;
            }
        }
        Ok(active)
    }

    /// Deregister every ACTIVE revision. Returns how many were deregistered.
    pub fn deregister(&mut self, api: &dyn BatchApi) -> Result<usize> {
        let active = self.active_revisions(api)?;
        for revision in &active {
            log::debug!("Deregistering {}", revision.arn);
            api.deregister_job_definition(&revision.arn)?;
        }
        self.registered = None;
        Ok(active.len())
    }

    /// Replace all ACTIVE revisions with a freshly registered one.
    pub fn register(&mut self, api: &dyn BatchApi) -> Result<JobDefinitionRevision> {
        self.deregister(api)?;
        let registered = api.register_job_definition(&self.render(false))?;
        log::info!(
            "Registered job definition {} revision {}",
            self.name,
            registered.revision
        );
        self.registered = Some(registered.clone());
        Ok(registered)
    }

    pub fn describe(&self) -> Vec<String> {
        let mut lines = vec![
            format!("name: {}", self.name),
            format!("arn: {}", self.arn().unwrap_or("-")),
            format!(
                "revision: {}",
                self.revision().map_or_else(|| "-".to_string(), |r| r.to_string())
            ),
        ];
        if !self.parameters.is_empty() {
            let names: Vec<&str> = self.parameters.keys().map(String::as_str).collect();
            lines.push(format!("parameters: {}", names.join(", ")));
        }
        lines.push("Container Properties".to_string());
        lines.extend(self.container.describe().into_iter().map(|l| format!("  {l}")));
        if let Some(retry) = self.retry_strategy {
            lines.push("Retry Strategy".to_string());
            lines.push(format!("  attempts: {}", retry.attempts));
        }
        lines
    }
}
