//! Job queues and the compute environments they dispatch into.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

use super::container::indent_item;
use crate::render::{Fields, Render, render_all};
use crate::types::{DesiredState, LiveComputeEnvironment, LiveQueue};

/// A queue's reference to a compute environment at a given priority.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ComputeEnvironmentOrder {
    pub name: String,
    pub order: i32,
    #[serde(skip)]
    arn: Option<String>,
}

impl ComputeEnvironmentOrder {
    pub fn new(name: impl Into<String>, order: i32) -> Self {
        Self {
            name: name.into(),
            order,
            arn: None,
        }
    }

    /// ARN of the referenced environment, once resolved.
    pub fn arn(&self) -> Option<&str> {
        self.arn.as_deref()
    }
}

impl Render for ComputeEnvironmentOrder {
    fn fields(&self, _for_update: bool) -> Fields {
        let mut f = Fields::new();
        f.field("computeEnvironment", self.arn.as_deref())
            .field("order", self.order);
        f
    }
}

/// A declared job queue merged with its live snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Queue {
    pub name: String,
    #[serde(default)]
    pub state: DesiredState,
    pub priority: i32,
    #[serde(default, deserialize_with = "ordered_environments")]
    pub compute_environments: IndexMap<String, ComputeEnvironmentOrder>,
    #[serde(skip)]
    live: Option<LiveQueue>,
}

/// Read the `compute_environments` list into a name-keyed map, keeping order.
fn ordered_environments<'de, D>(
    deserializer: D,
) -> Result<IndexMap<String, ComputeEnvironmentOrder>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Vec::<ComputeEnvironmentOrder>::deserialize(deserializer)?;
    Ok(entries.into_iter().map(|e| (e.name.clone(), e)).collect())
}

impl Render for Queue {
    const LIMITED_UPDATE: bool = true;

    fn fields(&self, for_update: bool) -> Fields {
        let mut f = Fields::new();
        f.identifier("jobQueue", self.identifier())
            .field("jobQueueName", self.name.as_str())
            .updatable(
                "computeEnvironmentOrder",
                render_all(self.compute_environments.values(), for_update),
            )
            .updatable("priority", self.priority)
            .updatable("state", self.state.as_str());
        f
    }
}

impl Queue {
    /// Live ARN when known, otherwise the declared name.
    pub fn identifier(&self) -> &str {
        self.arn().unwrap_or(&self.name)
    }

    /// Whether a live counterpart was found on the last refresh.
    pub fn exists(&self) -> bool {
        self.live.is_some()
    }

    pub fn live(&self) -> Option<&LiveQueue> {
        self.live.as_ref()
    }

    pub fn arn(&self) -> Option<&str> {
        self.live.as_ref().map(|l| l.arn.as_str())
    }

    /// Live state (`ENABLED`/`DISABLED`).
    pub fn aws_state(&self) -> Option<&str> {
        self.live.as_ref().and_then(|l| l.state.as_deref())
    }

    /// Live status (`CREATING`, `VALID`, `DELETED`, ...).
    pub fn status(&self) -> Option<&str> {
        self.live.as_ref().and_then(|l| l.status.as_deref())
    }

    pub fn status_reason(&self) -> Option<&str> {
        self.live.as_ref().and_then(|l| l.status_reason.as_deref())
    }

    pub(crate) fn attach(&mut self, live: Option<LiveQueue>) {
        self.live = live;
    }

    /// Fill in the ARN of every referenced environment found in `described`.
    ///
    /// References to environments that were not returned lose their ARN.
    pub(crate) fn resolve_compute_environments(&mut self, described: &[LiveComputeEnvironment]) {
        for reference in self.compute_environments.values_mut() {
            reference.arn = described
                .iter()
                .find(|ce| ce.name == reference.name)
                .map(|ce| ce.arn.clone());
        }
    }

    pub fn describe(&self) -> Vec<String> {
        let Some(live) = &self.live else {
            return vec![format!("name: {}", self.name), "(not created)".to_string()];
        };
        let mut lines = vec![
            format!("name: {}", self.name),
            format!("arn: {}", live.arn),
            format!("priority: {}", live.priority.unwrap_or(self.priority)),
            format!("state: {}", live.state.as_deref().unwrap_or("-")),
            format!("status: {}", live.status.as_deref().unwrap_or("-")),
        ];
        if let Some(reason) = &live.status_reason {
            lines.push(format!("statusReason: {reason}"));
        }
        if !self.compute_environments.is_empty() {
            lines.push("Compute Environments:".to_string());
            for reference in self.compute_environments.values() {
                lines.extend(indent_item(&[
                    format!("name: {}", reference.name),
                    format!("order: {}", reference.order),
                ]));
            }
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn queue() -> Queue {
        serde_yaml::from_str(
            r"
name: crunch-queue
priority: 0
compute_environments:
  - name: spot-ce
    order: 1
  - name: ondemand-ce
    order: 2
",
        )
        .unwrap()
    }

    fn described(name: &str) -> LiveComputeEnvironment {
        LiveComputeEnvironment {
            name: name.to_string(),
            arn: format!("arn:ce/{name}"),
            ..Default::default()
        }
    }

    #[test]
    fn test_deserialize_keeps_declaration_order() {
        let q = queue();
        let names: Vec<&str> = q.compute_environments.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["spot-ce", "ondemand-ce"]);
        assert_eq!(q.state, DesiredState::Enabled);
    }

    #[test]
    fn test_create_payload() {
        let mut q = queue();
        q.resolve_compute_environments(&[described("spot-ce"), described("ondemand-ce")]);
        let payload = q.render(false);

        assert!(!payload.contains_key("jobQueue"));
        assert_eq!(payload["jobQueueName"], json!("crunch-queue"));
        assert_eq!(payload["priority"], json!(0));
        assert_eq!(payload["state"], json!("ENABLED"));
        assert_eq!(
            payload["computeEnvironmentOrder"],
            json!([
                {"computeEnvironment": "arn:ce/spot-ce", "order": 1},
                {"computeEnvironment": "arn:ce/ondemand-ce", "order": 2},
            ])
        );
    }

    #[test]
    fn test_update_payload() {
        let mut q = queue();
        q.attach(Some(LiveQueue {
            name: "crunch-queue".into(),
            arn: "arn:queue/crunch-queue".into(),
            ..Default::default()
        }));
        let payload = q.render(true);

        assert_eq!(payload["jobQueue"], json!("arn:queue/crunch-queue"));
        assert!(!payload.contains_key("jobQueueName"));
        assert!(payload.contains_key("priority"));
        assert!(payload.contains_key("state"));
    }

    #[test]
    fn test_unresolved_reference_renders_order_only() {
        let mut q = queue();
        q.resolve_compute_environments(&[described("spot-ce")]);

        assert_eq!(q.compute_environments["spot-ce"].arn(), Some("arn:ce/spot-ce"));
        assert_eq!(q.compute_environments["ondemand-ce"].arn(), None);
        assert_eq!(
            q.render(false)["computeEnvironmentOrder"][1],
            json!({"order": 2})
        );
    }

    #[test]
    fn test_describe() {
        let mut q = queue();
        assert_eq!(q.describe(), vec!["name: crunch-queue", "(not created)"]);

        q.attach(Some(LiveQueue {
            name: "crunch-queue".into(),
            arn: "arn:queue/crunch-queue".into(),
            state: Some("ENABLED".into()),
            status: Some("VALID".into()),
            priority: Some(5),
            ..Default::default()
        }));
        let lines = q.describe();
        assert!(lines.contains(&"priority: 5".to_string()));
        assert!(lines.contains(&"  - name: spot-ce".to_string()));
        assert!(lines.contains(&"    order: 2".to_string()));
    }
}
