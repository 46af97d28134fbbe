//! Compute environments and their managed compute resources.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::render::{Fields, Render, string_map};
use crate::types::{ComputeType, DesiredState, EnvironmentType, LiveComputeEnvironment};

/// Instance allocation of a MANAGED compute environment.
///
/// vCPU bounds and tags can be changed on a live environment; everything
/// else is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ComputeResources {
    #[serde(rename = "type")]
    pub kind: ComputeType,
    pub subnets: Vec<String>,
    #[serde(rename = "instanceRole")]
    pub instance_role: String,
    #[serde(rename = "instanceTypes")]
    pub instance_types: Vec<String>,
    #[serde(rename = "minvCpus")]
    pub minv_cpus: i32,
    #[serde(rename = "maxvCpus")]
    pub maxv_cpus: i32,
    #[serde(rename = "desiredvCpus", default)]
    pub desiredv_cpus: Option<i32>,
    #[serde(rename = "imageId", default)]
    pub image_id: Option<String>,
    #[serde(rename = "ec2KeyPair", default)]
    pub ec2_key_pair: Option<String>,
    #[serde(default)]
    pub tags: IndexMap<String, String>,
    #[serde(rename = "securityGroupIds")]
    pub security_group_ids: Vec<String>,
    #[serde(rename = "bidPercentage", default)]
    pub bid_percentage: Option<i32>,
    #[serde(rename = "spotIamFleetRole", default)]
    pub spot_iam_fleet_role: Option<String>,
}

impl Render for ComputeResources {
    const LIMITED_UPDATE: bool = true;

    fn fields(&self, _for_update: bool) -> Fields {
        let mut f = Fields::new();
        f.field("type", self.kind.as_str())
            .updatable("minvCpus", self.minv_cpus)
            .updatable("maxvCpus", self.maxv_cpus)
            .updatable("desiredvCpus", self.desiredv_cpus)
            .field("instanceTypes", self.instance_types.clone())
            .field("subnets", self.subnets.clone())
            .field("securityGroupIds", self.security_group_ids.clone())
            .field("instanceRole", self.instance_role.as_str())
            .field("imageId", self.image_id.as_deref())
            .field("ec2KeyPair", self.ec2_key_pair.as_deref())
            .updatable("tags", string_map(&self.tags));
        if self.kind == ComputeType::Spot {
            f.field("bidPercentage", self.bid_percentage)
                .field("spotIamFleetRole", self.spot_iam_fleet_role.as_deref());
        }
        f
    }
}

impl ComputeResources {
    pub fn describe(&self) -> Vec<String> {
        let mut lines = vec![
            "Compute Resources:".to_string(),
            format!("type: {}", self.kind),
            format!("instanceRole: {}", self.instance_role),
            format!("maxvCpus: {}", self.maxv_cpus),
            format!("minvCpus: {}", self.minv_cpus),
            format!("subnets: {}", self.subnets.join(", ")),
            format!("instanceTypes: {}", self.instance_types.join(", ")),
            format!("securityGroupIds: {}", self.security_group_ids.join(", ")),
            format!(
                "desiredvCpus: {}",
                self.desiredv_cpus
                    .map_or_else(|| "-".to_string(), |v| v.to_string())
            ),
        ];
        if let Some(image) = &self.image_id {
            lines.push(format!("imageId: {image}"));
        }
        if let Some(key) = &self.ec2_key_pair {
            lines.push(format!("ec2KeyPair: {key}"));
        }
        if !self.tags.is_empty() {
            let tags: Vec<String> = self.tags.iter().map(|(k, v)| format!("{k}={v}")).collect();
            lines.push(format!("tags: {}", tags.join(", ")));
        }
        lines
    }
}

/// A declared compute environment merged with its live snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ComputeEnvironment {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EnvironmentType,
    #[serde(default)]
    pub state: DesiredState,
    #[serde(rename = "serviceRole")]
    pub service_role: String,
    #[serde(default)]
    pub compute_resources: Option<ComputeResources>,
    /// Priority within the queue that references this environment
    #[serde(skip)]
    order: i32,
    #[serde(skip)]
    live: Option<LiveComputeEnvironment>,
}

impl Render for ComputeEnvironment {
    const LIMITED_UPDATE: bool = true;

    fn fields(&self, for_update: bool) -> Fields {
        let mut f = Fields::new();
        f.identifier("computeEnvironment", self.identifier())
            .field("computeEnvironmentName", self.name.as_str())
            .field("type", self.kind.as_str())
            .updatable("state", self.state.as_str())
            .updatable("serviceRole", self.service_role.as_str());
        if let Some(resources) = self.managed_resources() {
            f.updatable("computeResources", resources.render(for_update));
        }
        f
    }
}

impl ComputeEnvironment {
    /// Compute resources, only for MANAGED environments.
    pub fn managed_resources(&self) -> Option<&ComputeResources> {
        match self.kind {
            EnvironmentType::Managed => self.compute_resources.as_ref(),
            EnvironmentType::Unmanaged => None,
        }
    }

    /// Live ARN when known, otherwise the declared name.
    pub fn identifier(&self) -> &str {
        self.arn().unwrap_or(&self.name)
    }

    /// Whether a live counterpart was found on the last refresh.
    pub fn exists(&self) -> bool {
        self.live.is_some()
    }

    pub fn live(&self) -> Option<&LiveComputeEnvironment> {
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

    pub fn order(&self) -> i32 {
        self.order
    }

    pub(crate) fn set_order(&mut self, order: i32) {
        self.order = order;
    }

    pub(crate) fn attach(&mut self, live: Option<LiveComputeEnvironment>) {
        self.live = live;
    }

    pub fn describe(&self) -> Vec<String> {
        let Some(live) = &self.live else {
            return vec![format!("name: {}", self.name), "(not created)".to_string()];
        };
        let mut lines = vec![
            format!("name: {}", self.name),
            format!("type: {}", self.kind),
            format!("arn: {}", live.arn),
            format!("order: {}", self.order),
            format!(
                "serviceRole: {}",
                live.service_role.as_deref().unwrap_or(&self.service_role)
            ),
            format!("state: {}", live.state.as_deref().unwrap_or("-")),
            format!("status: {}", live.status.as_deref().unwrap_or("-")),
        ];
        if let Some(reason) = &live.status_reason {
            lines.push(format!("statusReason: {reason}"));
        }
        if let Some(cluster) = &live.ecs_cluster_arn {
            lines.push(format!("ecsClusterArn: {cluster}"));
        }
        if let Some(resources) = self.managed_resources() {
            let mut described = resources.describe().into_iter();
            if let Some(title) = described.next() {
                lines.push(title);
            }
            lines.extend(described.map(|l| format!("  {l}")));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn environment(extra: &str) -> ComputeEnvironment {
        serde_yaml::from_str(&format!(
            r"
name: crunch-ce
type: managed
serviceRole: arn:aws:iam::1:role/batch
compute_resources:
  type: spot
  minvCpus: 0
  maxvCpus: 4
  instanceTypes: [optimal]
  subnets: [subnet-a, subnet-b]
  securityGroupIds: [sg-1]
  instanceRole: ecsInstanceRole
  bidPercentage: 60
  spotIamFleetRole: arn:aws:iam::1:role/fleet
  tags:
    team: research
{extra}"
        ))
        .unwrap()
    }

    fn live(name: &str) -> LiveComputeEnvironment {
        LiveComputeEnvironment {
            name: name.to_string(),
            arn: format!("arn:aws:batch:us-west-2:1:compute-environment/{name}"),
            state: Some("ENABLED".into()),
            status: Some("VALID".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_payload() {
        let ce = environment("");
        let payload = ce.render(false);

        assert!(!payload.contains_key("computeEnvironment"));
        assert_eq!(payload["computeEnvironmentName"], json!("crunch-ce"));
        assert_eq!(payload["type"], json!("MANAGED"));
        assert_eq!(payload["state"], json!("ENABLED"));

        let resources = &payload["computeResources"];
        assert_eq!(resources["type"], json!("SPOT"));
        assert_eq!(resources["minvCpus"], json!(0));
        assert_eq!(resources["bidPercentage"], json!(60));
        assert_eq!(resources["tags"], json!({"team": "research"}));
        assert!(resources.get("desiredvCpus").is_none());
        assert!(resources.get("imageId").is_none());
    }

    #[test]
    fn test_update_payload_is_limited() {
        let mut ce = environment("");
        ce.attach(Some(live("crunch-ce")));
        let payload = ce.render(true);

        assert_eq!(
            payload["computeEnvironment"],
            json!("arn:aws:batch:us-west-2:1:compute-environment/crunch-ce")
        );
        assert!(!payload.contains_key("computeEnvironmentName"));
        assert!(!payload.contains_key("type"));
        assert_eq!(payload["serviceRole"], json!("arn:aws:iam::1:role/batch"));

        let resources = payload["computeResources"].as_object().unwrap();
        let mut keys: Vec<&str> = resources.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["maxvCpus", "minvCpus", "tags"]);
    }

    #[test]
    fn test_identifier_falls_back_to_name() {
        let ce = environment("");
        assert_eq!(ce.render(true)["computeEnvironment"], json!("crunch-ce"));
    }

    #[test]
    fn test_ec2_omits_spot_fields() {
        let mut ce = environment("");
        if let Some(resources) = ce.compute_resources.as_mut() {
            resources.kind = ComputeType::Ec2;
        }
        let resources = ce.render(false)["computeResources"].clone();
        assert!(resources.get("bidPercentage").is_none());
        assert!(resources.get("spotIamFleetRole").is_none());
    }

    #[test]
    fn test_unmanaged_has_no_resources() {
        let mut ce = environment("");
        ce.kind = EnvironmentType::Unmanaged;
        assert!(!ce.render(false).contains_key("computeResources"));
        assert!(!ce.render(true).contains_key("computeResources"));
    }

    #[test]
    fn test_disabled_state_declared() {
        let ce = environment("state: disabled");
        assert_eq!(ce.state, DesiredState::Disabled);
        assert_eq!(ce.render(false)["state"], json!("DISABLED"));
    }

    #[test]
    fn test_live_accessors() {
        let mut ce = environment("");
        assert!(!ce.exists());
        assert_eq!(ce.status(), None);
        assert_eq!(ce.describe()[1], "(not created)");

        ce.attach(Some(live("crunch-ce")));
        assert!(ce.exists());
        assert_eq!(ce.aws_state(), Some("ENABLED"));
        assert_eq!(ce.status(), Some("VALID"));
        assert!(ce.describe().contains(&"status: VALID".to_string()));
    }
}
