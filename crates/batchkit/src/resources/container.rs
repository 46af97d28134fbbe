//! Container properties of a job definition.

use serde::Deserialize;

use crate::render::{Fields, Render, render_all};

/// Host path backing a volume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Host {
    #[serde(rename = "sourcePath", default)]
    pub source_path: Option<String>,
}

/// A data volume available to the container.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Volume {
    pub name: String,
    #[serde(default)]
    pub host: Option<Host>,
}

impl Render for Volume {
    fn fields(&self, _for_update: bool) -> Fields {
        let mut f = Fields::new();
        f.field("name", self.name.as_str());
        if let Some(host) = &self.host {
            let mut h = Fields::new();
            h.field("sourcePath", host.source_path.as_deref());
            f.field("host", h.into_payloads().0);
        }
        f
    }
}

impl Volume {
    pub fn describe(&self) -> Vec<String> {
        let mut lines = vec![format!("name: {}", self.name)];
        if let Some(path) = self.host.as_ref().and_then(|h| h.source_path.as_deref()) {
            lines.push(format!("host: {path}"));
        }
        lines
    }
}

/// Where a volume is mounted inside the container.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MountPoint {
    #[serde(rename = "containerPath")]
    pub container_path: String,
    #[serde(rename = "readOnly", default)]
    pub read_only: bool,
    #[serde(rename = "sourceVolume")]
    pub source_volume: String,
}

impl Render for MountPoint {
    fn fields(&self, _for_update: bool) -> Fields {
        let mut f = Fields::new();
        f.field("containerPath", self.container_path.as_str())
            .field("readOnly", self.read_only)
            .field("sourceVolume", self.source_volume.as_str());
        f
    }
}

impl MountPoint {
    pub fn describe(&self) -> Vec<String> {
        vec![
            format!("containerPath: {}", self.container_path),
            format!("readOnly: {}", self.read_only),
            format!("sourceVolume: {}", self.source_volume),
        ]
    }
}

/// A resource limit applied to the container.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ULimit {
    pub name: String,
    #[serde(rename = "hardLimit")]
    pub hard_limit: i32,
    #[serde(rename = "softLimit")]
    pub soft_limit: i32,
}

impl Render for ULimit {
    fn fields(&self, _for_update: bool) -> Fields {
        let mut f = Fields::new();
        f.field("name", self.name.as_str())
            .field("hardLimit", self.hard_limit)
            .field("softLimit", self.soft_limit);
        f
    }
}

impl ULimit {
    pub fn describe(&self) -> Vec<String> {
        vec![
            format!("name: {}", self.name),
            format!("hardLimit: {}", self.hard_limit),
            format!("softLimit: {}", self.soft_limit),
        ]
    }
}

/// An environment variable passed to the container.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EnvironmentVariable {
    pub name: String,
    pub value: String,
}

impl Render for EnvironmentVariable {
    fn fields(&self, _for_update: bool) -> Fields {
        let mut f = Fields::new();
        f.field("name", self.name.as_str())
            .field("value", self.value.as_str());
        f
    }
}

/// The `container` section of a job definition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContainerSpec {
    pub image: String,
    pub memory: i32,
    pub vcpus: i32,
    #[serde(default)]
    pub command: String,
    #[serde(rename = "jobRoleArn", default)]
    pub job_role_arn: Option<String>,
    #[serde(rename = "readonlyRootFilesystem", default)]
    pub readonly_root_filesystem: Option<bool>,
    #[serde(default)]
    pub privileged: Option<bool>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub volumes: Vec<Volume>,
    #[serde(default)]
    pub environment: Vec<EnvironmentVariable>,
    #[serde(rename = "mountPoints", default)]
    pub mount_points: Vec<MountPoint>,
    #[serde(default)]
    pub ulimits: Vec<ULimit>,
}

impl Render for ContainerSpec {
    fn fields(&self, for_update: bool) -> Fields {
        let mut f = Fields::new();
        f.field("image", self.image.as_str())
            .field("memory", self.memory)
            .field("vcpus", self.vcpus)
            .field("command", rewrite_command(&self.command))
            .field("jobRoleArn", self.job_role_arn.as_deref())
            .field("readonlyRootFilesystem", self.readonly_root_filesystem)
            .field("privileged", self.privileged)
            .field("user", self.user.as_deref())
            .field("volumes", render_all(&self.volumes, for_update))
            .field("environment", render_all(&self.environment, for_update))
            .field("mountPoints", render_all(&self.mount_points, for_update))
            .field("ulimits", render_all(&self.ulimits, for_update));
        f
    }
}

impl ContainerSpec {
    pub fn describe(&self) -> Vec<String> {
        let mut lines = vec![
            format!("image: {}", self.image),
            format!("memory: {}", self.memory),
            format!("vcpus: {}", self.vcpus),
            format!("command: {}", self.command),
        ];
        if let Some(arn) = &self.job_role_arn {
            lines.push(format!("jobRoleArn: {arn}"));
        }
        if let Some(readonly) = self.readonly_root_filesystem {
            lines.push(format!("readonlyRootFilesystem: {readonly}"));
        }
        if let Some(privileged) = self.privileged {
            lines.push(format!("privileged: {privileged}"));
        }
        if let Some(user) = &self.user {
            lines.push(format!("user: {user}"));
        }

        list_section(&mut lines, "Volumes:", self.volumes.iter().map(Volume::describe));
        list_section(
            &mut lines,
            "Environment:",
            self.environment
                .iter()
                .map(|e| vec![format!("name: {}", e.name), format!("value: {}", e.value)]),
        );
        list_section(
            &mut lines,
            "Mount Points:",
            self.mount_points.iter().map(MountPoint::describe),
        );
        list_section(&mut lines, "ULimits:", self.ulimits.iter().map(ULimit::describe));
        lines
    }
}

/// Append `title` followed by each item as a YAML-ish list entry.
pub(crate) fn list_section<I>(lines: &mut Vec<String>, title: &str, items: I)
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut items = items.into_iter().peekable();
    if items.peek().is_none() {
        return;
    }
    lines.push(title.to_string());
    for item in items {
        lines.extend(indent_item(&item));
    }
}

/// Indent a description as a list item: `  - first`, `    rest`.
pub(crate) fn indent_item(item: &[String]) -> Vec<String> {
    item.iter()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                format!("  - {line}")
            } else {
                format!("    {line}")
            }
        })
        .collect()
}

/// Split a command line and rewrite `${name}` tokens into `Ref::name`
/// parameter references.
pub fn rewrite_command(command: &str) -> Vec<String> {
    command
        .split_whitespace()
        .map(|token| match token.strip_prefix("${") {
            Some(rest) => format!("Ref::{}", rest.strip_suffix('}').unwrap_or(rest)),
            None => token.to_string(),
        })
        .collect()
}
