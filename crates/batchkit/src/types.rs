//! Core types shared by declarations, live snapshots and the API backend.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Live status strings
// ============================================================================

/// Live `status` values reported for compute environments and queues.
pub mod status {
    pub const CREATING: &str = "CREATING";
    pub const UPDATING: &str = "UPDATING";
    pub const DELETING: &str = "DELETING";
    pub const DELETED: &str = "DELETED";
    pub const VALID: &str = "VALID";
    pub const INVALID: &str = "INVALID";
}

/// Live `state` values reported for compute environments and queues.
pub mod state {
    pub const ENABLED: &str = "ENABLED";
    pub const DISABLED: &str = "DISABLED";
}

// ============================================================================
// Declared enumerations
// ============================================================================

/// Generates a case-insensitive, upper-case-rendering enum for declarations.
macro_rules! declared_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $what:literal { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// The upper-case form sent to AWS.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_uppercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!("unknown {} '{}'", $what, other)),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

declared_enum! {
    /// Whether AWS provisions the instances of a compute environment.
    EnvironmentType, "compute environment type" {
        Managed => "MANAGED",
        Unmanaged => "UNMANAGED",
    }
}

declared_enum! {
    /// Instance purchasing model of managed compute resources.
    ComputeType, "compute resource type" {
        Ec2 => "EC2",
        Spot => "SPOT",
    }
}

declared_enum! {
    /// Desired state of a queue or compute environment.
    DesiredState, "state" {
        Enabled => "ENABLED",
        Disabled => "DISABLED",
    }
}

impl Default for DesiredState {
    fn default() -> Self {
        Self::Enabled
    }
}

declared_enum! {
    /// Lifecycle status of a submitted job.
    JobStatus, "job status" {
        Submitted => "SUBMITTED",
        Pending => "PENDING",
        Runnable => "RUNNABLE",
        Starting => "STARTING",
        Running => "RUNNING",
        Succeeded => "SUCCEEDED",
        Failed => "FAILED",
    }
}

impl JobStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [JobStatus; 7] = [
        JobStatus::Submitted,
        JobStatus::Pending,
        JobStatus::Runnable,
        JobStatus::Starting,
        JobStatus::Running,
        JobStatus::Succeeded,
        JobStatus::Failed,
    ];

    /// Whether a job in this status will never run again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Position in [`JobStatus::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// The three declaration sections, used in lookup errors and messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Queue,
    ComputeEnvironment,
    JobDefinition,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Queue => write!(f, "queue"),
            ResourceKind::ComputeEnvironment => write!(f, "compute environment"),
            ResourceKind::JobDefinition => write!(f, "job definition"),
        }
    }
}

// ============================================================================
// Live snapshots
// ============================================================================

/// A compute environment as reported by `DescribeComputeEnvironments`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveComputeEnvironment {
    pub name: String,
    pub arn: String,
    pub state: Option<String>,
    pub status: Option<String>,
    pub status_reason: Option<String>,
    pub ecs_cluster_arn: Option<String>,
    pub service_role: Option<String>,
}

/// A job queue as reported by `DescribeJobQueues`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveQueue {
    pub name: String,
    pub arn: String,
    pub state: Option<String>,
    pub status: Option<String>,
    pub status_reason: Option<String>,
    pub priority: Option<i32>,
}

/// One registered revision of a job definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDefinitionRevision {
    pub name: String,
    pub arn: String,
    pub revision: i32,
}

/// One page of a paginated API listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    /// A final page.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }
}

/// Arguments of a single `SubmitJob` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSubmission {
    pub job_name: String,
    pub job_queue: String,
    pub job_definition: String,
    pub parameters: IndexMap<String, String>,
}

// ============================================================================
// Outcomes
// ============================================================================

/// Result of a single create/update/disable/destroy/register operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyResult {
    /// Resource was created
    Created,
    /// Resource was updated in place
    Modified,
    /// Resource was switched to DISABLED
    Disabled,
    /// Resource deletion was requested
    Removed,
    /// A new job definition revision was registered
    Registered { arn: String, revision: i32 },
    /// Active job definition revisions were deregistered
    Deregistered { count: usize },
    /// A precondition did not hold; no API call was made
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the operation issued a mutating API call
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::Skipped { .. } | Self::Deregistered { count: 0 })
    }
}

/// Summary of a reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub created: usize,
    pub modified: usize,
    pub disabled: usize,
    pub removed: usize,
    pub registered: usize,
    pub deregistered: usize,
    pub skipped: usize,
}

impl ReconcileSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created
            + self.modified
            + self.disabled
            + self.removed
            + self.registered
            + self.deregistered
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Disabled => self.disabled += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Registered { .. } => self.registered += 1,
            ApplyResult::Deregistered { count } => self.deregistered += count,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}
