//! Declared AWS Batch resources.
//!
//! Each resource is a record read from the declaration file plus, for the
//! top-level kinds, an optional live snapshot attached on refresh.

mod compute_environment;
mod container;
mod job_definition;
mod queue;

pub use compute_environment::{ComputeEnvironment, ComputeResources};
pub use container::{
    ContainerSpec, EnvironmentVariable, Host, MountPoint, ULimit, Volume, rewrite_command,
};
pub(crate) use container::indent_item;
pub use job_definition::{JobDefinition, RetryStrategy};
pub use queue::{ComputeEnvironmentOrder, Queue};
