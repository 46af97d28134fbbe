//! # batchkit
//!
//! Declarative AWS Batch deployments in pure Rust.
//!
//! This crate provides functionality for:
//! - Loading compute environments, job queues and job definitions from YAML
//! - Rendering them into exact create and update request payloads
//! - Reconciling live AWS Batch state with the declaration
//! - Submitting jobs, optionally from a CSV parameter table, and watching queues
//!
//! ## Example
//!
//! ```no_run
//! use batchkit::{Declaration, Manager, backend::aws::AwsBatch};
//! use std::path::Path;
//!
//! let declaration = Declaration::from_path(Path::new("batchbeagle.yml"), false)?;
//! let api = AwsBatch::new(Some("us-west-2".to_string()))?;
//! let mut manager = Manager::new(declaration, Box::new(api))?;
//!
//! let summary = manager.assemble()?;
//! println!("{} changes", summary.total_changes());
//!
//! let (table, runnable) = manager.list_jobs("beagle-queue")?;
//! for line in table {
//!     println!("{line}");
//! }
//! println!("{runnable} jobs still runnable");
//! # Ok::<(), batchkit::Error>(())
//! ```
//!
//! ## Polling
//!
//! AWS Batch applies changes asynchronously. Every wait is a fixed-interval
//! poll bounded by a maximum number of checks; see [`PollConfig`].

#![warn(clippy::all)]

pub mod backend;
pub mod declaration;
pub mod error;
pub mod jobs;
pub mod manager;
pub mod poll;
mod reconcile;
pub mod render;
pub mod resources;
pub mod types;

pub use declaration::Declaration;
pub use error::{Error, Result};
pub use jobs::{JobListing, RegisterPolicy, StatusCounts};
pub use manager::Manager;
pub use poll::{NoCallback, PollCallback, PollConfig};
pub use render::{Payload, Render};
pub use types::{ApplyResult, JobStatus, ReconcileSummary, ResourceKind};
