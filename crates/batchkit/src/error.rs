//! Error types for AWS Batch deployment operations.
//!
//! Precondition failures (updating a queue that does not exist, destroying
//! an environment that is still enabled) are not errors: they surface as
//! [`ApplyResult::Skipped`](crate::ApplyResult::Skipped). Everything here
//! terminates the current command.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::ResourceKind;

/// Errors that can occur while loading declarations or talking to AWS Batch.
#[derive(Debug, Error)]
pub enum Error {
    /// A name was referenced that the declaration file does not contain
    #[error("{kind} not declared in configuration: {name}")]
    UnknownResource {
        /// Which section was searched
        kind: ResourceKind,
        /// The name that was looked up
        name: String,
    },

    /// A call to the AWS Batch API failed
    #[error("AWS Batch {operation} failed: {message}")]
    Api {
        /// API operation name, e.g. `CreateJobQueue`
        operation: &'static str,
        /// Error message including the service error context
        message: String,
    },

    /// A poll loop ran out of attempts before its condition held
    #[error("timed out waiting for {what} after {attempts} attempts")]
    PollTimeout {
        /// Description of the awaited condition
        what: String,
        /// Number of checks performed
        attempts: u32,
    },

    /// A rendered payload could not be turned into an API request
    #[error("invalid {operation} payload: {message}")]
    Payload {
        /// API operation the payload was meant for
        operation: &'static str,
        /// What was missing or malformed
        message: String,
    },

    /// Declaration file not found
    #[error("configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    /// The declaration parsed but is not usable
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Parameter table error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an [`Error::Api`] from any SDK error, keeping the full cause chain.
    pub fn api<E>(operation: &'static str, err: E) -> Self
    where
        E: std::error::Error,
    {
        Error::Api {
            operation,
            message: aws_sdk_batch::error::DisplayErrorContext(err).to_string(),
        }
    }

    /// Build an [`Error::Payload`].
    pub fn payload(operation: &'static str, message: impl Into<String>) -> Self {
        Error::Payload {
            operation,
            message: message.into(),
        }
    }
}

/// Result type for batchkit operations.
pub type Result<T> = std::result::Result<T, Error>;
