use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "beagle")]
#[command(author = "Caltech IMSS ADS")]
#[command(version)]
#[command(about = "Declarative AWS Batch deployments", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Declaration file
    #[arg(
        short,
        long,
        env = "BATCHBEAGLE_FILE",
        default_value = "batchbeagle.yml",
        global = true
    )]
    pub filename: String,

    /// Resolve ${env.NAME} tokens in the declaration file
    #[arg(long, env = "BATCHBEAGLE_IMPORT_ENV", global = true)]
    pub import_env: bool,

    /// AWS region (defaults to the environment or profile)
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Maximum number of checks of every wait
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_polls: Option<u32>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Describe every declared resource and its live state
    Info,

    /// Manage job queues
    #[command(subcommand)]
    Queue(LifecycleCommand),

    /// Manage compute environments
    #[command(subcommand)]
    Compute(LifecycleCommand),

    /// Submit, watch and stop jobs; manage job definitions
    #[command(subcommand)]
    Job(JobCommand),

    /// Create or update everything declared
    Assemble,

    /// Remove everything declared
    Teardown {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Queues and compute environments
// ============================================================================

#[derive(Subcommand)]
pub enum LifecycleCommand {
    /// Create the resource if it does not exist
    Create {
        /// Name as declared in the configuration file
        name: String,
    },

    /// Update the resource in place
    Update {
        /// Name as declared in the configuration file
        name: String,
    },

    /// Set the resource's state to DISABLED
    Disable {
        /// Name as declared in the configuration file
        name: String,
    },

    /// Disable the resource, wait for it, then delete it
    Destroy {
        /// Name as declared in the configuration file
        name: String,
    },
}

// ============================================================================
// Jobs
// ============================================================================

#[derive(Subcommand)]
pub enum JobCommand {
    /// Submit a job, or one job per row of a CSV parameter file
    Submit {
        /// Job name
        name: String,

        /// Job definition, as declared
        job_definition: String,

        /// Job queue
        queue: String,

        /// CSV file whose header names the parameters
        #[arg(short, long)]
        parameters: Option<PathBuf>,

        /// Return after submitting instead of watching the queue
        #[arg(long)]
        nowait: bool,

        /// Register a fresh job definition revision first
        #[arg(long)]
        register: bool,
    },

    /// Show job counts per status
    List {
        /// Job queue
        queue: String,
    },

    /// Cancel every job in a queue
    Cancel {
        /// Job queue
        queue: String,

        /// Return without watching the queue drain
        #[arg(long)]
        nowait: bool,
    },

    /// Terminate every job in a queue
    Terminate {
        /// Job queue
        queue: String,

        /// Return without watching the queue drain
        #[arg(long)]
        nowait: bool,
    },

    /// Register a job definition
    Create {
        /// Job definition, as declared
        job_definition: String,
    },

    /// Register a new revision of a job definition
    Update {
        /// Job definition, as declared
        job_definition: String,
    },

    /// Deregister every active revision of a job definition
    Deregister {
        /// Job definition, as declared
        job_definition: String,
    },
}
