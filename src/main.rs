mod cli;
mod commands;
mod progress;
mod ui;

use anyhow::{Context as AnyhowContext, Result};
use batchkit::backend::aws::AwsBatch;
use batchkit::{Declaration, Manager, NoCallback};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub quiet: bool,
    pub filename: String,
    pub import_env: bool,
    pub region: Option<String>,
    pub max_polls: Option<u32>,
}

impl Context {
    /// Path of the declaration file, with `~` expanded
    pub fn declaration_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.filename).as_ref())
    }

    /// Load the declaration and connect it to AWS Batch
    pub fn manager(&self) -> Result<Manager> {
        let path = self.declaration_path();
        let declaration = Declaration::from_path(&path, self.import_env)?;
        log::info!("Loaded declaration from {}", path.display());

        let api = AwsBatch::new(self.region.clone()).context("Failed to set up AWS Batch client")?;

        let pb = (!self.quiet).then(|| progress::spinner("Reading live state..."));
        let manager = Manager::new(declaration, Box::new(api));
        if let Some(pb) = pb {
            progress::finish_clear(&pb);
        }
        let mut manager = manager?;

        if let Some(max_polls) = self.max_polls {
            manager = manager.with_max_polls(max_polls);
        }
        if self.quiet {
            manager = manager.with_callback(Box::new(NoCallback));
        } else {
            manager = manager.with_callback(Box::new(progress::PollSpinner::new()));
        }
        Ok(manager)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        quiet: cli.quiet,
        filename: cli.filename,
        import_env: cli.import_env,
        region: cli.region,
        max_polls: cli.max_polls,
    };

    match cli.command {
        Command::Info => commands::info::run(&ctx),
        Command::Queue(cmd) => commands::lifecycle::queue(&ctx, cmd),
        Command::Compute(cmd) => commands::lifecycle::compute(&ctx, cmd),
        Command::Job(cmd) => commands::job::run(&ctx, cmd),
        Command::Assemble => commands::reconcile::assemble(&ctx),
        Command::Teardown { yes } => commands::reconcile::teardown(&ctx, yes),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "beagle", &mut io::stdout());
            Ok(())
        }
    }
}
