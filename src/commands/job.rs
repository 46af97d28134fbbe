//! `beagle job` - submit and watch jobs, manage job definitions.

use anyhow::{Context as AnyhowContext, Result};
use batchkit::{Manager, NoCallback, RegisterPolicy};
use std::fs::File;
use std::path::Path;

use crate::Context;
use crate::cli::JobCommand;
use crate::ui;

pub fn run(ctx: &Context, cmd: JobCommand) -> Result<()> {
    // Job watches print the table on every check instead of a spinner
    let mut manager = ctx.manager()?.with_callback(Box::new(NoCallback));

    match cmd {
        JobCommand::Submit {
            name,
            job_definition,
            queue,
            parameters,
            nowait,
            register,
        } => {
            let policy = if register {
                RegisterPolicy::Always
            } else {
                RegisterPolicy::IfMissing
            };
            submit(
                &mut manager,
                &name,
                &job_definition,
                &queue,
                parameters.as_deref(),
                policy,
            )?;
            watch(&manager, &queue, nowait)
        }
        JobCommand::List { queue } => {
            let (table, runnable) = manager.list_jobs(&queue)?;
            for line in table {
                println!("{line}");
            }
            ui::kv("runnable", &runnable.to_string());
            Ok(())
        }
        JobCommand::Cancel { queue, nowait } => {
            let count = manager.cancel_all_jobs(&queue)?;
            ui::success(&format!("Cancelled {count} job(s) in {queue}"));
            watch(&manager, &queue, nowait)
        }
        JobCommand::Terminate { queue, nowait } => {
            let count = manager.terminate_all_jobs(&queue)?;
            ui::success(&format!("Terminated {count} job(s) in {queue}"));
            watch(&manager, &queue, nowait)
        }
        JobCommand::Create { job_definition } => {
            let result = manager.create_job_definition(&job_definition)?;
            ui::report(&format!("job definition {job_definition}"), &result);
            Ok(())
        }
        JobCommand::Update { job_definition } => {
            let result = manager.update_job_definition(&job_definition)?;
            ui::report(&format!("job definition {job_definition}"), &result);
            Ok(())
        }
        JobCommand::Deregister { job_definition } => {
            let result = manager.deregister_job_definition(&job_definition)?;
            ui::report(&format!("job definition {job_definition}"), &result);
            Ok(())
        }
    }
}

fn submit(
    manager: &mut Manager,
    name: &str,
    definition: &str,
    queue: &str,
    parameters: Option<&Path>,
    policy: RegisterPolicy,
) -> Result<()> {
    match parameters {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open parameter file {}", path.display()))?;
            let ids = manager.submit_jobs(name, definition, queue, file, policy)?;
            ui::success(&format!("Submitted {} job(s) to {queue}", ids.len()));
            for id in &ids {
                ui::dim(id);
            }
        }
        None => {
            let id = manager.submit_job(name, definition, queue, Default::default(), policy)?;
            ui::success(&format!("Submitted job {name} to {queue}"));
            ui::dim(&id);
        }
    }
    Ok(())
}

/// Print the queue's status table, then keep printing it until no job is
/// runnable unless `nowait` is set.
fn watch(manager: &Manager, queue: &str, nowait: bool) -> Result<()> {
    let counts = manager.get_jobs(queue)?.counts;
    ui::job_table(&counts);
    if nowait || counts.runnable() == 0 {
        return Ok(());
    }

    manager.wait_for_jobs(queue, |counts| {
        println!();
        ui::job_table(counts);
    })?;
    let total = manager.get_jobs(queue)?.counts.total();
    ui::success(&format!("No runnable jobs left in {queue} ({total} listed)"));
    Ok(())
}
