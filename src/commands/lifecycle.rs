//! `beagle queue` and `beagle compute` - single resource lifecycle.

use anyhow::Result;
use batchkit::{ApplyResult, Manager};

use crate::Context;
use crate::cli::LifecycleCommand;
use crate::ui;

/// Operations shared by queues and compute environments
trait Lifecycle {
    const KIND: &'static str;

    fn create(manager: &Manager, name: &str) -> batchkit::Result<ApplyResult>;
    fn update(manager: &Manager, name: &str) -> batchkit::Result<ApplyResult>;
    fn disable(manager: &Manager, name: &str) -> batchkit::Result<ApplyResult>;
    fn wait_disabled(manager: &Manager, name: &str) -> batchkit::Result<u32>;
    fn destroy(manager: &Manager, name: &str) -> batchkit::Result<ApplyResult>;
}

struct Queues;

impl Lifecycle for Queues {
    const KIND: &'static str = "queue";

    fn create(manager: &Manager, name: &str) -> batchkit::Result<ApplyResult> {
        manager.create_queue(name)
    }

    fn update(manager: &Manager, name: &str) -> batchkit::Result<ApplyResult> {
        manager.update_queue(name)
    }

    fn disable(manager: &Manager, name: &str) -> batchkit::Result<ApplyResult> {
        manager.disable_queue(name)
    }

    fn wait_disabled(manager: &Manager, name: &str) -> batchkit::Result<u32> {
        manager.wait_queues_disabled(&[name.to_string()])
    }

    fn destroy(manager: &Manager, name: &str) -> batchkit::Result<ApplyResult> {
        manager.destroy_queue(name)
    }
}

struct ComputeEnvironments;

impl Lifecycle for ComputeEnvironments {
    const KIND: &'static str = "compute environment";

    fn create(manager: &Manager, name: &str) -> batchkit::Result<ApplyResult> {
        manager.create_compute_environment(name)
    }

    fn update(manager: &Manager, name: &str) -> batchkit::Result<ApplyResult> {
        manager.update_compute_environment(name)
    }

    fn disable(manager: &Manager, name: &str) -> batchkit::Result<ApplyResult> {
        manager.disable_compute_environment(name)
    }

    fn wait_disabled(manager: &Manager, name: &str) -> batchkit::Result<u32> {
        manager.wait_compute_environments_disabled(&[name.to_string()])
    }

    fn destroy(manager: &Manager, name: &str) -> batchkit::Result<ApplyResult> {
        manager.destroy_compute_environment(name)
    }
}

pub fn queue(ctx: &Context, cmd: LifecycleCommand) -> Result<()> {
    run::<Queues>(ctx, cmd)
}

pub fn compute(ctx: &Context, cmd: LifecycleCommand) -> Result<()> {
    run::<ComputeEnvironments>(ctx, cmd)
}

fn run<L: Lifecycle>(ctx: &Context, cmd: LifecycleCommand) -> Result<()> {
    let mut manager = ctx.manager()?;

    match cmd {
        LifecycleCommand::Create { name } => {
            let result = L::create(&manager, &name)?;
            ui::report(&subject::<L>(&name), &result);
        }
        LifecycleCommand::Update { name } => {
            let result = L::update(&manager, &name)?;
            ui::report(&subject::<L>(&name), &result);
        }
        LifecycleCommand::Disable { name } => {
            let result = L::disable(&manager, &name)?;
            ui::report(&subject::<L>(&name), &result);
        }
        LifecycleCommand::Destroy { name } => destroy::<L>(&mut manager, &name)?,
    }
    Ok(())
}

/// Disable, wait for DISABLED, refresh, then delete.
fn destroy<L: Lifecycle>(manager: &mut Manager, name: &str) -> Result<()> {
    let subject = subject::<L>(name);

    let disabled = L::disable(manager, name)?;
    ui::report(&subject, &disabled);
    if !matches!(disabled, ApplyResult::Disabled) {
        return Ok(());
    }

    L::wait_disabled(manager, name)?;
    manager.refresh()?;

    let result = L::destroy(manager, name)?;
    ui::report(&subject, &result);
    Ok(())
}

fn subject<L: Lifecycle>(name: &str) -> String {
    format!("{} {name}", L::KIND)
}
