//! `beagle assemble` and `beagle teardown`.

use anyhow::Result;
use dialoguer::Confirm;

use crate::Context;
use crate::ui;

pub fn assemble(ctx: &Context) -> Result<()> {
    let mut manager = ctx.manager()?;

    ui::header("Assembling");
    let summary = manager.assemble()?;

    ui::summary(&summary);
    if summary.total_changes() > 0 {
        ui::success("Deployment assembled");
    }
    Ok(())
}

pub fn teardown(ctx: &Context, yes: bool) -> Result<()> {
    let mut manager = ctx.manager()?;

    ui::header("Tearing down");
    for line in manager.describe() {
        println!("{line}");
    }
    println!();

    if !yes && !confirm_teardown()? {
        ui::info("Teardown cancelled");
        return Ok(());
    }

    let summary = manager.teardown()?;

    ui::summary(&summary);
    ui::success("Deployment torn down");
    Ok(())
}

/// Ask before removing anything
fn confirm_teardown() -> Result<bool> {
    let confirmed = Confirm::new()
        .with_prompt("Terminate all jobs and remove every resource above?")
        .default(false)
        .interact()?;

    Ok(confirmed)
}
