//! `beagle info` - declared resources alongside their live state.

use anyhow::Result;

use crate::Context;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let manager = ctx.manager()?;

    ui::header(&format!("batchbeagle: {}", ctx.declaration_path().display()));
    for line in manager.describe() {
        match line.strip_suffix(':') {
            Some(title) if !line.starts_with(' ') => ui::section(title),
            _ => println!("{line}"),
        }
    }
    Ok(())
}
