use anyhow::{Context as AnyhowContext, Result};
use dialoguer::Confirm;

use crate::Context;
use crate::paths;
use crate::state::{FileStateStore, StateStore};
use crate::ui;

pub fn run(ctx: &Context, yes: bool) -> Result<()> {
    let path = paths::state_file(ctx.state_file.as_deref())?;
    let mut store = FileStateStore::new(&path);

    let Some(checkpoint) = store.load()? else {
        ui::info("No checkpoint to remove");
        return Ok(());
    };

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Discard {} checkpoint at '{}'?",
                checkpoint.action, checkpoint.step
            ))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !confirmed {
            ui::warn("Aborted");
            return Ok(());
        }
    }

    store.clear()?;
    ui::success(&format!("Removed {}", path.display()));
    Ok(())
}
