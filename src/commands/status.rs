use anyhow::Result;
use colored::Colorize;

use crate::Context;
use crate::paths;
use crate::state::{FileStateStore, StateStore, WorkflowState};
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let path = paths::state_file(ctx.state_file.as_deref())?;
    let store = FileStateStore::new(&path);

    ui::header("Checkpoint");
    ui::kv("File", &path.display().to_string());

    let Some(checkpoint) = store.load()? else {
        println!();
        ui::info("No checkpoint; the next run starts fresh");
        return Ok(());
    };

    let step = match checkpoint.step {
        WorkflowState::None => "(between steps)".dimmed().to_string(),
        WorkflowState::At(step) => step.name().yellow().to_string(),
        WorkflowState::Done => checkpoint.step.to_string().green().to_string(),
    };

    ui::kv("Action", checkpoint.action.as_str());
    ui::kv("Step", &step);
    ui::kv(
        "Updated",
        &checkpoint
            .last_updated
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string(),
    );

    if let Some(position) = checkpoint
        .step
        .step()
        .and_then(|s| checkpoint.action.position(s))
    {
        ui::kv(
            "Progress",
            &format!(
                "{}/{} steps",
                position + 1,
                checkpoint.action.steps().len()
            ),
        );
    }

    println!();
    ui::dim(&format!(
        "Continue with: cmscale {} --resume",
        checkpoint.action
    ));
    Ok(())
}
