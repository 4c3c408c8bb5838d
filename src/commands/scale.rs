use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;

use crate::Context;
use crate::cli::ScaleArgs;
use crate::config::Config;
use crate::controller::{self, ExecutionMode, Operation, Outcome, Plan};
use crate::engine::{ClusterSteps, OperationKind};
use crate::error::WorkflowError;
use crate::hosts::HostSet;
use crate::paths;
use crate::progress::{PollSpinner, StepProgress};
use crate::state::FileStateStore;
use crate::ui;
use cmclient::transport::http::HttpTransport;
use cmclient::transport::{SimulatedTransport, Transport};
use cmclient::{ApiGateway, CommandPoller, PollConfig};

const HOSTS_SHOWN: usize = 5;

pub fn run(ctx: &Context, kind: OperationKind, args: &ScaleArgs) -> Result<()> {
    let config_path = paths::config_file(ctx.config.as_deref())?;
    let config = Config::load(&config_path)?;

    let hosts_path = paths::hosts_file(ctx.hosts.as_deref())?;
    let hosts = HostSet::load(&hosts_path)?;

    let settings = match args.mode {
        ExecutionMode::Plan => config.plan_settings(kind)?,
        ExecutionMode::Run | ExecutionMode::DryRun => {
            config.cluster_settings(kind, args.auth_mode)?
        }
    };
    let endpoint = config.endpoint()?;

    let transport: Box<dyn Transport> = match args.mode {
        ExecutionMode::Run => Box::new(HttpTransport::new(&config.credentials()?)),
        ExecutionMode::DryRun | ExecutionMode::Plan if ctx.quiet => {
            Box::new(SimulatedTransport::new())
        }
        ExecutionMode::DryRun | ExecutionMode::Plan => {
            Box::new(SimulatedTransport::with_observer(ui::simulated_request))
        }
    };
    let gateway = ApiGateway::new(endpoint, transport);
    let poller = CommandPoller::with_callback(
        PollConfig::default(),
        Box::new(PollSpinner::new(ctx.quiet || args.mode != ExecutionMode::Run)),
    );

    let op = Operation {
        kind,
        mode: args.mode,
        resume: args.resume,
        hosts,
    };
    let runner = ClusterSteps::new(&gateway, &poller, &settings, &op.hosts);

    let state_path = paths::state_file(ctx.state_file.as_deref())?;
    let mut store = FileStateStore::new(&state_path);
    let mut progress = StepProgress::new(ctx.quiet);

    if !ctx.quiet {
        ui::header(&format!("cmscale {}", kind));
        ui::kv("Control plane", &gateway.endpoint().base_url());
        ui::kv("Cluster", &settings.cluster);
        ui::kv(
            "Hosts",
            &format!(
                "{} ({})",
                op.hosts.len(),
                ui::host_summary(op.hosts.names(), HOSTS_SHOWN)
            ),
        );
        ui::kv("Mode", &format!("{:?}", op.mode));
        ui::kv("Checkpoint", &state_path.display().to_string());
        println!();
    }

    match controller::execute(&op, &mut store, &runner, &mut progress) {
        Ok(Outcome::Planned(plan)) => {
            show_plan(&plan);
            Ok(())
        }
        Ok(Outcome::Completed { from, simulated }) => {
            println!();
            if simulated {
                ui::success(&format!("{} simulated; no changes made", kind));
            } else {
                ui::success(&format!("{} of {} hosts complete", kind, op.hosts.len()));
            }
            if from.step().is_some() {
                ui::dim(&format!("resumed at {}", from));
            }
            Ok(())
        }
        Err(err) => {
            if let Some(failure) = err.downcast_ref::<WorkflowError>()
                && op.mode == ExecutionMode::Run
            {
                println!();
                ui::warn(&format!(
                    "Progress saved at {}. Re-run with {} to continue.",
                    failure.step.to_string().bold(),
                    format!("cmscale {} --resume", kind).cyan()
                ));
            }
            Err(err).with_context(|| format!("{} failed", kind))
        }
    }
}

fn show_plan(plan: &Plan) {
    ui::header(&format!("Plan: {}", plan.kind));

    ui::info(&format!("{} hosts", plan.hosts.len()));
    for host in &plan.hosts {
        println!("  {} {}", "•".cyan(), host);
    }

    println!();
    if plan.steps.is_empty() {
        ui::info("Nothing left to run; the checkpoint would only be cleared");
        return;
    }
    for (index, step) in plan.steps.iter().enumerate() {
        ui::step(index + 1, plan.steps.len(), step.description());
    }
    println!();
    ui::dim("Plan only: no calls were made");
}
