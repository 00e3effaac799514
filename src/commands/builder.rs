use clap::{ArgAction, Args};
use oracle_village::{ActionReport, ResourcePool, Simulation};
use serde::Serialize;

use super::print_json;

#[derive(Args)]
pub struct BuilderArgs {
    /// Builder id (defaults to builder_<n>)
    #[arg(long)]
    id: Option<String>,
    /// Number of decided steps to run after any manual actions
    #[arg(short = 's', long, default_value_t = 0)]
    steps: usize,
    /// Ask the oracle for a strategic directive before every step
    #[arg(long, action = ArgAction::SetTrue, default_value_t = false)]
    oracle: bool,
    /// Manual action (repeatable): TALK "msg" | WALK x,y | CUT x,y,tree_id | BUILD type,x,y
    #[arg(short = 'a', long = "action", value_name = "ACTION")]
    actions: Vec<String>,
    /// Wood handed to the builder before acting
    #[arg(long, default_value_t = 0)]
    give_wood: u32,
    /// Stone handed to the builder before acting
    #[arg(long, default_value_t = 0)]
    give_stone: u32,
    /// Food handed to the builder before acting
    #[arg(long, default_value_t = 0)]
    give_food: u32,
    /// Free-text task shown to the decision provider
    #[arg(long)]
    task: Option<String>,
    /// Print reports and final state as JSON
    #[arg(long, action = ArgAction::SetTrue, default_value_t = false)]
    json: bool,
}

#[derive(Serialize)]
struct BuilderRun<'a> {
    reports: &'a [ActionReport],
    state: oracle_village::BuilderStateView,
    village_resources: ResourcePool,
}

pub(super) fn run_builder(args: BuilderArgs, sim: &mut Simulation) -> Result<(), String> {
    let spawned = sim.create_builder(args.id).map_err(|e| e.to_string())?;
    let id = spawned.agent_id;
    if !args.json {
        println!("Spawned {} at {}", id, spawned.position);
    }

    let gift = ResourcePool::new(args.give_wood, args.give_stone, args.give_food);
    if gift != ResourcePool::default() {
        sim.give(&id, &gift).map_err(|e| e.to_string())?;
    }
    if let Some(task) = &args.task {
        sim.set_task(&id, task).map_err(|e| e.to_string())?;
    }

    let mut reports = Vec::new();
    for action in &args.actions {
        reports.push(sim.builder_execute(&id, action).map_err(|e| e.to_string())?);
    }
    if args.steps > 0 {
        reports.extend(
            sim.builder_simulate(&id, args.steps, args.oracle)
                .map_err(|e| e.to_string())?,
        );
    }

    let builder = sim.builder(&id).map_err(|e| e.to_string())?;
    let state = builder.state();

    if args.json {
        return print_json(&BuilderRun {
            reports: &reports,
            state,
            village_resources: *sim.resources(),
        });
    }

    for (i, report) in reports.iter().enumerate() {
        let action = report.action_string.as_deref().unwrap_or("-");
        println!("step {:>2}: {} => {}", i + 1, action, report);
    }
    println!(
        "{} at {} | inventory {} | task {} | actions {}",
        state.agent_id,
        state.position,
        state.inventory,
        state.current_task.as_deref().unwrap_or("-"),
        state.action_count
    );
    println!("village resources: {}", sim.resources());
    Ok(())
}
