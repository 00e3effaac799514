use std::str::FromStr;

use clap::{ArgAction, Args};
use oracle_village::{CycleReport, Job, Simulation};

use super::{PoolArg, print_json};

#[derive(Args)]
pub struct VillageArgs {
    /// Number of oracle cycles (days) to run, 1-100
    #[arg(long, default_value_t = 1)]
    days: u32,
    /// Print the cycle reports as JSON
    #[arg(long, action = ArgAction::SetTrue, default_value_t = false)]
    json: bool,
    /// Credit the shared pool before running: wood,stone,food
    #[arg(long, value_name = "wood,stone,food")]
    credit: Option<PoolArg>,
    /// Add a villager before running (repeatable): name:job[:tier]
    #[arg(long = "add", value_name = "NAME:JOB[:TIER]")]
    add: Vec<VillagerArg>,
    /// Remove a villager before running (repeatable)
    #[arg(long = "remove", value_name = "NAME")]
    remove: Vec<String>,
    /// Force a job and tier, ignoring the job path (repeatable): name:job:tier
    #[arg(long = "promote", value_name = "NAME:JOB:TIER")]
    promote: Vec<VillagerArg>,
}

#[derive(Clone, Debug)]
pub struct VillagerArg {
    name: String,
    job: Job,
    tier: Option<u8>,
}

impl FromStr for VillagerArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<_> = s.trim().split(':').map(str::trim).collect();
        if !(2..=3).contains(&parts.len()) || parts[0].is_empty() {
            return Err("Villager must be formatted as name:job[:tier]".into());
        }
        let job = parts[1].parse::<Job>().map_err(|e| e.to_string())?;
        let tier = match parts.get(2) {
            Some(t) => Some(t.parse::<u8>().map_err(|_| format!("tier '{}' must be 1-3", t))?),
            None => None,
        };
        Ok(VillagerArg {
            name: parts[0].to_string(),
            job,
            tier,
        })
    }
}

pub(super) fn run_village(args: VillageArgs, sim: &mut Simulation) -> Result<(), String> {
    if let Some(PoolArg(pool)) = args.credit {
        sim.add_resources(&pool);
    }
    for v in &args.add {
        sim.village_mut()
            .add_villager(&v.name, v.job, v.tier.unwrap_or(v.job.tier()))
            .map_err(|e| e.to_string())?;
    }
    for name in &args.remove {
        sim.village_mut().remove_villager(name).map_err(|e| e.to_string())?;
    }
    for v in &args.promote {
        let tier = v.tier.unwrap_or(v.job.tier());
        let event = sim
            .village_mut()
            .promote_villager(&v.name, v.job, tier)
            .map_err(|e| e.to_string())?;
        if !args.json {
            println!("{}", event);
        }
    }

    let reports = sim.simulate_days(args.days).map_err(|e| e.to_string())?;

    if args.json {
        return print_json(&reports);
    }
    for report in &reports {
        print_cycle(report);
    }
    println!();
    print!("{}", sim.summary());
    print_action_summary(sim);
    Ok(())
}

fn print_cycle(report: &CycleReport) {
    println!("=== Day {} ({}) ===", report.day.day, report.provider);
    for event in &report.directives.events {
        println!("  {}", event);
    }
    for rejection in &report.directives.rejections {
        println!("  ! directive for {}: {}", rejection.name, rejection.error);
    }
    for event in &report.day.events {
        println!("  {}", event);
    }
    for rejection in &report.day.rejections {
        println!("  ! {}: {}", rejection.name, rejection.error);
    }
    println!(
        "  resources: {} | buildings: {}",
        report.day.resources, report.day.buildings
    );
}

fn print_action_summary(sim: &Simulation) {
    println!("Action summary:");
    for villager in sim.village().villagers() {
        match sim.village().stats().get(&villager.name) {
            Some(stats) => println!(
                "  {} -> total={} gather={} build={} rest={} idle={} rejected={}",
                villager.name,
                stats.total(),
                stats.gather_count,
                stats.build_count,
                stats.rest_count,
                stats.idle_count,
                stats.rejected_count
            ),
            None => println!("  {} -> no actions", villager.name),
        }
    }
}
