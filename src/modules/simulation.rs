use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::modules::builder::{ActionReport, Builder};
use crate::modules::config::{BrainMode, ProviderConfig, SimConfig};
use crate::modules::error::SimError;
use crate::modules::grid::{GridPos, GridWorld};
use crate::modules::llm::{LlmClient, LlmProvider};
use crate::modules::oracle::{DecisionPayload, DecisionProvider, RemoteProvider, RuleProvider};
use crate::modules::resource::{Amount, ResourcePool};
use crate::modules::view::BuilderStateView;
use crate::modules::village::{DayReport, DirectiveOutcome, Village};

pub const MAX_DAYS: u32 = 100;
pub const MAX_DIRECT_STEPS: usize = 50;
pub const MAX_ORACLE_STEPS: usize = 20;

/// One oracle cycle: decision, application and the day that followed.
#[derive(Clone, Debug, Serialize)]
pub struct CycleReport {
    pub provider: &'static str,
    pub decision: DecisionPayload,
    pub directives: DirectiveOutcome,
    pub day: DayReport,
}

/// Owns the grid, the village, the builders and the single random source.
pub struct Simulation {
    grid: GridWorld,
    village: Village,
    builders: BTreeMap<String, Builder>,
    provider: Box<dyn DecisionProvider>,
    rng: StdRng,
    tick_delay: Duration,
}

impl Simulation {
    pub fn new(grid: GridWorld, village: Village, provider: Box<dyn DecisionProvider>, rng: StdRng) -> Self {
        Self {
            grid,
            village,
            builders: BTreeMap::new(),
            provider,
            rng,
            tick_delay: Duration::ZERO,
        }
    }

    pub fn from_config(config: &SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut grid = GridWorld::new(config.grid_size, &mut rng);
        grid.resources_mut().credit_all(&config.village.starting_resources);
        let village = config.build_village()?;
        let provider = build_provider(&config.provider)?;
        info!(
            grid_size = config.grid_size,
            seed = ?config.seed,
            provider = provider.name(),
            villagers = village.villagers().len(),
            "simulation ready"
        );
        let mut sim = Self::new(grid, village, provider, rng);
        sim.tick_delay = config.tick_delay();
        Ok(sim)
    }

    pub fn with_tick_delay(mut self, delay: Duration) -> Self {
        self.tick_delay = delay;
        self
    }

    pub const fn grid(&self) -> &GridWorld {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut GridWorld {
        &mut self.grid
    }

    pub const fn village(&self) -> &Village {
        &self.village
    }

    pub fn village_mut(&mut self) -> &mut Village {
        &mut self.village
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub const fn resources(&self) -> &ResourcePool {
        self.grid.resources()
    }

    /// Admin credit into the shared pool.
    pub fn add_resources(&mut self, resources: &ResourcePool) {
        self.grid.resources_mut().credit_all(resources);
        info!(added = %resources, total = %self.grid.resources(), "resources added");
    }

    /// Regenerates the grid; the shared pool starts from zero and builders
    /// are dropped.
    pub fn reset_grid(&mut self) {
        self.grid.reset(&mut self.rng);
        self.builders.clear();
    }

    /// Cuts a tree straight into the shared pool, without a builder.
    pub fn cut_tree(&mut self, pos: GridPos, tree_id: u64) -> Result<Amount, SimError> {
        Ok(self.grid.cut_tree(pos, tree_id, &mut self.rng)?)
    }

    pub fn summary(&self) -> String {
        self.village.summary(self.grid.resources())
    }

    pub fn run_cycle(&mut self) -> CycleReport {
        let snapshot = self.village.snapshot(self.grid.resources());
        let decision = self.provider.village_decision(&snapshot);
        let directives = self.village.apply_directives(&decision, false);
        let day = self.village.execute_day(self.grid.resources_mut(), &mut self.rng);
        debug!(
            day = day.day,
            events = day.events.len(),
            rejections = directives.rejections.len() + day.rejections.len(),
            "cycle complete"
        );
        CycleReport {
            provider: self.provider.name(),
            decision,
            directives,
            day,
        }
    }

    pub fn simulate_days(&mut self, days: u32) -> Result<Vec<CycleReport>, SimError> {
        if !(1..=MAX_DAYS).contains(&days) {
            return Err(SimError::InvalidArgument(format!(
                "days must be between 1 and {}, got {}",
                MAX_DAYS, days
            )));
        }
        let mut reports = Vec::with_capacity(days as usize);
        for i in 0..days {
            if i > 0 && !self.tick_delay.is_zero() {
                thread::sleep(self.tick_delay);
            }
            reports.push(self.run_cycle());
        }
        Ok(reports)
    }

    /// Spawns a builder near the oracle. Without an id the next free
    /// `builder_<n>` is used.
    pub fn create_builder(&mut self, id: Option<String>) -> Result<BuilderStateView, SimError> {
        let id = match id {
            Some(id) if self.builders.contains_key(&id) => return Err(SimError::BuilderExists(id)),
            Some(id) => id,
            None => {
                let mut n = self.builders.len() + 1;
                while self.builders.contains_key(&format!("builder_{}", n)) {
                    n += 1;
                }
                format!("builder_{}", n)
            }
        };
        let builder = Builder::spawn(id.clone(), &self.grid);
        let state = builder.state();
        self.builders.insert(id, builder);
        Ok(state)
    }

    pub fn builder(&self, id: &str) -> Result<&Builder, SimError> {
        self.builders
            .get(id)
            .ok_or_else(|| SimError::BuilderNotFound(id.to_string()))
    }

    pub fn builders(&self) -> impl Iterator<Item = &Builder> {
        self.builders.values()
    }

    pub fn delete_builder(&mut self, id: &str) -> Result<Builder, SimError> {
        self.builders
            .remove(id)
            .ok_or_else(|| SimError::BuilderNotFound(id.to_string()))
    }

    pub fn reset_builders(&mut self) -> usize {
        let removed = self.builders.len();
        self.builders.clear();
        removed
    }

    pub fn give(&mut self, id: &str, resources: &ResourcePool) -> Result<BuilderStateView, SimError> {
        let builder = lookup(&mut self.builders, id)?;
        builder.give(resources);
        Ok(builder.state())
    }

    pub fn set_task(&mut self, id: &str, task: &str) -> Result<(), SimError> {
        lookup(&mut self.builders, id)?.set_task(task);
        Ok(())
    }

    /// Runs a hand-written action string.
    pub fn builder_execute(&mut self, id: &str, action: &str) -> Result<ActionReport, SimError> {
        let builder = lookup(&mut self.builders, id)?;
        Ok(builder.perform(action, &mut self.grid, &mut self.rng))
    }

    /// One tactical decision from the provider, then execution.
    pub fn builder_act(&mut self, id: &str) -> Result<ActionReport, SimError> {
        let builder = lookup(&mut self.builders, id)?;
        let context = builder.context(&self.grid);
        let action = self.provider.builder_action(&context, None);
        Ok(builder.perform(&action, &mut self.grid, &mut self.rng))
    }

    /// Strategic directive first, then the tactical action that serves it.
    pub fn builder_oracle_act(&mut self, id: &str) -> Result<ActionReport, SimError> {
        let builder = lookup(&mut self.builders, id)?;
        let context = builder.context(&self.grid);
        let directive = self.provider.builder_directive(&context);
        builder.set_task(directive.clone());
        let context = builder.context(&self.grid);
        let action = self.provider.builder_action(&context, Some(&directive));
        let mut report = builder.perform(&action, &mut self.grid, &mut self.rng);
        report.directive = Some(directive);
        Ok(report)
    }

    /// Repeats `builder_act` or `builder_oracle_act`. Direct runs stop at the
    /// first unparseable action, oracle runs at the first failure.
    pub fn builder_simulate(&mut self, id: &str, steps: usize, oracle: bool) -> Result<Vec<ActionReport>, SimError> {
        let cap = if oracle { MAX_ORACLE_STEPS } else { MAX_DIRECT_STEPS };
        if steps > cap {
            warn!(requested = steps, cap, "step count capped");
        }
        let mut reports = Vec::new();
        for step in 0..steps.min(cap) {
            if step > 0 && !self.tick_delay.is_zero() {
                thread::sleep(self.tick_delay);
            }
            let report = if oracle {
                self.builder_oracle_act(id)?
            } else {
                self.builder_act(id)?
            };
            let stop = if oracle {
                !report.success
            } else {
                report.action == "unknown"
            };
            reports.push(report);
            if stop {
                debug!(builder = id, step, "builder run stopped early");
                break;
            }
        }
        Ok(reports)
    }
}

fn lookup<'a>(builders: &'a mut BTreeMap<String, Builder>, id: &str) -> Result<&'a mut Builder, SimError> {
    builders
        .get_mut(id)
        .ok_or_else(|| SimError::BuilderNotFound(id.to_string()))
}

pub fn build_provider(config: &ProviderConfig) -> Result<Box<dyn DecisionProvider>, SimError> {
    match config.brain {
        BrainMode::Rules => Ok(Box::new(RuleProvider)),
        BrainMode::Llm => {
            let api_key = config.resolved_api_key();
            if api_key.is_none() && config.llm_provider == LlmProvider::Openai {
                warn!("no LLM API key configured; every decision will use the rules");
            }
            let client = LlmClient::new(
                config.host.clone(),
                config.model.clone(),
                config.llm_provider,
                api_key,
                config.timeout(),
            )?
            .with_max_attempts(config.max_attempts)
            .with_transcript_dir(config.transcript_dir.clone());
            Ok(Box::new(RemoteProvider::new(client)))
        }
    }
}
