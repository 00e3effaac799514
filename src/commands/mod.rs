use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};
use oracle_village::{BrainMode, GridPos, LlmProvider, ResourcePool, SimConfig, Simulation};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

mod builder;
mod grid;
mod village;

use builder::{BuilderArgs, run_builder};
use grid::{GridArgs, run_grid};
use village::{VillageArgs, run_village};

#[derive(Parser)]
#[command(
    name = "oracle-village",
    version,
    about = "Oracle-governed village and builder simulation on a tile grid",
    long_about = None
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// TOML config file; flags below override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// RNG seed for reproducible worlds (entropy when omitted)
    #[arg(long, global = true)]
    seed: Option<u64>,
    /// Side length of the square grid
    #[arg(long, global = true)]
    grid_size: Option<i32>,
    /// Decision driver: rules (deterministic) or llm (rules as fallback)
    #[arg(long, global = true, value_enum)]
    brain: Option<BrainMode>,
    /// LLM provider: openai (/v1/chat/completions) or ollama (/api/chat)
    #[arg(long, global = true, value_enum)]
    llm_provider: Option<LlmProvider>,
    /// LLM host/base URL
    #[arg(long, global = true)]
    llm_host: Option<String>,
    /// Model name, interpreted by the selected provider
    #[arg(long, global = true)]
    llm_model: Option<String>,
    /// API key for OpenAI-compatible providers (also reads LLM_API_KEY env var)
    #[arg(long, global = true)]
    llm_api_key: Option<String>,
    /// LLM timeout in ms
    #[arg(long, global = true)]
    llm_timeout_ms: Option<u64>,
    /// Append every LLM exchange to <dir>/llm.log
    #[arg(long, global = true)]
    transcript_dir: Option<PathBuf>,
    /// Delay between days or builder steps in milliseconds
    #[arg(short = 'd', long, global = true)]
    delay_ms: Option<u64>,
    /// Log filter (e.g. debug, oracle_village=trace); defaults to RUST_LOG, then info
    #[arg(long, global = true)]
    log_level: Option<String>,
}

impl GlobalArgs {
    fn load_config(&self) -> Result<SimConfig, String> {
        let mut config = match &self.config {
            Some(path) => SimConfig::load(path).map_err(|e| e.to_string())?,
            None => SimConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(size) = self.grid_size {
            config.grid_size = size;
        }
        if let Some(delay) = self.delay_ms {
            config.tick_delay_ms = delay;
        }
        let provider = &mut config.provider;
        if let Some(brain) = self.brain {
            provider.brain = brain;
        }
        if let Some(kind) = self.llm_provider {
            provider.llm_provider = kind;
        }
        if let Some(host) = &self.llm_host {
            provider.host = host.clone();
        }
        if let Some(model) = &self.llm_model {
            provider.model = model.clone();
        }
        if let Some(key) = &self.llm_api_key {
            provider.api_key = Some(key.clone());
        }
        if let Some(timeout) = self.llm_timeout_ms {
            provider.timeout_ms = timeout;
        }
        if let Some(dir) = &self.transcript_dir {
            provider.transcript_dir = Some(dir.clone());
        }
        config.validate().map_err(|e| e.to_string())?;
        Ok(config)
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Run oracle cycles over the village
    Village(VillageArgs),
    /// Spawn a builder and run actions or decided steps
    Builder(BuilderArgs),
    /// Inspect the grid, view a region or cut a tree
    Grid(GridArgs),
}

/// `x,y` coordinate argument.
#[derive(Clone, Copy, Debug)]
pub struct PositionArg(pub GridPos);

impl FromStr for PositionArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [x, y] = parse_ints::<2>(s).map_err(|_| "Position must be formatted as x,y".to_string())?;
        Ok(PositionArg(GridPos::new(x, y)))
    }
}

/// `wood,stone,food` amounts argument.
#[derive(Clone, Copy, Debug)]
pub struct PoolArg(pub ResourcePool);

impl FromStr for PoolArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<_> = s.trim().split(',').collect();
        if parts.len() != 3 {
            return Err("Resources must be formatted as wood,stone,food".into());
        }
        let mut amounts = [0u32; 3];
        for (slot, part) in amounts.iter_mut().zip(&parts) {
            *slot = part
                .trim()
                .parse()
                .map_err(|_| format!("'{}' is not a non-negative amount", part.trim()))?;
        }
        Ok(PoolArg(ResourcePool::new(amounts[0], amounts[1], amounts[2])))
    }
}

pub(crate) fn parse_ints<const N: usize>(s: &str) -> Result<[i32; N], String> {
    let parts: Vec<_> = s.trim().split(',').collect();
    if parts.len() != N {
        return Err(format!("expected {} comma-separated integers", N));
    }
    let mut out = [0; N];
    for (slot, part) in out.iter_mut().zip(&parts) {
        *slot = part
            .trim()
            .parse::<i32>()
            .map_err(|_| format!("'{}' must be an integer", part.trim()))?;
    }
    Ok(out)
}

pub fn run() {
    let cli = Cli::parse();
    init_tracing(cli.global.log_level.as_deref());
    if let Err(err) = dispatch(cli) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

fn dispatch(cli: Cli) -> Result<(), String> {
    let config = cli.global.load_config()?;
    let mut sim = Simulation::from_config(&config).map_err(|e| e.to_string())?;
    match cli.command {
        Command::Village(args) => run_village(args, &mut sim),
        Command::Builder(args) => run_builder(args, &mut sim),
        Command::Grid(args) => run_grid(args, &mut sim),
    }
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| format!("json: {}", e))?;
    println!("{}", text);
    Ok(())
}
