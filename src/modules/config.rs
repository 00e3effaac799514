use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::modules::actions::Job;
use crate::modules::building::Buildings;
use crate::modules::error::SimError;
use crate::modules::grid::{DEFAULT_GRID_SIZE, MAX_GRID_SIZE};
use crate::modules::llm::LlmProvider;
use crate::modules::resource::ResourcePool;
use crate::modules::village::Village;

pub const API_KEY_ENV: &str = "LLM_API_KEY";

/// Who makes village and builder decisions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BrainMode {
    /// Deterministic rule policy, no network.
    #[default]
    Rules,
    /// Chat model with the rule policy as fallback.
    Llm,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub grid_size: i32,
    pub seed: Option<u64>,
    pub tick_delay_ms: u64,
    pub village: VillageConfig,
    pub provider: ProviderConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            seed: None,
            tick_delay_ms: 0,
            village: VillageConfig::default(),
            provider: ProviderConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VillagerSpec {
    pub name: String,
    pub job: String,
    #[serde(default = "default_tier")]
    pub tier: u8,
}

fn default_tier() -> u8 {
    1
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VillageConfig {
    pub starting_resources: ResourcePool,
    pub villagers: Vec<VillagerSpec>,
    pub starting_buildings: Buildings,
}

impl Default for VillageConfig {
    fn default() -> Self {
        let village = Village::default();
        Self {
            starting_resources: ResourcePool::new(50, 20, 50),
            villagers: village
                .villagers()
                .iter()
                .map(|v| VillagerSpec {
                    name: v.name.clone(),
                    job: v.job.label().to_string(),
                    tier: v.job_tier,
                })
                .collect(),
            starting_buildings: *village.buildings(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub brain: BrainMode,
    pub llm_provider: LlmProvider,
    pub host: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
    pub max_attempts: u32,
    pub transcript_dir: Option<PathBuf>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            brain: BrainMode::Rules,
            llm_provider: LlmProvider::Openai,
            host: "https://api.openai.com".into(),
            model: "gpt-4o-mini".into(),
            api_key: None,
            timeout_ms: 30_000,
            max_attempts: 3,
            transcript_dir: None,
        }
    }
}

impl ProviderConfig {
    /// Configured key, else `LLM_API_KEY`.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| env::var(API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl SimConfig {
    /// Reads a TOML file; missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, SimError> {
        let text = fs::read_to_string(path).map_err(|source| SimError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text).map_err(|source| SimError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn tick_delay(&self) -> Duration {
        Duration::from_millis(self.tick_delay_ms)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if !(1..=MAX_GRID_SIZE).contains(&self.grid_size) {
            return Err(SimError::InvalidConfig(format!(
                "grid_size must be between 1 and {}, got {}",
                MAX_GRID_SIZE, self.grid_size
            )));
        }
        if self.provider.max_attempts == 0 {
            return Err(SimError::InvalidConfig("provider.max_attempts must be at least 1".into()));
        }
        let mut seen = HashSet::new();
        for spec in &self.village.villagers {
            spec.job
                .parse::<Job>()
                .map_err(|e| SimError::InvalidConfig(format!("villager {}: {}", spec.name, e)))?;
            if !(1..=3).contains(&spec.tier) {
                return Err(SimError::InvalidConfig(format!(
                    "villager {}: tier {} outside 1..=3",
                    spec.name, spec.tier
                )));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(SimError::InvalidConfig(format!(
                    "duplicate villager name '{}'",
                    spec.name
                )));
            }
        }
        Ok(())
    }

    /// Builds the starting village from the roster.
    pub fn build_village(&self) -> Result<Village, SimError> {
        self.validate()?;
        let mut village = Village::empty(self.village.starting_buildings);
        for spec in &self.village.villagers {
            let job = spec.job.parse::<Job>()?;
            village.add_villager(&spec.name, job, spec.tier)?;
        }
        Ok(village)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_starting_village() {
        let config = SimConfig::default();
        assert_eq!(config.grid_size, 40);
        assert_eq!(config.village.starting_resources, ResourcePool::new(50, 20, 50));
        assert_eq!(config.village.starting_buildings.houses, 1);
        let names: Vec<_> = config.village.villagers.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["Alice", "Bob", "Charlie"]);
        assert_eq!(config.provider.brain, BrainMode::Rules);
        assert_eq!(config.provider.timeout_ms, 30_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = SimConfig::from_toml(
            r#"
            grid_size = 12
            seed = 7

            [village.starting_resources]
            wood = 300

            [provider]
            brain = "llm"
            llm_provider = "ollama"
            host = "http://localhost:11434"
            "#,
        )
        .unwrap();
        assert_eq!(config.grid_size, 12);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.village.starting_resources, ResourcePool::new(300, 0, 0));
        assert_eq!(config.village.villagers.len(), 3);
        assert_eq!(config.provider.brain, BrainMode::Llm);
        assert_eq!(config.provider.llm_provider, LlmProvider::Ollama);
        assert_eq!(config.provider.max_attempts, 3);
    }

    #[test]
    fn custom_roster_builds_village() {
        let config = SimConfig::from_toml(
            r#"
            [[village.villagers]]
            name = "Dana"
            job = "lumberjack"
            tier = 2

            [[village.villagers]]
            name = "Eli"
            job = "chef"
            tier = 3
            "#,
        )
        .unwrap();
        let village = config.build_village().unwrap();
        assert_eq!(village.villagers().len(), 2);
        let dana = village.villager("Dana").unwrap();
        assert_eq!((dana.job, dana.job_tier), (Job::Lumberjack, 2));
    }

    #[test]
    fn validation_rejects_bad_rosters() {
        let mut config = SimConfig::default();
        config.village.villagers.push(VillagerSpec {
            name: "Alice".into(),
            job: "miner".into(),
            tier: 1,
        });
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));

        let mut config = SimConfig::default();
        config.village.villagers[0].job = "wizard".into();
        assert!(config.validate().is_err());

        let mut config = SimConfig::default();
        config.village.villagers[0].tier = 4;
        assert!(config.validate().is_err());

        let config = SimConfig {
            grid_size: 0,
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_oversized_grid() {
        let config = SimConfig {
            grid_size: 50_000,
            ..SimConfig::default()
        };
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));

        let config = SimConfig {
            grid_size: MAX_GRID_SIZE,
            ..SimConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn explicit_key_wins_and_blank_is_none() {
        let mut provider = ProviderConfig {
            api_key: Some("sk-test".into()),
            ..ProviderConfig::default()
        };
        assert_eq!(provider.resolved_api_key().as_deref(), Some("sk-test"));
        provider.api_key = Some("   ".into());
        if env::var(API_KEY_ENV).is_err() {
            assert_eq!(provider.resolved_api_key(), None);
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SimConfig::load(Path::new("/nonexistent/oracle-village.toml")).unwrap_err();
        assert!(matches!(err, SimError::ConfigIo { .. }));
    }
}
