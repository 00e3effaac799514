use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::modules::building::{BuildingKind, Buildings};
use crate::modules::error::ActionError;
use crate::modules::resource::{Amount, ResourceKind, ResourcePool};
use crate::modules::village::Villager;

pub const MAX_EXPERIENCE: u32 = 100;
pub const MAX_STAMINA: f32 = 1.0;
pub const REST_RECOVERY: f32 = 0.40;

/// Yield multiplier for a job tier. Unknown tiers count as tier 1.
pub const fn tier_multiplier(tier: u8) -> f64 {
    match tier {
        2 => 1.5,
        3 => 2.0,
        _ => 1.0,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPath {
    Wood,
    Food,
    Stone,
}

impl JobPath {
    pub const fn resource(self) -> ResourceKind {
        match self {
            JobPath::Wood => ResourceKind::Wood,
            JobPath::Food => ResourceKind::Food,
            JobPath::Stone => ResourceKind::Stone,
        }
    }

    /// Jobs on this path ordered by tier.
    pub const fn jobs(self) -> [Job; 3] {
        match self {
            JobPath::Wood => [Job::Woodcutter, Job::Lumberjack, Job::Builder],
            JobPath::Food => [Job::Forager, Job::Farmer, Job::Chef],
            JobPath::Stone => [Job::Miner, Job::Excavator, Job::Engineer],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Job {
    Woodcutter,
    Lumberjack,
    Builder,
    Forager,
    Farmer,
    Chef,
    Miner,
    Excavator,
    Engineer,
}

impl Job {
    pub const fn label(self) -> &'static str {
        match self {
            Job::Woodcutter => "woodcutter",
            Job::Lumberjack => "lumberjack",
            Job::Builder => "builder",
            Job::Forager => "forager",
            Job::Farmer => "farmer",
            Job::Chef => "chef",
            Job::Miner => "miner",
            Job::Excavator => "excavator",
            Job::Engineer => "engineer",
        }
    }

    pub const fn path(self) -> JobPath {
        match self {
            Job::Woodcutter | Job::Lumberjack | Job::Builder => JobPath::Wood,
            Job::Forager | Job::Farmer | Job::Chef => JobPath::Food,
            Job::Miner | Job::Excavator | Job::Engineer => JobPath::Stone,
        }
    }

    /// Natural tier of the job within its path.
    pub const fn tier(self) -> u8 {
        match self {
            Job::Woodcutter | Job::Forager | Job::Miner => 1,
            Job::Lumberjack | Job::Farmer | Job::Excavator => 2,
            Job::Builder | Job::Chef | Job::Engineer => 3,
        }
    }

    /// The job one tier up the same path, if any.
    pub const fn next(self) -> Option<Job> {
        match self {
            Job::Woodcutter => Some(Job::Lumberjack),
            Job::Lumberjack => Some(Job::Builder),
            Job::Forager => Some(Job::Farmer),
            Job::Farmer => Some(Job::Chef),
            Job::Miner => Some(Job::Excavator),
            Job::Excavator => Some(Job::Engineer),
            Job::Builder | Job::Chef | Job::Engineer => None,
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Job {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "woodcutter" => Ok(Job::Woodcutter),
            "lumberjack" => Ok(Job::Lumberjack),
            "builder" => Ok(Job::Builder),
            "forager" => Ok(Job::Forager),
            "farmer" => Ok(Job::Farmer),
            "chef" => Ok(Job::Chef),
            "miner" => Ok(Job::Miner),
            "excavator" => Ok(Job::Excavator),
            "engineer" => Ok(Job::Engineer),
            other => Err(ActionError::UnknownJob(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ChopWood,
    GatherFood,
    FarmCrops,
    CookFood,
    MineStone,
    BuildHouse,
    BuildWorkshop,
    BuildFarm,
    Rest,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ActionCategory {
    Gather {
        resource: ResourceKind,
        base_yield: Amount,
        /// Raw input spent before producing, e.g. cooking eats food.
        consumes: Option<(ResourceKind, Amount)>,
    },
    Build {
        building: BuildingKind,
        cost: &'static [(ResourceKind, Amount)],
    },
    Rest {
        recovery: f32,
    },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActionDef {
    pub category: ActionCategory,
    pub stamina_cost: f32,
    pub experience_gain: u32,
    /// Empty means anyone may perform the action.
    pub eligible_jobs: &'static [Job],
}

impl ActionKind {
    pub const ALL: [ActionKind; 9] = [
        ActionKind::ChopWood,
        ActionKind::GatherFood,
        ActionKind::FarmCrops,
        ActionKind::CookFood,
        ActionKind::MineStone,
        ActionKind::BuildHouse,
        ActionKind::BuildWorkshop,
        ActionKind::BuildFarm,
        ActionKind::Rest,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ActionKind::ChopWood => "chop_wood",
            ActionKind::GatherFood => "gather_food",
            ActionKind::FarmCrops => "farm_crops",
            ActionKind::CookFood => "cook_food",
            ActionKind::MineStone => "mine_stone",
            ActionKind::BuildHouse => "build_house",
            ActionKind::BuildWorkshop => "build_workshop",
            ActionKind::BuildFarm => "build_farm",
            ActionKind::Rest => "rest",
        }
    }

    pub const fn build(building: BuildingKind) -> Self {
        match building {
            BuildingKind::House => ActionKind::BuildHouse,
            BuildingKind::Workshop => ActionKind::BuildWorkshop,
            BuildingKind::Farm => ActionKind::BuildFarm,
        }
    }

    pub const fn is_build(self) -> bool {
        matches!(self.def().category, ActionCategory::Build { .. })
    }

    pub const fn def(self) -> ActionDef {
        use ResourceKind::{Food, Stone, Wood};
        match self {
            ActionKind::ChopWood => ActionDef {
                category: ActionCategory::Gather {
                    resource: Wood,
                    base_yield: 10,
                    consumes: None,
                },
                stamina_cost: 0.15,
                experience_gain: 5,
                eligible_jobs: &[Job::Woodcutter, Job::Lumberjack, Job::Builder],
            },
            ActionKind::GatherFood => ActionDef {
                category: ActionCategory::Gather {
                    resource: Food,
                    base_yield: 8,
                    consumes: None,
                },
                stamina_cost: 0.12,
                experience_gain: 5,
                eligible_jobs: &[Job::Forager, Job::Farmer, Job::Chef],
            },
            ActionKind::FarmCrops => ActionDef {
                category: ActionCategory::Gather {
                    resource: Food,
                    base_yield: 15,
                    consumes: None,
                },
                stamina_cost: 0.18,
                experience_gain: 8,
                eligible_jobs: &[Job::Farmer, Job::Chef],
            },
            ActionKind::CookFood => ActionDef {
                category: ActionCategory::Gather {
                    resource: Food,
                    base_yield: 20,
                    consumes: Some((Food, 10)),
                },
                stamina_cost: 0.10,
                experience_gain: 10,
                eligible_jobs: &[Job::Chef],
            },
            ActionKind::MineStone => ActionDef {
                category: ActionCategory::Gather {
                    resource: Stone,
                    base_yield: 12,
                    consumes: None,
                },
                stamina_cost: 0.20,
                experience_gain: 6,
                eligible_jobs: &[Job::Miner, Job::Excavator, Job::Engineer],
            },
            ActionKind::BuildHouse => ActionDef {
                category: ActionCategory::Build {
                    building: BuildingKind::House,
                    cost: &[(Wood, 50), (Stone, 30)],
                },
                stamina_cost: 0.25,
                experience_gain: 15,
                eligible_jobs: &[Job::Builder, Job::Engineer],
            },
            ActionKind::BuildWorkshop => ActionDef {
                category: ActionCategory::Build {
                    building: BuildingKind::Workshop,
                    cost: &[(Wood, 80), (Stone, 60)],
                },
                stamina_cost: 0.30,
                experience_gain: 20,
                eligible_jobs: &[Job::Builder, Job::Engineer],
            },
            ActionKind::BuildFarm => ActionDef {
                category: ActionCategory::Build {
                    building: BuildingKind::Farm,
                    cost: &[(Wood, 40), (Food, 20)],
                },
                stamina_cost: 0.20,
                experience_gain: 15,
                eligible_jobs: &[Job::Farmer, Job::Chef, Job::Builder],
            },
            ActionKind::Rest => ActionDef {
                category: ActionCategory::Rest {
                    recovery: REST_RECOVERY,
                },
                stamina_cost: 0.0,
                experience_gain: 0,
                eligible_jobs: &[],
            },
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for ActionKind {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.label() == wanted)
            .ok_or_else(|| ActionError::UnknownAction(s.trim().to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ActionEffect {
    Rested {
        stamina: f32,
    },
    Gathered {
        resource: ResourceKind,
        amount: Amount,
        consumed: Option<(ResourceKind, Amount)>,
    },
    Built {
        building: BuildingKind,
    },
}

impl fmt::Display for ActionEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionEffect::Rested { stamina } => {
                write!(f, "rested (stamina {:.0}%)", stamina * 100.0)
            }
            ActionEffect::Gathered {
                resource,
                amount,
                consumed: Some((spent, cost)),
            } => write!(f, "+{} {} (used {} {})", amount, resource, cost, spent),
            ActionEffect::Gathered {
                resource, amount, ..
            } => write!(f, "+{} {}", amount, resource),
            ActionEffect::Built { building } => write!(f, "built {}", building),
        }
    }
}

/// Runs every check `execute` would, without touching any state.
pub fn can_execute(
    action: ActionKind,
    villager: &Villager,
    resources: &ResourcePool,
) -> Result<(), ActionError> {
    let def = action.def();
    if !def.eligible_jobs.is_empty() && !def.eligible_jobs.contains(&villager.job) {
        return Err(ActionError::WrongJob {
            name: villager.name.clone(),
            action: action.label(),
            job: villager.job.label(),
        });
    }
    if villager.stamina < def.stamina_cost {
        return Err(ActionError::TooTired {
            name: villager.name.clone(),
            action: action.label(),
            stamina: villager.stamina,
            required: def.stamina_cost,
        });
    }
    let required: &[(ResourceKind, Amount)] = match &def.category {
        ActionCategory::Gather {
            consumes: Some(input),
            ..
        } => std::slice::from_ref(input),
        ActionCategory::Build { cost, .. } => *cost,
        ActionCategory::Gather { consumes: None, .. } | ActionCategory::Rest { .. } => &[],
    };
    if let Some((resource, required, available)) = resources.shortfall(required) {
        return Err(ActionError::InsufficientResource {
            action: action.label(),
            resource,
            required,
            available,
        });
    }
    Ok(())
}

/// Applies one action to one villager and the shared pools. Nothing changes
/// when an error is returned.
pub fn execute<R: Rng>(
    action: ActionKind,
    villager: &mut Villager,
    resources: &mut ResourcePool,
    buildings: &mut Buildings,
    rng: &mut R,
) -> Result<ActionEffect, ActionError> {
    can_execute(action, villager, resources)?;
    let def = action.def();

    let effect = match def.category {
        ActionCategory::Rest { recovery } => {
            villager.stamina = (villager.stamina + recovery).min(MAX_STAMINA);
            return Ok(ActionEffect::Rested {
                stamina: villager.stamina,
            });
        }
        ActionCategory::Gather {
            resource,
            base_yield,
            consumes,
        } => {
            if let Some(input) = consumes {
                resources.debit_all(action.label(), &[input])?;
            }
            let variance: f64 = rng.gen_range(0.8..1.2);
            let amount = (base_yield as f64 * tier_multiplier(villager.job_tier) * variance) as Amount;
            resources.credit(resource, amount);
            ActionEffect::Gathered {
                resource,
                amount,
                consumed: consumes,
            }
        }
        ActionCategory::Build { building, cost } => {
            resources.debit_all(action.label(), cost)?;
            buildings.increment(building);
            ActionEffect::Built { building }
        }
    };

    villager.stamina = (villager.stamina - def.stamina_cost).max(0.0);
    villager.experience = (villager.experience + def.experience_gain).min(MAX_EXPERIENCE);
    Ok(effect)
}
