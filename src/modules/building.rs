use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::modules::resource::{Amount, ResourceKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildingKind {
    House,
    Workshop,
    Farm,
}

impl BuildingKind {
    pub const fn label(self) -> &'static str {
        match self {
            BuildingKind::House => "house",
            BuildingKind::Workshop => "workshop",
            BuildingKind::Farm => "farm",
        }
    }

    /// Wood and stone a roaming builder spends on one of these. Unrelated to
    /// the village build actions, which have their own cost table.
    pub const fn builder_cost(self) -> [(ResourceKind, Amount); 2] {
        match self {
            BuildingKind::House => [(ResourceKind::Wood, 50), (ResourceKind::Stone, 20)],
            BuildingKind::Workshop => [(ResourceKind::Wood, 100), (ResourceKind::Stone, 50)],
            BuildingKind::Farm => [(ResourceKind::Wood, 30), (ResourceKind::Stone, 10)],
        }
    }
}

impl fmt::Display for BuildingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for BuildingKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "house" | "houses" => Ok(BuildingKind::House),
            "workshop" | "workshops" => Ok(BuildingKind::Workshop),
            "farm" | "farms" => Ok(BuildingKind::Farm),
            _ => Err(()),
        }
    }
}

/// Village building counters. Only ever incremented.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Buildings {
    pub houses: u32,
    pub workshops: u32,
    pub farms: u32,
}

impl Buildings {
    pub const fn count(&self, kind: BuildingKind) -> u32 {
        match kind {
            BuildingKind::House => self.houses,
            BuildingKind::Workshop => self.workshops,
            BuildingKind::Farm => self.farms,
        }
    }

    pub fn increment(&mut self, kind: BuildingKind) {
        let slot = match kind {
            BuildingKind::House => &mut self.houses,
            BuildingKind::Workshop => &mut self.workshops,
            BuildingKind::Farm => &mut self.farms,
        };
        *slot = slot.saturating_add(1);
    }
}

impl fmt::Display for Buildings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "houses={} workshops={} farms={}",
            self.houses, self.workshops, self.farms
        )
    }
}
