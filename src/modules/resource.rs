use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::modules::error::ActionError;

pub type Amount = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Wood,
    Stone,
    Food,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [ResourceKind::Wood, ResourceKind::Stone, ResourceKind::Food];

    pub const fn label(self) -> &'static str {
        match self {
            ResourceKind::Wood => "wood",
            ResourceKind::Stone => "stone",
            ResourceKind::Food => "food",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for ResourceKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "wood" => Ok(ResourceKind::Wood),
            "stone" => Ok(ResourceKind::Stone),
            "food" => Ok(ResourceKind::Food),
            _ => Err(()),
        }
    }
}

/// Quantities of the three raw materials. Used both for the shared village
/// pool owned by the grid and for a builder's private inventory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcePool {
    pub wood: Amount,
    pub stone: Amount,
    pub food: Amount,
}

impl ResourcePool {
    pub const fn new(wood: Amount, stone: Amount, food: Amount) -> Self {
        Self { wood, stone, food }
    }

    pub const fn get(&self, kind: ResourceKind) -> Amount {
        match kind {
            ResourceKind::Wood => self.wood,
            ResourceKind::Stone => self.stone,
            ResourceKind::Food => self.food,
        }
    }

    fn slot_mut(&mut self, kind: ResourceKind) -> &mut Amount {
        match kind {
            ResourceKind::Wood => &mut self.wood,
            ResourceKind::Stone => &mut self.stone,
            ResourceKind::Food => &mut self.food,
        }
    }

    pub fn credit(&mut self, kind: ResourceKind, amount: Amount) {
        let slot = self.slot_mut(kind);
        *slot = slot.saturating_add(amount);
    }

    pub fn credit_all(&mut self, other: &ResourcePool) {
        for kind in ResourceKind::ALL {
            self.credit(kind, other.get(kind));
        }
    }

    /// First resource in `costs` that the pool cannot cover, in list order.
    pub fn shortfall(&self, costs: &[(ResourceKind, Amount)]) -> Option<(ResourceKind, Amount, Amount)> {
        costs
            .iter()
            .find(|(kind, required)| self.get(*kind) < *required)
            .map(|(kind, required)| (*kind, *required, self.get(*kind)))
    }

    /// Deducts every cost or nothing at all.
    pub fn debit_all(
        &mut self,
        action: &'static str,
        costs: &[(ResourceKind, Amount)],
    ) -> Result<(), ActionError> {
        if let Some((resource, required, available)) = self.shortfall(costs) {
            return Err(ActionError::InsufficientResource {
                action,
                resource,
                required,
                available,
            });
        }
        for (kind, amount) in costs {
            *self.slot_mut(*kind) -= *amount;
        }
        Ok(())
    }
}

impl fmt::Display for ResourcePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wood={} stone={} food={}", self.wood, self.stone, self.food)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debit_all_is_all_or_nothing() {
        let mut pool = ResourcePool::new(100, 10, 0);
        let err = pool
            .debit_all("build_house", &[(ResourceKind::Wood, 50), (ResourceKind::Stone, 30)])
            .unwrap_err();
        assert!(matches!(
            err,
            ActionError::InsufficientResource {
                resource: ResourceKind::Stone,
                required: 30,
                available: 10,
                ..
            }
        ));
        assert_eq!(pool, ResourcePool::new(100, 10, 0));

        pool.debit_all("build_house", &[(ResourceKind::Wood, 50), (ResourceKind::Stone, 10)])
            .unwrap();
        assert_eq!(pool, ResourcePool::new(50, 0, 0));
    }

    #[test]
    fn shortfall_reports_first_missing_resource() {
        let pool = ResourcePool::new(0, 0, 5);
        let missing = pool.shortfall(&[(ResourceKind::Food, 5), (ResourceKind::Wood, 1), (ResourceKind::Stone, 1)]);
        assert_eq!(missing, Some((ResourceKind::Wood, 1, 0)));
    }

    #[test]
    fn parses_resource_labels() {
        assert_eq!("Wood".parse::<ResourceKind>(), Ok(ResourceKind::Wood));
        assert_eq!(" food ".parse::<ResourceKind>(), Ok(ResourceKind::Food));
        assert!("gold".parse::<ResourceKind>().is_err());
    }
}
