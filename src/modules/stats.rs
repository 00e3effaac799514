use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::modules::actions::{ActionCategory, ActionKind};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionStats {
    pub gather_count: u64,
    pub build_count: u64,
    pub rest_count: u64,
    pub idle_count: u64,
    pub rejected_count: u64,
}

impl ActionStats {
    pub fn record(&mut self, action: ActionKind) {
        match action.def().category {
            ActionCategory::Gather { .. } => self.gather_count = self.gather_count.saturating_add(1),
            ActionCategory::Build { .. } => self.build_count = self.build_count.saturating_add(1),
            ActionCategory::Rest { .. } => self.rest_count = self.rest_count.saturating_add(1),
        }
    }

    pub fn total(&self) -> u64 {
        self.gather_count + self.build_count + self.rest_count
    }
}

/// Action counters keyed by villager name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionStatsStore {
    pub per_villager: BTreeMap<String, ActionStats>,
}

impl ActionStatsStore {
    pub fn record_action(&mut self, name: &str, action: ActionKind) {
        self.entry(name).record(action);
    }

    pub fn record_idle(&mut self, name: &str) {
        let stats = self.entry(name);
        stats.idle_count = stats.idle_count.saturating_add(1);
    }

    pub fn record_rejection(&mut self, name: &str) {
        let stats = self.entry(name);
        stats.rejected_count = stats.rejected_count.saturating_add(1);
    }

    pub fn get(&self, name: &str) -> Option<&ActionStats> {
        self.per_villager.get(name)
    }

    pub fn forget(&mut self, name: &str) {
        self.per_villager.remove(name);
    }

    fn entry(&mut self, name: &str) -> &mut ActionStats {
        self.per_villager.entry(name.to_string()).or_default()
    }
}
