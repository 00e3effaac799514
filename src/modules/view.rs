use serde::{Deserialize, Serialize};

use crate::modules::actions::{ActionKind, Job};
use crate::modules::building::Buildings;
use crate::modules::grid::{GridPos, Tile};
use crate::modules::resource::ResourcePool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridStats {
    /// Trees still standing.
    pub total_trees: u64,
    pub trees_cut: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridState {
    pub grid_size: i32,
    pub tiles: Vec<Tile>,
    pub resources: ResourcePool,
    pub oracle_position: Option<GridPos>,
    pub stats: GridStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
    pub tiles: Vec<Tile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VillagerView {
    pub name: String,
    pub job: Job,
    pub job_tier: u8,
    pub stamina: f32,
    pub experience: u32,
    pub assigned_task: Option<ActionKind>,
}

/// Everything a decision provider sees about the village.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VillageSnapshot {
    pub day: u32,
    pub resources: ResourcePool,
    pub villagers: Vec<VillagerView>,
    pub buildings: Buildings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuilderStateView {
    pub agent_id: String,
    pub position: GridPos,
    pub inventory: ResourcePool,
    pub current_task: Option<String>,
    pub action_count: usize,
    pub recent_actions: Vec<String>,
}
