use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::modules::error::ProviderError;
use crate::modules::grid::{GridPos, GridWorld, TileType};

/// Minimum trees for a group to count as a cluster.
pub const MIN_CLUSTER_SIZE: usize = 3;
/// Minimum cluster size for a recommended resource zone.
pub const MIN_ZONE_SIZE: usize = 5;
pub const MAX_RESOURCE_ZONES: usize = 5;
/// Chebyshev reach used when grouping trees.
pub const CLUSTER_RADIUS: i32 = 3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeCluster {
    pub cluster_id: usize,
    pub center: GridPos,
    pub size: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentMemory {
    pub tree_count: usize,
    pub tree_density: f64,
    pub tree_clusters: Vec<TreeCluster>,
    pub recommended_resource_zones: Vec<GridPos>,
    pub terrain: BTreeMap<TileType, usize>,
    pub map_summary: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentAnalysis {
    pub spawn: GridPos,
    pub memory: EnvironmentMemory,
}

/// Hook the grid runs after generation and after every successful cut.
pub trait EnvironmentAnalyzer {
    fn analyze(&self, grid: &GridWorld) -> Option<EnvironmentAnalysis>;
}

/// Source of tile artwork references.
pub trait TileImageSource {
    fn generate_tile_image(&self, tile_type: TileType) -> Result<String, ProviderError>;
}

/// Fills `{tile}` in a URL template with the tile type name.
#[derive(Clone, Debug)]
pub struct TemplateImageSource {
    template: String,
}

impl TemplateImageSource {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl TileImageSource for TemplateImageSource {
    fn generate_tile_image(&self, tile_type: TileType) -> Result<String, ProviderError> {
        if !self.template.contains("{tile}") {
            return Err(ProviderError::Unavailable(format!(
                "image template '{}' has no {{tile}} placeholder",
                self.template
            )));
        }
        Ok(self.template.replace("{tile}", tile_type.label()))
    }
}

/// Offline analysis: spawn near the centre, simple tree clustering.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicAnalyzer;

impl EnvironmentAnalyzer for HeuristicAnalyzer {
    fn analyze(&self, grid: &GridWorld) -> Option<EnvironmentAnalysis> {
        let size = grid.size();
        let center = GridPos::new(size / 2, size / 2);

        // One entry per standing tree, located at its tile.
        let trees: Vec<GridPos> = grid
            .tiles()
            .iter()
            .flat_map(|tile| tile.standing_trees().map(move |_| tile.pos()))
            .collect();
        let wooded: HashSet<GridPos> = trees.iter().copied().collect();

        let mut terrain = BTreeMap::new();
        for tile in grid.tiles() {
            *terrain.entry(tile.tile_type).or_insert(0usize) += 1;
        }

        let spawn = grid
            .tiles()
            .iter()
            .filter(|tile| tile.tile_type == TileType::Grass && !wooded.contains(&tile.pos()))
            .min_by_key(|tile| tile.pos().manhattan(center))
            .map(|tile| tile.pos())
            .unwrap_or(center);

        let tree_clusters = cluster_trees(&trees);
        let recommended_resource_zones = tree_clusters
            .iter()
            .filter(|cluster| cluster.size >= MIN_ZONE_SIZE)
            .map(|cluster| cluster.center)
            .take(MAX_RESOURCE_ZONES)
            .collect();

        let total_tiles = grid.tiles().len();
        let density = if total_tiles > 0 {
            trees.len() as f64 / total_tiles as f64
        } else {
            0.0
        };
        let count = |t: TileType| terrain.get(&t).copied().unwrap_or(0);
        let map_summary = format!(
            "Map {size}x{size} with {} trees ({:.1}% density). Terrain: {} grass, {} dirt, {} water tiles. {} tree clusters identified.",
            trees.len(),
            density * 100.0,
            count(TileType::Grass),
            count(TileType::Dirt),
            count(TileType::Water),
            tree_clusters.len(),
        );

        Some(EnvironmentAnalysis {
            spawn,
            memory: EnvironmentMemory {
                tree_count: trees.len(),
                tree_density: (density * 10_000.0).round() / 10_000.0,
                tree_clusters,
                recommended_resource_zones,
                terrain,
                map_summary,
            },
        })
    }
}

/// Seeds a group from each tree whose tile is not yet claimed. A group takes
/// every tree within reach of the seed, claimed or not.
fn cluster_trees(trees: &[GridPos]) -> Vec<TreeCluster> {
    let mut visited: HashSet<GridPos> = HashSet::new();
    let mut clusters = Vec::new();
    for seed in trees {
        if visited.contains(seed) {
            continue;
        }
        let members: Vec<GridPos> = trees
            .iter()
            .copied()
            .filter(|other| seed.chebyshev(*other) <= CLUSTER_RADIUS)
            .collect();
        visited.extend(members.iter().copied());
        if members.len() < MIN_CLUSTER_SIZE {
            continue;
        }
        let n = members.len() as i32;
        let sum_x: i32 = members.iter().map(|p| p.x).sum();
        let sum_y: i32 = members.iter().map(|p| p.y).sum();
        clusters.push(TreeCluster {
            cluster_id: clusters.len(),
            center: GridPos::new(sum_x.div_euclid(n), sum_y.div_euclid(n)),
            size: members.len(),
        });
    }
    clusters
}
