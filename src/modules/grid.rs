use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::modules::environment::{EnvironmentAnalysis, EnvironmentAnalyzer, HeuristicAnalyzer, TileImageSource};
use crate::modules::error::ActionError;
use crate::modules::resource::{Amount, ResourceKind, ResourcePool};
use crate::modules::view::{GridState, GridStats, Viewport};

pub const DEFAULT_GRID_SIZE: i32 = 40;
/// Largest side length a configured grid may have.
pub const MAX_GRID_SIZE: i32 = 500;
/// Chance that a non-water tile receives any trees at all.
pub const TREE_CHANCE: f64 = 0.7;
pub const TREE_SPECIES: [&str; 3] = ["oak", "pine", "birch"];
/// Inclusive wood yield range for cutting one tree.
pub const TREE_WOOD_YIELD: (Amount, Amount) = (5, 15);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub const fn manhattan(self, other: GridPos) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    pub fn chebyshev(self, other: GridPos) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileType {
    Grass,
    Dirt,
    Stone,
    Forest,
    Water,
}

impl TileType {
    pub const ALL: [TileType; 5] = [
        TileType::Grass,
        TileType::Dirt,
        TileType::Stone,
        TileType::Forest,
        TileType::Water,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            TileType::Grass => "grass",
            TileType::Dirt => "dirt",
            TileType::Stone => "stone",
            TileType::Forest => "forest",
            TileType::Water => "water",
        }
    }

    pub const fn can_hold_trees(self) -> bool {
        !matches!(self, TileType::Water)
    }

    fn roll<R: Rng>(rng: &mut R) -> Self {
        let roll: f64 = rng.gen_range(0.0..1.0);
        if roll < 0.75 {
            TileType::Grass
        } else if roll < 0.90 {
            TileType::Dirt
        } else {
            TileType::Water
        }
    }
}

impl fmt::Display for TileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for TileType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "grass" => Ok(TileType::Grass),
            "dirt" => Ok(TileType::Dirt),
            "stone" => Ok(TileType::Stone),
            "forest" => Ok(TileType::Forest),
            "water" => Ok(TileType::Water),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeOffset {
    pub offset_x: f64,
    pub offset_y: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub id: u64,
    #[serde(skip)]
    pub tile: GridPos,
    pub position: TreeOffset,
    pub cut: bool,
    #[serde(rename = "type")]
    pub species: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
    pub tile_type: TileType,
    #[serde(rename = "tile_image_url")]
    pub image_reference: Option<String>,
    pub trees: Vec<Tree>,
}

impl Tile {
    pub const fn pos(&self) -> GridPos {
        GridPos::new(self.x, self.y)
    }

    pub fn standing_trees(&self) -> impl Iterator<Item = &Tree> {
        self.trees.iter().filter(|tree| !tree.cut)
    }

    pub fn has_standing_tree(&self) -> bool {
        self.trees.iter().any(|tree| !tree.cut)
    }
}

/// Square tile grid with its trees, the shared resource pool and the oracle
/// spawn point.
pub struct GridWorld {
    size: i32,
    /// x-major: index = x * size + y.
    tiles: Vec<Tile>,
    next_tree_id: u64,
    resources: ResourcePool,
    oracle_position: Option<GridPos>,
    analysis: Option<EnvironmentAnalysis>,
    analyzer: Option<Box<dyn EnvironmentAnalyzer>>,
}

impl GridWorld {
    /// Generates a grid and analyses it with the heuristic analyzer.
    pub fn new<R: Rng>(size: i32, rng: &mut R) -> Self {
        Self::with_analyzer(size, Some(Box::new(HeuristicAnalyzer)), rng)
    }

    pub fn with_analyzer<R: Rng>(
        size: i32,
        analyzer: Option<Box<dyn EnvironmentAnalyzer>>,
        rng: &mut R,
    ) -> Self {
        let mut grid = Self {
            size: size.max(0),
            tiles: Vec::new(),
            next_tree_id: 0,
            resources: ResourcePool::default(),
            oracle_position: None,
            analysis: None,
            analyzer,
        };
        grid.initialize(rng);
        grid
    }

    fn initialize<R: Rng>(&mut self, rng: &mut R) {
        let size = self.size;
        self.tiles = Vec::with_capacity((size.max(0) as usize).saturating_mul(size.max(0) as usize));
        for x in 0..size {
            for y in 0..size {
                let tile_type = TileType::roll(rng);
                let mut tile = Tile {
                    x,
                    y,
                    tile_type,
                    image_reference: None,
                    trees: Vec::new(),
                };
                if tile_type.can_hold_trees() && rng.gen_bool(TREE_CHANCE) {
                    let count = rng.gen_range(1..=2);
                    for _ in 0..count {
                        let tree = self.plant_tree(tile.pos(), rng);
                        tile.trees.push(tree);
                    }
                }
                self.tiles.push(tile);
            }
        }
        info!(
            size,
            trees = self.next_tree_id,
            "generated grid"
        );
        self.refresh_analysis();
    }

    fn plant_tree<R: Rng>(&mut self, tile: GridPos, rng: &mut R) -> Tree {
        let id = self.next_tree_id;
        self.next_tree_id += 1;
        let species = TREE_SPECIES.choose(rng).copied().unwrap_or("oak");
        Tree {
            id,
            tile,
            position: TreeOffset {
                offset_x: rng.gen_range(0.1..0.9),
                offset_y: rng.gen_range(0.1..0.9),
            },
            cut: false,
            species: species.to_string(),
        }
    }

    /// Wipes every tile, tree, counter and the resource pool, then regenerates.
    pub fn reset<R: Rng>(&mut self, rng: &mut R) {
        self.tiles.clear();
        self.next_tree_id = 0;
        self.resources = ResourcePool::default();
        self.oracle_position = None;
        self.analysis = None;
        self.initialize(rng);
    }

    pub const fn size(&self) -> i32 {
        self.size
    }

    pub fn in_bounds(&self, pos: GridPos) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.size && pos.y < self.size
    }

    fn index(&self, pos: GridPos) -> Option<usize> {
        self.in_bounds(pos)
            .then(|| (pos.x * self.size + pos.y) as usize)
    }

    pub fn tile(&self, pos: GridPos) -> Option<&Tile> {
        self.index(pos).and_then(|idx| self.tiles.get(idx))
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn trees(&self) -> impl Iterator<Item = &Tree> {
        self.tiles.iter().flat_map(|tile| tile.trees.iter())
    }

    /// Number of trees ever placed since the last reset.
    pub const fn trees_placed(&self) -> u64 {
        self.next_tree_id
    }

    pub const fn resources(&self) -> &ResourcePool {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut ResourcePool {
        &mut self.resources
    }

    pub const fn oracle_position(&self) -> Option<GridPos> {
        self.oracle_position
    }

    pub fn set_oracle_position(&mut self, pos: GridPos) -> Result<(), ActionError> {
        if !self.in_bounds(pos) {
            return Err(ActionError::OutOfBounds(pos));
        }
        self.oracle_position = Some(pos);
        Ok(())
    }

    pub fn analysis(&self) -> Option<&EnvironmentAnalysis> {
        self.analysis.as_ref()
    }

    pub fn set_analyzer(&mut self, analyzer: Option<Box<dyn EnvironmentAnalyzer>>) {
        self.analyzer = analyzer;
        self.refresh_analysis();
    }

    fn refresh_analysis(&mut self) {
        let Some(analyzer) = self.analyzer.take() else {
            return;
        };
        match analyzer.analyze(self) {
            Some(analysis) => {
                debug!(spawn = %analysis.spawn, trees = analysis.memory.tree_count, "environment analysed");
                self.oracle_position = Some(analysis.spawn);
                self.analysis = Some(analysis);
            }
            None => warn!("environment analysis produced no result"),
        }
        self.analyzer = Some(analyzer);
    }

    pub fn stats(&self) -> GridStats {
        let standing = self.trees().filter(|tree| !tree.cut).count() as u64;
        GridStats {
            total_trees: standing,
            trees_cut: self.next_tree_id.saturating_sub(standing),
        }
    }

    pub fn state(&self) -> GridState {
        GridState {
            grid_size: self.size,
            tiles: self.tiles.clone(),
            resources: self.resources,
            oracle_position: self.oracle_position,
            stats: self.stats(),
        }
    }

    /// Tiles in `[x0, x1) x [y0, y1)`, with the bounds clamped to the grid.
    pub fn viewport(&self, x0: i32, y0: i32, x1: i32, y1: i32) -> Viewport {
        let x0 = x0.clamp(0, self.size);
        let y0 = y0.clamp(0, self.size);
        let x1 = x1.clamp(0, self.size);
        let y1 = y1.clamp(0, self.size);
        let mut tiles = Vec::new();
        for x in x0..x1 {
            for y in y0..y1 {
                if let Some(tile) = self.tile(GridPos::new(x, y)) {
                    tiles.push(tile.clone());
                }
            }
        }
        Viewport {
            x0,
            y0,
            x1,
            y1,
            tiles,
        }
    }

    /// Standing trees on tiles within Chebyshev `radius` of `center`, scanned
    /// with dx as the outer loop and dy as the inner one.
    pub fn standing_trees_near(&self, center: GridPos, radius: i32) -> Vec<(GridPos, u64)> {
        let mut found = Vec::new();
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                let pos = center.offset(dx, dy);
                if let Some(tile) = self.tile(pos) {
                    found.extend(tile.standing_trees().map(|tree| (pos, tree.id)));
                }
            }
        }
        found
    }

    /// Cuts one standing tree and credits its wood to the shared pool.
    pub fn cut_tree<R: Rng>(&mut self, pos: GridPos, tree_id: u64, rng: &mut R) -> Result<Amount, ActionError> {
        let unavailable = ActionError::TreeUnavailable {
            position: pos,
            tree_id,
        };
        let idx = self.index(pos).ok_or_else(|| unavailable.clone())?;
        let tree = self.tiles[idx]
            .trees
            .iter_mut()
            .find(|tree| tree.id == tree_id && !tree.cut)
            .ok_or(unavailable)?;
        tree.cut = true;

        let wood = rng.gen_range(TREE_WOOD_YIELD.0..=TREE_WOOD_YIELD.1);
        self.resources.credit(ResourceKind::Wood, wood);
        debug!(x = pos.x, y = pos.y, tree_id, wood, "tree cut");
        self.refresh_analysis();
        Ok(wood)
    }

    /// Attaches image references keyed by tile type name. Unknown keys are
    /// ignored. Returns how many tiles were updated.
    pub fn apply_tile_images(&mut self, images: &HashMap<String, String>) -> usize {
        let mut by_type: HashMap<TileType, &str> = HashMap::new();
        for (key, url) in images {
            match key.parse::<TileType>() {
                Ok(tile_type) => {
                    by_type.insert(tile_type, url.as_str());
                }
                Err(()) => debug!(key = %key, "ignoring image for unknown tile type"),
            }
        }

        let mut updated = 0;
        for tile in &mut self.tiles {
            if let Some(url) = by_type.get(&tile.tile_type) {
                tile.image_reference = Some((*url).to_string());
                updated += 1;
            }
        }
        updated
    }

    /// Requests one image per tile type present on the grid and applies the
    /// ones that were produced.
    pub fn assign_tile_images(&mut self, source: &dyn TileImageSource) -> usize {
        let mut images = HashMap::new();
        for tile_type in TileType::ALL {
            if !self.tiles.iter().any(|tile| tile.tile_type == tile_type) {
                continue;
            }
            match source.generate_tile_image(tile_type) {
                Ok(url) => {
                    images.insert(tile_type.label().to_string(), url);
                }
                Err(err) => warn!(tile_type = %tile_type, error = %err, "tile image generation failed"),
            }
        }
        self.apply_tile_images(&images)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::modules::error::ProviderError;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    pub(crate) fn seeded_grid(size: i32, seed: u64) -> (GridWorld, StdRng) {
        let mut rng = StdRng::seed_from_u64(seed);
        let grid = GridWorld::new(size, &mut rng);
        (grid, rng)
    }

    /// Replaces the tile at `pos` with a grass tile holding one fresh tree.
    pub(crate) fn plant_at(grid: &mut GridWorld, pos: GridPos) -> u64 {
        let idx = grid.index(pos).unwrap();
        let id = grid.next_tree_id;
        grid.next_tree_id += 1;
        let tile = &mut grid.tiles[idx];
        tile.tile_type = TileType::Grass;
        tile.trees = vec![Tree {
            id,
            tile: pos,
            position: TreeOffset {
                offset_x: 0.5,
                offset_y: 0.5,
            },
            cut: false,
            species: "oak".into(),
        }];
        id
    }

    pub(crate) fn clear_trees(grid: &mut GridWorld) {
        for tile in &mut grid.tiles {
            for tree in &mut tile.trees {
                tree.cut = true;
            }
        }
    }

    #[test]
    fn water_tiles_never_hold_trees() {
        let (grid, _) = seeded_grid(10, 7);
        assert_eq!(grid.tiles().len(), 100);
        for tile in grid.tiles() {
            if tile.tile_type == TileType::Water {
                assert!(tile.trees.is_empty(), "water tile {:?} has trees", tile.pos());
            }
        }
        let standing = grid.trees().filter(|t| !t.cut).count() as u64;
        assert_eq!(grid.state().stats.total_trees, standing);
        assert_eq!(grid.stats().trees_cut, 0);
    }

    #[test]
    fn same_seed_generates_same_grid() {
        let (a, _) = seeded_grid(12, 42);
        let (b, _) = seeded_grid(12, 42);
        assert_eq!(a.tiles(), b.tiles());
    }

    #[test]
    fn tree_ids_increase_in_creation_order() {
        let (grid, _) = seeded_grid(15, 3);
        let ids: Vec<u64> = grid.trees().map(|t| t.id).collect();
        assert!(!ids.is_empty());
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(ids.len() as u64, grid.trees_placed());
    }

    #[test]
    fn cutting_twice_only_pays_once() {
        let (mut grid, mut rng) = seeded_grid(10, 11);
        let pos = GridPos::new(2, 2);
        let id = plant_at(&mut grid, pos);
        let before = grid.resources().wood;

        let wood = grid.cut_tree(pos, id, &mut rng).unwrap();
        assert!((5..=15).contains(&wood));
        let second = grid.cut_tree(pos, id, &mut rng);
        assert!(matches!(second, Err(ActionError::TreeUnavailable { .. })));
        assert_eq!(grid.resources().wood, before + wood);
        assert_eq!(grid.stats().trees_cut, 1);
    }

    #[test]
    fn cut_rejects_missing_tile_or_tree() {
        let (mut grid, mut rng) = seeded_grid(5, 1);
        assert!(grid.cut_tree(GridPos::new(-1, 0), 0, &mut rng).is_err());
        assert!(grid.cut_tree(GridPos::new(0, 0), 9_999, &mut rng).is_err());
        assert_eq!(grid.resources().wood, 0);
    }

    #[test]
    fn viewport_clamps_out_of_range_bounds() {
        let (grid, _) = seeded_grid(8, 5);
        let view = grid.viewport(-5, 6, 3, 50);
        assert_eq!((view.x0, view.y0, view.x1, view.y1), (0, 6, 3, 8));
        assert_eq!(view.tiles.len(), 3 * 2);
        assert!(view.tiles.iter().all(|t| t.x < 3 && t.y >= 6));

        let empty = grid.viewport(6, 6, 2, 2);
        assert!(empty.tiles.is_empty());
    }

    #[test]
    fn reset_clears_pool_and_counters() {
        let (mut grid, mut rng) = seeded_grid(6, 9);
        grid.resources_mut().credit(ResourceKind::Stone, 40);
        let pos = GridPos::new(1, 1);
        let id = plant_at(&mut grid, pos);
        grid.cut_tree(pos, id, &mut rng).unwrap();

        grid.reset(&mut rng);
        assert_eq!(*grid.resources(), ResourcePool::default());
        assert_eq!(grid.stats().trees_cut, 0);
        assert_eq!(grid.trees().next().map(|t| t.id), Some(0));
    }

    #[test]
    fn analysis_runs_after_generation_and_cuts() {
        let (mut grid, mut rng) = seeded_grid(10, 21);
        let spawn = grid.oracle_position().unwrap();
        assert!(grid.in_bounds(spawn));

        let pos = GridPos::new(0, 0);
        let id = plant_at(&mut grid, pos);
        grid.cut_tree(pos, id, &mut rng).unwrap();
        let standing = grid.trees().filter(|t| !t.cut).count();
        assert_eq!(grid.analysis().unwrap().memory.tree_count, standing);
    }

    #[test]
    fn oracle_position_must_be_in_bounds() {
        let (mut grid, _) = seeded_grid(4, 2);
        assert!(grid.set_oracle_position(GridPos::new(4, 0)).is_err());
        grid.set_oracle_position(GridPos::new(3, 3)).unwrap();
        assert_eq!(grid.oracle_position(), Some(GridPos::new(3, 3)));
    }

    #[test]
    fn tile_images_ignore_unknown_types() {
        let (mut grid, _) = seeded_grid(6, 4);
        let grass = grid.tiles().iter().filter(|t| t.tile_type == TileType::Grass).count();
        let mut images = HashMap::new();
        images.insert("grass".to_string(), "img://grass".to_string());
        images.insert("lava".to_string(), "img://lava".to_string());

        assert_eq!(grid.apply_tile_images(&images), grass);
        assert!(grid
            .tiles()
            .iter()
            .filter(|t| t.tile_type == TileType::Grass)
            .all(|t| t.image_reference.as_deref() == Some("img://grass")));
    }

    struct OnlyGrass;

    impl TileImageSource for OnlyGrass {
        fn generate_tile_image(&self, tile_type: TileType) -> Result<String, ProviderError> {
            match tile_type {
                TileType::Grass => Ok("img://grass".into()),
                other => Err(ProviderError::Unavailable(format!("no art for {}", other))),
            }
        }
    }

    #[test]
    fn assign_tile_images_skips_failures() {
        let (mut grid, _) = seeded_grid(6, 4);
        let grass = grid.tiles().iter().filter(|t| t.tile_type == TileType::Grass).count();
        assert_eq!(grid.assign_tile_images(&OnlyGrass), grass);
        assert!(grid
            .tiles()
            .iter()
            .filter(|t| t.tile_type != TileType::Grass)
            .all(|t| t.image_reference.is_none()));
    }

    #[test]
    fn serialises_tree_species_as_type() {
        let (mut grid, _) = seeded_grid(3, 1);
        plant_at(&mut grid, GridPos::new(0, 0));
        let json = serde_json::to_value(grid.tile(GridPos::new(0, 0)).unwrap()).unwrap();
        assert_eq!(json["trees"][0]["type"], "oak");
        assert!(json["trees"][0].get("tile").is_none());
        assert!(json.get("tile_image_url").is_some());
    }
}
