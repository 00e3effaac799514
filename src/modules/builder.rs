use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::modules::building::BuildingKind;
use crate::modules::error::ActionError;
use crate::modules::grid::{GridPos, GridWorld, TileType};
use crate::modules::resource::{Amount, ResourceKind, ResourcePool};
use crate::modules::view::BuilderStateView;

/// Max Manhattan distance to a tree being cut.
pub const CUT_RANGE: i32 = 1;
/// Max Manhattan distance to a build site.
pub const BUILD_RANGE: i32 = 2;
pub const RECENT_ACTIONS: usize = 5;
const SPAWN_RADII: [i32; 3] = [1, 2, 3];
const FALLBACK_SPAWN: GridPos = GridPos::new(1, 1);

/// One primitive builder action, parsed from text such as `WALK 5,10`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuilderCommand {
    Talk { message: String },
    Walk { to: GridPos },
    Cut { at: GridPos, tree_id: u64 },
    Build { building: BuildingKind, at: GridPos },
}

impl BuilderCommand {
    pub const fn label(&self) -> &'static str {
        match self {
            BuilderCommand::Talk { .. } => "talk",
            BuilderCommand::Walk { .. } => "walk",
            BuilderCommand::Cut { .. } => "cut",
            BuilderCommand::Build { .. } => "build",
        }
    }
}

impl fmt::Display for BuilderCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuilderCommand::Talk { message } => write!(f, "TALK \"{}\"", message),
            BuilderCommand::Walk { to } => write!(f, "WALK {},{}", to.x, to.y),
            BuilderCommand::Cut { at, tree_id } => write!(f, "CUT {},{},{}", at.x, at.y, tree_id),
            BuilderCommand::Build { building, at } => write!(f, "BUILD {},{},{}", building, at.x, at.y),
        }
    }
}

impl FromStr for BuilderCommand {
    type Err = ActionError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = || ActionError::InvalidFormat(input.trim().to_string());
        let trimmed = input.trim();
        let (verb, rest) = trimmed
            .split_once(char::is_whitespace)
            .map(|(v, r)| (v, r.trim()))
            .unwrap_or((trimmed, ""));

        match verb.to_uppercase().as_str() {
            "TALK" | "SPEAK" => {
                let message = quoted(rest).ok_or_else(invalid)?;
                Ok(BuilderCommand::Talk {
                    message: message.to_string(),
                })
            }
            "WALK" | "MOVE" => {
                let [x, y] = numbers::<2>(rest).ok_or_else(invalid)?;
                Ok(BuilderCommand::Walk {
                    to: coords(x, y).ok_or_else(invalid)?,
                })
            }
            "CUT" => {
                let [x, y, id] = numbers::<3>(rest).ok_or_else(invalid)?;
                Ok(BuilderCommand::Cut {
                    at: coords(x, y).ok_or_else(invalid)?,
                    tree_id: u64::try_from(id).map_err(|_| invalid())?,
                })
            }
            "BUILD" => {
                let (kind, coord_text) = rest.split_once(',').ok_or_else(invalid)?;
                let [x, y] = numbers::<2>(coord_text).ok_or_else(invalid)?;
                let kind = kind.trim();
                let building = kind
                    .parse::<BuildingKind>()
                    .map_err(|()| ActionError::UnknownBuilding(kind.to_string()))?;
                Ok(BuilderCommand::Build {
                    building,
                    at: coords(x, y).ok_or_else(invalid)?,
                })
            }
            _ => Err(invalid()),
        }
    }
}

/// Text between the first pair of matching double or single quotes.
fn quoted(text: &str) -> Option<&str> {
    ['"', '\''].into_iter().find_map(|q| {
        let start = text.find(q)? + 1;
        let len = text[start..].find(q)?;
        (len > 0).then(|| &text[start..start + len])
    })
}

/// First `N` comma-separated integers; trailing words after the last are ignored.
fn numbers<const N: usize>(text: &str) -> Option<[i64; N]> {
    let mut parts = text.split(',');
    let mut out = [0i64; N];
    for slot in out.iter_mut() {
        let token = parts.next()?.trim().split_whitespace().next()?;
        *slot = token.parse().ok()?;
    }
    Some(out)
}

fn coords(x: i64, y: i64) -> Option<GridPos> {
    Some(GridPos::new(i32::try_from(x).ok()?, i32::try_from(y).ok()?))
}

/// Successful builder action, kept in the builder's history.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BuilderEvent {
    Talked {
        message: String,
        position: GridPos,
    },
    Walked {
        from: GridPos,
        to: GridPos,
    },
    Cut {
        tree_id: u64,
        position: GridPos,
        wood_gained: Amount,
        inventory: ResourcePool,
    },
    Built {
        building_type: BuildingKind,
        position: GridPos,
        resources_used: ResourcePool,
        inventory: ResourcePool,
    },
}

impl BuilderEvent {
    pub const fn label(&self) -> &'static str {
        match self {
            BuilderEvent::Talked { .. } => "talk",
            BuilderEvent::Walked { .. } => "walk",
            BuilderEvent::Cut { .. } => "cut",
            BuilderEvent::Built { .. } => "build",
        }
    }
}

impl fmt::Display for BuilderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuilderEvent::Talked { message, .. } => write!(f, "talk \"{}\"", message),
            BuilderEvent::Walked { from, to } => write!(f, "walk {} -> {}", from, to),
            BuilderEvent::Cut {
                tree_id,
                position,
                wood_gained,
                ..
            } => write!(f, "cut tree {} at {} (+{} wood)", tree_id, position, wood_gained),
            BuilderEvent::Built {
                building_type,
                position,
                ..
            } => write!(f, "build {} at {}", building_type, position),
        }
    }
}

/// Outcome of one action string, successful or not.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActionReport {
    pub success: bool,
    pub action: &'static str,
    #[serde(flatten)]
    pub detail: Option<BuilderEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directive: Option<String>,
}

impl ActionReport {
    fn ok(event: BuilderEvent) -> Self {
        Self {
            success: true,
            action: event.label(),
            detail: Some(event),
            error: None,
            action_string: None,
            directive: None,
        }
    }

    fn failed(action: &'static str, error: &ActionError) -> Self {
        Self {
            success: false,
            action,
            detail: None,
            error: Some(error.to_string()),
            action_string: None,
            directive: None,
        }
    }
}

impl fmt::Display for ActionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(directive) = &self.directive {
            write!(f, "[{}] ", directive)?;
        }
        match (&self.detail, &self.error) {
            (Some(event), _) => write!(f, "ok: {}", event),
            (None, Some(error)) => write!(f, "{} failed: {}", self.action, error),
            (None, None) => write!(f, "{} failed", self.action),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NearbyTree {
    pub position: GridPos,
    pub tree_id: u64,
    pub species: String,
}

/// What a builder can observe, handed to decision providers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BuilderContext {
    pub agent_id: String,
    pub position: GridPos,
    pub tile_type: Option<TileType>,
    pub inventory: ResourcePool,
    pub nearby_tiles: usize,
    /// Standing trees in the 3x3 neighbourhood, dx-major order.
    pub nearby_trees: Vec<NearbyTree>,
    pub current_task: Option<String>,
    pub grid_size: i32,
}

impl fmt::Display for BuilderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BUILDER STATUS:")?;
        writeln!(f, "Agent ID: {}", self.agent_id)?;
        writeln!(f, "Current Position: ({}, {})", self.position.x, self.position.y)?;
        writeln!(
            f,
            "Current Tile Type: {}",
            self.tile_type.map(TileType::label).unwrap_or("unknown")
        )?;
        writeln!(f, "\nINVENTORY:")?;
        writeln!(f, "Wood: {}", self.inventory.wood)?;
        writeln!(f, "Stone: {}", self.inventory.stone)?;
        writeln!(f, "Food: {}", self.inventory.food)?;
        writeln!(f, "\nNEARBY ENVIRONMENT (3x3 area):")?;
        writeln!(f, "Tiles: {}", self.nearby_tiles)?;
        writeln!(f, "Trees Available: {}", self.nearby_trees.len())?;
        if !self.nearby_trees.is_empty() {
            writeln!(f, "\nNEARBY TREES:")?;
            for tree in self.nearby_trees.iter().take(5) {
                writeln!(
                    f,
                    "  - {} at ({}, {}) ID: {}",
                    tree.species, tree.position.x, tree.position.y, tree.tree_id
                )?;
            }
        }
        if let Some(task) = &self.current_task {
            writeln!(f, "\nCURRENT TASK: {}", task)?;
        }
        writeln!(f, "\nGRID SIZE: {}x{}", self.grid_size, self.grid_size)
    }
}

/// Free-roaming actor with a private inventory.
#[derive(Clone, Debug)]
pub struct Builder {
    id: String,
    position: GridPos,
    inventory: ResourcePool,
    current_task: Option<String>,
    history: Vec<BuilderEvent>,
}

impl Builder {
    /// Places the builder on the first clear grass tile near the oracle.
    pub fn spawn(id: impl Into<String>, grid: &GridWorld) -> Self {
        let id = id.into();
        let position = spawn_position(grid);
        info!(builder = %id, x = position.x, y = position.y, "builder spawned");
        Self {
            id,
            position,
            inventory: ResourcePool::default(),
            current_task: None,
            history: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub const fn position(&self) -> GridPos {
        self.position
    }

    pub const fn inventory(&self) -> &ResourcePool {
        &self.inventory
    }

    pub fn current_task(&self) -> Option<&str> {
        self.current_task.as_deref()
    }

    pub fn set_task(&mut self, task: impl Into<String>) {
        self.current_task = Some(task.into());
    }

    pub fn give(&mut self, resources: &ResourcePool) {
        self.inventory.credit_all(resources);
    }

    /// Most recent `limit` events, oldest first.
    pub fn history(&self, limit: usize) -> &[BuilderEvent] {
        let start = self.history.len().saturating_sub(limit);
        &self.history[start..]
    }

    pub fn state(&self) -> BuilderStateView {
        BuilderStateView {
            agent_id: self.id.clone(),
            position: self.position,
            inventory: self.inventory,
            current_task: self.current_task.clone(),
            action_count: self.history.len(),
            recent_actions: self.history(RECENT_ACTIONS).iter().map(ToString::to_string).collect(),
        }
    }

    pub fn context(&self, grid: &GridWorld) -> BuilderContext {
        let mut nearby_tiles = 0;
        let mut nearby_trees = Vec::new();
        for dx in -1..=1 {
            for dy in -1..=1 {
                let Some(tile) = grid.tile(self.position.offset(dx, dy)) else {
                    continue;
                };
                nearby_tiles += 1;
                nearby_trees.extend(tile.standing_trees().map(|tree| NearbyTree {
                    position: tile.pos(),
                    tree_id: tree.id,
                    species: tree.species.clone(),
                }));
            }
        }
        BuilderContext {
            agent_id: self.id.clone(),
            position: self.position,
            tile_type: grid.tile(self.position).map(|t| t.tile_type),
            inventory: self.inventory,
            nearby_tiles,
            nearby_trees,
            current_task: self.current_task.clone(),
            grid_size: grid.size(),
        }
    }

    /// Applies one command. Failures leave the builder and grid untouched.
    pub fn execute<R: Rng>(
        &mut self,
        command: &BuilderCommand,
        grid: &mut GridWorld,
        rng: &mut R,
    ) -> Result<BuilderEvent, ActionError> {
        let event = match command {
            BuilderCommand::Talk { message } => {
                info!(builder = %self.id, "{}", message);
                BuilderEvent::Talked {
                    message: message.clone(),
                    position: self.position,
                }
            }
            BuilderCommand::Walk { to } => {
                if !grid.in_bounds(*to) {
                    return Err(ActionError::OutOfBounds(*to));
                }
                let from = self.position;
                self.position = *to;
                BuilderEvent::Walked { from, to: *to }
            }
            BuilderCommand::Cut { at, tree_id } => {
                self.check_reach(*at, CUT_RANGE)?;
                let wood = grid.cut_tree(*at, *tree_id, rng)?;
                self.inventory.credit(ResourceKind::Wood, wood);
                BuilderEvent::Cut {
                    tree_id: *tree_id,
                    position: *at,
                    wood_gained: wood,
                    inventory: self.inventory,
                }
            }
            BuilderCommand::Build { building, at } => {
                if !grid.in_bounds(*at) {
                    return Err(ActionError::OutOfBounds(*at));
                }
                self.check_reach(*at, BUILD_RANGE)?;
                let cost = building.builder_cost();
                self.inventory.debit_all("build", &cost)?;
                let mut used = ResourcePool::default();
                for (kind, amount) in cost {
                    used.credit(kind, amount);
                }
                BuilderEvent::Built {
                    building_type: *building,
                    position: *at,
                    resources_used: used,
                    inventory: self.inventory,
                }
            }
        };
        debug!(builder = %self.id, event = %event, "builder acted");
        self.history.push(event.clone());
        Ok(event)
    }

    /// Parses and executes an action string, reporting instead of failing.
    pub fn perform<R: Rng>(&mut self, text: &str, grid: &mut GridWorld, rng: &mut R) -> ActionReport {
        let mut report = match text.parse::<BuilderCommand>() {
            Ok(command) => match self.execute(&command, grid, rng) {
                Ok(event) => ActionReport::ok(event),
                Err(error) => ActionReport::failed(command.label(), &error),
            },
            Err(error @ ActionError::UnknownBuilding(_)) => ActionReport::failed("build", &error),
            Err(error) => ActionReport::failed("unknown", &error),
        };
        report.action_string = Some(text.trim().to_string());
        report
    }

    fn check_reach(&self, target: GridPos, max: i32) -> Result<(), ActionError> {
        let distance = self.position.manhattan(target);
        if distance > max {
            return Err(ActionError::TooFar {
                target,
                distance,
                max,
            });
        }
        Ok(())
    }
}

fn spawn_position(grid: &GridWorld) -> GridPos {
    let Some(oracle) = grid.oracle_position() else {
        return FALLBACK_SPAWN;
    };
    for radius in SPAWN_RADII {
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let pos = oracle.offset(dx, dy);
                let clear_grass = grid
                    .tile(pos)
                    .is_some_and(|t| t.tile_type == TileType::Grass && !t.has_standing_tree());
                if clear_grass {
                    return pos;
                }
            }
        }
    }
    oracle
}
