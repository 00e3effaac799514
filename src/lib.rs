pub mod modules;

pub use modules::actions::{
    self, ActionCategory, ActionDef, ActionEffect, ActionKind, Job, JobPath, can_execute, execute,
};
pub use modules::builder::{
    ActionReport, Builder, BuilderCommand, BuilderContext, BuilderEvent, NearbyTree,
};
pub use modules::building::{BuildingKind, Buildings};
pub use modules::config::{BrainMode, ProviderConfig, SimConfig, VillageConfig, VillagerSpec};
pub use modules::environment::{
    EnvironmentAnalysis, EnvironmentAnalyzer, EnvironmentMemory, HeuristicAnalyzer,
    TemplateImageSource, TileImageSource, TreeCluster,
};
pub use modules::error::{ActionError, ProviderError, SimError};
pub use modules::grid::{GridPos, GridWorld, Tile, TileType, Tree, TreeOffset};
pub use modules::llm::{Completion, LlmClient, LlmProvider};
pub use modules::oracle::{
    Assignment, BuildAssignment, DecisionPayload, DecisionProvider, RemoteProvider, RuleProvider,
};
pub use modules::resource::{Amount, ResourceKind, ResourcePool};
pub use modules::simulation::{CycleReport, Simulation};
pub use modules::stats::{ActionStats, ActionStatsStore};
pub use modules::view::{
    BuilderStateView, GridState, GridStats, VillageSnapshot, VillagerView, Viewport,
};
pub use modules::village::{DayReport, DirectiveOutcome, TaskRejection, Village, VillageEvent, Villager};
