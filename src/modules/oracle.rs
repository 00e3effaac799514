use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_toon::to_string_pretty;
use tracing::{debug, warn};

use crate::modules::actions::{ActionKind, Job, JobPath};
use crate::modules::builder::{BuilderCommand, BuilderContext, CUT_RANGE};
use crate::modules::error::ProviderError;
use crate::modules::llm::{Completion, truncate};
use crate::modules::resource::ResourcePool;
use crate::modules::view::{VillageSnapshot, VillagerView};

/// Stamina below which a villager is always sent to rest.
pub const REST_THRESHOLD: f32 = 0.2;
/// Experience needed to move from tier 1 to tier 2.
pub const TIER_TWO_EXPERIENCE: u32 = 70;

pub const VILLAGE_SYSTEM_PROMPT: &str = "You are The Oracle, the governor of an autonomous village simulation. \
Make rational, resource-based decisions. Job paths: wood (woodcutter T1 -> lumberjack T2 -> builder T3), \
food (forager T1 -> farmer T2 -> chef T3), stone (miner T1 -> excavator T2 -> engineer T3). \
Tasks: chop_wood, gather_food, mine_stone, cook_food, farm_crops, build_house, build_workshop, build_farm, rest. \
Any villager with stamina < 0.2 must rest. Promote only one tier at a time along a path. \
Reply ONLY with JSON: {\"assignments\":[{\"name\":str,\"new_job\":str,\"job_tier\":1|2|3,\"task\":str}],\
\"build_actions\":[{\"building\":\"house|workshop|farm\",\"assigned_to\":str}]}";

pub const DIRECTIVE_SYSTEM_PROMPT: &str = "You are the Oracle, the strategic decision-maker for Builder agents in a village simulation. \
Give one high-level goal for the builder based on its state and the village's needs. \
Reply ONLY as `DIRECTIVE: <strategic goal>`, with no coordinates and no multiple steps.";

pub const ACTION_SYSTEM_PROMPT: &str = "You are a Builder agent on a tile grid. Available actions: \
TALK \"message\", WALK x,y, CUT x,y,tree_id (tree at distance <= 1), BUILD type,x,y (house|workshop|farm, distance <= 2). \
Reply with exactly ONE action command and nothing else.";

/// One villager's job and task for the coming day.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub name: String,
    #[serde(default)]
    pub new_job: Option<String>,
    #[serde(default)]
    pub job_tier: Option<u8>,
    #[serde(default)]
    pub task: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildAssignment {
    pub building: String,
    pub assigned_to: String,
}

/// Wire shape shared by the rule engine and remote models.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionPayload {
    #[serde(default)]
    pub assignments: Vec<Assignment>,
    #[serde(default)]
    pub build_actions: Vec<BuildAssignment>,
}

/// Source of village decisions, builder directives and builder actions.
pub trait DecisionProvider {
    fn name(&self) -> &'static str;
    fn village_decision(&self, snapshot: &VillageSnapshot) -> DecisionPayload;
    fn builder_directive(&self, context: &BuilderContext) -> String;
    /// Action string for the builder; `directive` is the strategic goal when
    /// one was consulted.
    fn builder_action(&self, context: &BuilderContext, directive: Option<&str>) -> String;
}

/// Deterministic policy that needs no network.
#[derive(Clone, Copy, Debug, Default)]
pub struct RuleProvider;

impl DecisionProvider for RuleProvider {
    fn name(&self) -> &'static str {
        "rules"
    }

    fn village_decision(&self, snapshot: &VillageSnapshot) -> DecisionPayload {
        decide(snapshot)
    }

    fn builder_directive(&self, context: &BuilderContext) -> String {
        strategic_directive(context).to_string()
    }

    fn builder_action(&self, context: &BuilderContext, directive: Option<&str>) -> String {
        match directive {
            Some(directive) => tactical_action(context, directive),
            None => heuristic_action(context),
        }
    }
}

pub fn decide(snapshot: &VillageSnapshot) -> DecisionPayload {
    let resources = &snapshot.resources;
    let mut payload = DecisionPayload::default();

    for villager in &snapshot.villagers {
        if villager.stamina < REST_THRESHOLD {
            payload.assignments.push(Assignment {
                name: villager.name.clone(),
                new_job: Some(villager.job.label().to_string()),
                job_tier: Some(villager.job_tier),
                task: Some(ActionKind::Rest.label().to_string()),
            });
            continue;
        }

        let (job, tier) = promotion(villager, resources);
        let task = assign_task(job, tier, resources);
        payload.assignments.push(Assignment {
            name: villager.name.clone(),
            new_job: Some(job.label().to_string()),
            job_tier: Some(tier),
            task: Some(task.label().to_string()),
        });

        if tier == 3 && task.is_build() {
            if let Some(building) = task.label().strip_prefix("build_") {
                payload.build_actions.push(BuildAssignment {
                    building: building.to_string(),
                    assigned_to: villager.name.clone(),
                });
            }
        }
    }

    debug!(
        assignments = payload.assignments.len(),
        builds = payload.build_actions.len(),
        "rule decision"
    );
    payload
}

/// Next job and tier for a villager, or the current ones.
pub fn promotion(villager: &VillagerView, resources: &ResourcePool) -> (Job, u8) {
    let current = (villager.job, villager.job_tier);
    let Some(next) = villager.job.next() else {
        return current;
    };
    if villager.job_tier != villager.job.tier() {
        return current;
    }
    let path = villager.job.path();
    let ready = match villager.job_tier {
        1 => villager.experience > TIER_TWO_EXPERIENCE,
        2 => {
            let (experience, stock) = match path {
                JobPath::Wood => (85, 200),
                JobPath::Food => (90, 200),
                JobPath::Stone => (90, 150),
            };
            villager.experience > experience && resources.get(path.resource()) > stock
        }
        _ => false,
    };
    if ready { (next, next.tier()) } else { current }
}

pub fn assign_task(job: Job, tier: u8, resources: &ResourcePool) -> ActionKind {
    let ResourcePool { wood, stone, food } = *resources;

    if tier == 3 {
        match job {
            Job::Builder if wood >= 200 => return ActionKind::BuildHouse,
            Job::Engineer if stone >= 150 && wood >= 100 => return ActionKind::BuildWorkshop,
            Job::Chef if food >= 180 => {
                return if food > 50 {
                    ActionKind::CookFood
                } else {
                    ActionKind::GatherFood
                };
            }
            _ => {}
        }
    }

    match job.path() {
        JobPath::Wood if wood < 100 => return ActionKind::ChopWood,
        JobPath::Food if food < 100 => {
            return if job == Job::Forager {
                ActionKind::GatherFood
            } else {
                ActionKind::FarmCrops
            };
        }
        JobPath::Stone if stone < 80 => return ActionKind::MineStone,
        _ => {}
    }

    match job {
        Job::Woodcutter | Job::Lumberjack | Job::Builder => ActionKind::ChopWood,
        Job::Forager => ActionKind::GatherFood,
        Job::Farmer => ActionKind::FarmCrops,
        Job::Chef => ActionKind::CookFood,
        Job::Miner | Job::Excavator | Job::Engineer => ActionKind::MineStone,
    }
}

pub fn strategic_directive(context: &BuilderContext) -> &'static str {
    if context.inventory.wood < 50 {
        "Gather wood from nearby trees"
    } else if context.nearby_trees.is_empty() {
        "Explore and find resource-rich areas"
    } else if context.inventory.stone > 50 {
        "Build structures for the village"
    } else {
        "Gather resources for village development"
    }
}

/// Cut the nearest tree while short on wood, build a house once
/// rich, otherwise report.
pub fn heuristic_action(context: &BuilderContext) -> String {
    if context.inventory.wood < 50 {
        return cut_or_walk(context);
    }
    if context.inventory.wood >= 100 {
        return build_house_nearby(context);
    }
    "TALK \"Gathering resources for the village\"".to_string()
}

/// Maps a strategic directive onto a concrete action without a model.
pub fn tactical_action(context: &BuilderContext, directive: &str) -> String {
    let lower = directive.to_lowercase();
    if ["wood", "gather", "tree"].iter().any(|w| lower.contains(w)) {
        cut_or_walk(context)
    } else if lower.contains("build") {
        let can_afford = context
            .inventory
            .shortfall(&crate::modules::building::BuildingKind::House.builder_cost())
            .is_none();
        if can_afford {
            build_house_nearby(context)
        } else {
            "TALK \"Preparing to build as the Oracle commands\"".to_string()
        }
    } else if lower.contains("explore") {
        walk_east(context)
    } else if lower.contains("rest") {
        "TALK \"Resting as the Oracle advises\"".to_string()
    } else {
        format!("TALK \"Acknowledged: {}\"", directive.replace('"', "'"))
    }
}

/// Cuts the nearest neighbouring tree, stepping onto its tile first when it
/// is only diagonally adjacent.
fn cut_or_walk(context: &BuilderContext) -> String {
    let nearest = context
        .nearby_trees
        .iter()
        .min_by_key(|tree| context.position.manhattan(tree.position));
    match nearest {
        Some(tree) if context.position.manhattan(tree.position) <= CUT_RANGE => {
            format!("CUT {},{},{}", tree.position.x, tree.position.y, tree.tree_id)
        }
        Some(tree) => format!("WALK {},{}", tree.position.x, tree.position.y),
        None => walk_east(context),
    }
}

fn walk_east(context: &BuilderContext) -> String {
    let x = (context.position.x + 2).min(context.grid_size - 1);
    format!("WALK {},{}", x, context.position.y)
}

fn build_house_nearby(context: &BuilderContext) -> String {
    let x = (context.position.x + 1).min(context.grid_size - 1);
    format!("BUILD house,{},{}", x, context.position.y)
}

/// Asks a chat model first and falls back to the rule policy on any failure.
#[derive(Clone, Debug)]
pub struct RemoteProvider<C: Completion> {
    client: C,
    fallback: RuleProvider,
}

impl<C: Completion> RemoteProvider<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            fallback: RuleProvider,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn ask<T>(&self, what: &str, system: &str, user: &str, parse: impl FnOnce(&str) -> Result<T, ProviderError>) -> Option<T> {
        let result = self.client.complete(system, user).and_then(|reply| {
            debug!(what, reply = %truncate(&reply, 120), "model reply");
            parse(&reply)
        });
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(what, error = %err, "model unavailable; using rules");
                None
            }
        }
    }
}

impl<C: Completion> DecisionProvider for RemoteProvider<C> {
    fn name(&self) -> &'static str {
        "llm"
    }

    fn village_decision(&self, snapshot: &VillageSnapshot) -> DecisionPayload {
        let prompt = village_prompt(snapshot);
        self.ask("village decision", VILLAGE_SYSTEM_PROMPT, &prompt, parse_decision)
            .unwrap_or_else(|| self.fallback.village_decision(snapshot))
    }

    fn builder_directive(&self, context: &BuilderContext) -> String {
        let prompt = format!("Builder Information:\n{}", context);
        self.ask("builder directive", DIRECTIVE_SYSTEM_PROMPT, &prompt, parse_directive)
            .unwrap_or_else(|| self.fallback.builder_directive(context))
    }

    fn builder_action(&self, context: &BuilderContext, directive: Option<&str>) -> String {
        let prompt = match directive {
            Some(directive) => format!(
                "The Oracle has given you this directive:\n\"{}\"\n\nYour current state:\n{}\nOutput your NEXT SPECIFIC ACTION.",
                directive, context
            ),
            None => format!("Your current state:\n{}\nOutput your NEXT SPECIFIC ACTION.", context),
        };
        self.ask("builder action", ACTION_SYSTEM_PROMPT, &prompt, parse_action_reply)
            .unwrap_or_else(|| self.fallback.builder_action(context, directive))
    }
}

fn village_prompt(snapshot: &VillageSnapshot) -> String {
    let payload = json!({
        "day": snapshot.day,
        "resources": snapshot.resources,
        "buildings": snapshot.buildings,
        "villagers": snapshot.villagers,
        "reply": { "assignments": "one per villager", "build_actions": "optional" }
    });
    let toon = to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string());
    format!("Current village state:\n{toon}\n\nMake your decisions:")
}

/// Accepts bare JSON, a fenced code block, or the outermost `{...}` slice.
pub fn parse_decision(text: &str) -> Result<DecisionPayload, ProviderError> {
    let text = text.trim();
    if let Ok(payload) = serde_json::from_str::<DecisionPayload>(text) {
        return Ok(payload);
    }
    if let Some(body) = fenced(text) {
        if let Ok(payload) = serde_json::from_str::<DecisionPayload>(body) {
            return Ok(payload);
        }
    }
    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return Err(ProviderError::Decode(format!("no JSON object in reply: {}", truncate(text, 80))));
    };
    if end < start {
        return Err(ProviderError::Decode(format!("no JSON object in reply: {}", truncate(text, 80))));
    }
    serde_json::from_str::<DecisionPayload>(&text[start..=end])
        .map_err(|e| ProviderError::Decode(e.to_string()))
}

fn fenced(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    let after = after.strip_prefix("json").unwrap_or(after);
    let end = after.find("```")?;
    Some(after[..end].trim())
}

pub fn parse_directive(text: &str) -> Result<String, ProviderError> {
    let text = text.trim();
    let directive = match text.find("DIRECTIVE:") {
        Some(idx) => &text[idx + "DIRECTIVE:".len()..],
        None => text,
    };
    let directive = directive.lines().next().unwrap_or("").trim();
    if directive.is_empty() {
        return Err(ProviderError::EmptyReply);
    }
    Ok(directive.to_string())
}

/// First line of the reply that is a valid builder action.
pub fn parse_action_reply(text: &str) -> Result<String, ProviderError> {
    text.lines()
        .map(|line| line.trim().trim_matches('`').trim())
        .find(|line| line.parse::<BuilderCommand>().is_ok())
        .map(str::to_string)
        .ok_or_else(|| ProviderError::Decode(format!("no builder action in reply: {}", truncate(text.trim(), 80))))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::modules::building::Buildings;
    use crate::modules::builder::NearbyTree;
    use crate::modules::grid::{GridPos, TileType};

    fn view(name: &str, job: Job, tier: u8, experience: u32, stamina: f32) -> VillagerView {
        VillagerView {
            name: name.into(),
            job,
            job_tier: tier,
            stamina,
            experience,
            assigned_task: None,
        }
    }

    fn snapshot(resources: ResourcePool, villagers: Vec<VillagerView>) -> VillageSnapshot {
        VillageSnapshot {
            day: 1,
            resources,
            villagers,
            buildings: Buildings::default(),
        }
    }

    fn context(wood: u32, stone: u32, trees: bool) -> BuilderContext {
        BuilderContext {
            agent_id: "builder_1".into(),
            position: GridPos::new(5, 5),
            tile_type: Some(TileType::Grass),
            inventory: ResourcePool::new(wood, stone, 0),
            nearby_tiles: 9,
            nearby_trees: if trees {
                vec![NearbyTree {
                    position: GridPos::new(5, 6),
                    tree_id: 42,
                    species: "oak".into(),
                }]
            } else {
                Vec::new()
            },
            current_task: None,
            grid_size: 10,
        }
    }

    #[test]
    fn lumberjack_becomes_builder_and_builds() {
        let decision = decide(&snapshot(
            ResourcePool::new(250, 0, 0),
            vec![view("Ada", Job::Lumberjack, 2, 90, 1.0)],
        ));
        assert_eq!(
            decision.assignments,
            vec![Assignment {
                name: "Ada".into(),
                new_job: Some("builder".into()),
                job_tier: Some(3),
                task: Some("build_house".into()),
            }]
        );
        assert_eq!(
            decision.build_actions,
            vec![BuildAssignment {
                building: "house".into(),
                assigned_to: "Ada".into()
            }]
        );
    }

    #[test]
    fn exhausted_villager_rests_regardless() {
        let decision = decide(&snapshot(
            ResourcePool::new(0, 0, 0),
            vec![view("Tired", Job::Woodcutter, 1, 99, 0.19)],
        ));
        let a = &decision.assignments[0];
        assert_eq!(a.task.as_deref(), Some("rest"));
        assert_eq!(a.new_job.as_deref(), Some("woodcutter"));
        assert!(decision.build_actions.is_empty());
    }

    #[test]
    fn promotion_thresholds_are_strict() {
        let pool = ResourcePool::new(0, 151, 201);
        assert_eq!(promotion(&view("a", Job::Miner, 1, 70, 1.0), &pool), (Job::Miner, 1));
        assert_eq!(promotion(&view("a", Job::Miner, 1, 71, 1.0), &pool), (Job::Excavator, 2));
        assert_eq!(promotion(&view("a", Job::Excavator, 2, 90, 1.0), &pool), (Job::Excavator, 2));
        assert_eq!(promotion(&view("a", Job::Excavator, 2, 91, 1.0), &pool), (Job::Engineer, 3));
        assert_eq!(promotion(&view("a", Job::Farmer, 2, 91, 1.0), &pool), (Job::Chef, 3));
        assert_eq!(
            promotion(&view("a", Job::Lumberjack, 2, 99, 1.0), &pool),
            (Job::Lumberjack, 2)
        );
        assert_eq!(promotion(&view("a", Job::Chef, 3, 100, 1.0), &pool), (Job::Chef, 3));
    }

    #[test]
    fn task_rules_follow_priority_order() {
        let pool = |w, s, f| ResourcePool::new(w, s, f);
        assert_eq!(assign_task(Job::Engineer, 3, &pool(100, 150, 0)), ActionKind::BuildWorkshop);
        assert_eq!(assign_task(Job::Engineer, 3, &pool(99, 150, 0)), ActionKind::MineStone);
        assert_eq!(assign_task(Job::Chef, 3, &pool(0, 0, 180)), ActionKind::CookFood);
        assert_eq!(assign_task(Job::Chef, 3, &pool(0, 0, 99)), ActionKind::FarmCrops);
        assert_eq!(assign_task(Job::Forager, 1, &pool(0, 0, 99)), ActionKind::GatherFood);
        assert_eq!(assign_task(Job::Builder, 3, &pool(150, 0, 0)), ActionKind::ChopWood);
        assert_eq!(assign_task(Job::Miner, 1, &pool(0, 500, 500)), ActionKind::MineStone);
        assert_eq!(assign_task(Job::Farmer, 2, &pool(0, 0, 500)), ActionKind::FarmCrops);
    }

    #[test]
    fn repeated_rule_cycles_never_demote() {
        let mut v = view("Eve", Job::Woodcutter, 1, 0, 1.0);
        let pool = ResourcePool::new(500, 500, 500);
        let mut last_tier = v.job_tier;
        for exp in (0..=100).step_by(5) {
            v.experience = exp;
            let (job, tier) = promotion(&v, &pool);
            assert!(tier >= last_tier);
            v.job = job;
            v.job_tier = tier;
            last_tier = tier;
        }
        assert_eq!((v.job, v.job_tier), (Job::Builder, 3));
    }

    #[test]
    fn builder_directive_rules() {
        assert_eq!(strategic_directive(&context(10, 100, true)), "Gather wood from nearby trees");
        assert_eq!(strategic_directive(&context(60, 100, false)), "Explore and find resource-rich areas");
        assert_eq!(strategic_directive(&context(60, 51, true)), "Build structures for the village");
        assert_eq!(strategic_directive(&context(60, 10, true)), "Gather resources for village development");
    }

    #[test]
    fn heuristic_cuts_walks_builds_or_talks() {
        assert_eq!(heuristic_action(&context(0, 0, true)), "CUT 5,6,42");
        assert_eq!(heuristic_action(&context(0, 0, false)), "WALK 7,5");
        assert_eq!(heuristic_action(&context(120, 0, true)), "BUILD house,6,5");
        assert_eq!(
            heuristic_action(&context(70, 0, true)),
            "TALK \"Gathering resources for the village\""
        );
        let mut diagonal = context(0, 0, true);
        diagonal.nearby_trees[0].position = GridPos::new(6, 6);
        assert_eq!(heuristic_action(&diagonal), "WALK 6,6");
        let mut edge = context(0, 0, false);
        edge.position = GridPos::new(9, 2);
        assert_eq!(heuristic_action(&edge), "WALK 9,2");
    }

    #[test]
    fn tactical_rules_follow_directive_intent() {
        assert_eq!(tactical_action(&context(0, 0, true), "Gather wood from nearby trees"), "CUT 5,6,42");
        assert_eq!(tactical_action(&context(60, 30, true), "Build structures"), "BUILD house,6,5");
        assert!(tactical_action(&context(10, 0, true), "Build structures").starts_with("TALK"));
        assert_eq!(tactical_action(&context(60, 0, false), "Explore the east"), "WALK 7,5");
        assert_eq!(
            tactical_action(&context(60, 0, false), "Sing a song"),
            "TALK \"Acknowledged: Sing a song\""
        );
    }

    #[test]
    fn decision_parsing_accepts_common_wrappings() {
        let raw = r#"{"assignments":[{"name":"Alice","new_job":"woodcutter","job_tier":1,"task":"chop_wood"}],"build_actions":[]}"#;
        assert_eq!(parse_decision(raw).unwrap().assignments.len(), 1);

        let fenced = format!("Here you go:\n```json\n{}\n```", raw);
        assert_eq!(parse_decision(&fenced).unwrap().assignments[0].name, "Alice");

        let chatty = format!("Sure! {} Hope this helps.", raw);
        assert_eq!(parse_decision(&chatty).unwrap().assignments[0].task.as_deref(), Some("chop_wood"));

        assert!(parse_decision("no json here").is_err());
        assert!(parse_decision("} backwards {").is_err());
    }

    #[test]
    fn directive_prefix_is_stripped() {
        assert_eq!(parse_directive("DIRECTIVE: Gather wood\nbecause").unwrap(), "Gather wood");
        assert_eq!(parse_directive("Explore east").unwrap(), "Explore east");
        assert!(parse_directive("DIRECTIVE:   ").is_err());
    }

    #[test]
    fn action_reply_must_parse() {
        assert_eq!(parse_action_reply("Thinking...\n`WALK 3,4`").unwrap(), "WALK 3,4");
        assert!(parse_action_reply("I would like to dance").is_err());
    }

    struct Canned {
        reply: Result<&'static str, ()>,
        calls: Cell<usize>,
    }

    impl Canned {
        fn new(reply: Result<&'static str, ()>) -> Self {
            Self {
                reply,
                calls: Cell::new(0),
            }
        }
    }

    impl Completion for Canned {
        fn complete(&self, _system: &str, _user: &str) -> Result<String, ProviderError> {
            self.calls.set(self.calls.get() + 1);
            self.reply
                .map(str::to_string)
                .map_err(|()| ProviderError::Status {
                    status: 503,
                    body: "overloaded".into(),
                })
        }
    }

    #[test]
    fn remote_failure_falls_back_to_rules() {
        let snap = snapshot(
            ResourcePool::new(50, 20, 50),
            vec![view("Alice", Job::Woodcutter, 1, 0, 1.0)],
        );
        let remote = RemoteProvider::new(Canned::new(Err(())));
        assert_eq!(remote.village_decision(&snap), RuleProvider.village_decision(&snap));
        let ctx = context(0, 0, true);
        assert_eq!(remote.builder_directive(&ctx), "Gather wood from nearby trees");
        assert_eq!(remote.builder_action(&ctx, None), "CUT 5,6,42");
        assert_eq!(remote.client().calls.get(), 3);
    }

    #[test]
    fn malformed_reply_falls_back_to_rules() {
        let snap = snapshot(
            ResourcePool::new(50, 20, 50),
            vec![view("Bob", Job::Forager, 1, 0, 1.0)],
        );
        let remote = RemoteProvider::new(Canned::new(Ok("the village is lovely today")));
        assert_eq!(remote.village_decision(&snap), decide(&snap));
        let ctx = context(0, 0, false);
        assert_eq!(remote.builder_action(&ctx, Some("Explore")), "WALK 7,5");
    }

    #[test]
    fn remote_reply_is_used_when_valid() {
        let remote = RemoteProvider::new(Canned::new(Ok(
            "```json\n{\"assignments\":[{\"name\":\"Bob\",\"task\":\"rest\"}]}\n```",
        )));
        let snap = snapshot(ResourcePool::default(), vec![view("Bob", Job::Forager, 1, 0, 1.0)]);
        let decision = remote.village_decision(&snap);
        assert_eq!(decision.assignments[0].task.as_deref(), Some("rest"));
        assert_eq!(decision.assignments[0].new_job, None);
        assert!(decision.build_actions.is_empty());
    }
}
