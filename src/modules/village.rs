use std::fmt;
use std::fmt::Write as _;

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::modules::actions::{self, ActionEffect, ActionKind, Job, MAX_STAMINA};
use crate::modules::building::{BuildingKind, Buildings};
use crate::modules::error::ActionError;
use crate::modules::oracle::DecisionPayload;
use crate::modules::resource::ResourcePool;
use crate::modules::stats::ActionStatsStore;
use crate::modules::view::{VillageSnapshot, VillagerView};

#[derive(Clone, Debug, PartialEq)]
pub struct Villager {
    pub name: String,
    pub job: Job,
    pub job_tier: u8,
    pub stamina: f32,
    pub experience: u32,
    pub assigned_task: Option<ActionKind>,
}

impl Villager {
    pub fn new(name: impl Into<String>, job: Job, job_tier: u8) -> Self {
        Self {
            name: name.into(),
            job,
            job_tier,
            stamina: MAX_STAMINA,
            experience: 0,
            assigned_task: None,
        }
    }

    pub fn view(&self) -> VillagerView {
        VillagerView {
            name: self.name.clone(),
            job: self.job,
            job_tier: self.job_tier,
            stamina: self.stamina,
            experience: self.experience,
            assigned_task: self.assigned_task,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VillageEvent {
    JobChanged {
        name: String,
        from: Job,
        from_tier: u8,
        to: Job,
        to_tier: u8,
    },
    TaskAssigned {
        name: String,
        task: ActionKind,
    },
    BuildAssigned {
        name: String,
        building: BuildingKind,
    },
    Performed {
        name: String,
        action: ActionKind,
        #[serde(skip)]
        effect: ActionEffect,
        summary: String,
    },
    Idle {
        name: String,
    },
}

impl fmt::Display for VillageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VillageEvent::JobChanged {
                name,
                from,
                from_tier,
                to,
                to_tier,
            } => write!(f, "{}: {} (T{}) -> {} (T{})", name, from, from_tier, to, to_tier),
            VillageEvent::TaskAssigned { name, task } => write!(f, "{} assigned {}", name, task),
            VillageEvent::BuildAssigned { name, building } => {
                write!(f, "{} assigned to build {}", name, building)
            }
            VillageEvent::Performed {
                name,
                action,
                summary,
                ..
            } => write!(f, "{} {}: {}", name, action, summary),
            VillageEvent::Idle { name } => write!(f, "{} has no assigned task (idle)", name),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TaskRejection {
    pub name: String,
    #[serde(serialize_with = "display_error")]
    pub error: ActionError,
}

fn display_error<S: serde::Serializer>(error: &ActionError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(error)
}

/// Result of applying one decision payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DirectiveOutcome {
    pub events: Vec<VillageEvent>,
    pub rejections: Vec<TaskRejection>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DayReport {
    pub day: u32,
    pub events: Vec<VillageEvent>,
    pub rejections: Vec<TaskRejection>,
    pub resources: ResourcePool,
    pub buildings: Buildings,
}

/// Villager roster, building counters and the day counter. Resources live in
/// the grid and are borrowed for each day.
#[derive(Clone, Debug)]
pub struct Village {
    villagers: Vec<Villager>,
    buildings: Buildings,
    day: u32,
    stats: ActionStatsStore,
}

impl Default for Village {
    fn default() -> Self {
        let roster = [
            ("Alice", Job::Woodcutter),
            ("Bob", Job::Forager),
            ("Charlie", Job::Miner),
        ];
        Self {
            villagers: roster
                .into_iter()
                .map(|(name, job)| Villager::new(name, job, 1))
                .collect(),
            buildings: Buildings {
                houses: 1,
                ..Buildings::default()
            },
            day: 1,
            stats: ActionStatsStore::default(),
        }
    }
}

impl Village {
    pub fn empty(buildings: Buildings) -> Self {
        Self {
            villagers: Vec::new(),
            buildings,
            day: 1,
            stats: ActionStatsStore::default(),
        }
    }

    pub const fn day(&self) -> u32 {
        self.day
    }

    pub fn villagers(&self) -> &[Villager] {
        &self.villagers
    }

    pub fn villager(&self, name: &str) -> Option<&Villager> {
        self.villagers.iter().find(|v| v.name == name)
    }

    fn villager_mut(&mut self, name: &str) -> Result<&mut Villager, ActionError> {
        self.villagers
            .iter_mut()
            .find(|v| v.name == name)
            .ok_or_else(|| ActionError::ActorNotFound(name.to_string()))
    }

    pub const fn buildings(&self) -> &Buildings {
        &self.buildings
    }

    pub fn stats(&self) -> &ActionStatsStore {
        &self.stats
    }

    /// Appends a fresh villager. Names are unique within the village.
    pub fn add_villager(&mut self, name: &str, job: Job, job_tier: u8) -> Result<(), ActionError> {
        if !(1..=3).contains(&job_tier) {
            return Err(ActionError::InvalidTier(job_tier));
        }
        if self.villager(name).is_some() {
            return Err(ActionError::DuplicateActor(name.to_string()));
        }
        self.villagers.push(Villager::new(name, job, job_tier));
        info!(name, job = %job, job_tier, "villager joined");
        Ok(())
    }

    pub fn remove_villager(&mut self, name: &str) -> Result<Villager, ActionError> {
        let idx = self
            .villagers
            .iter()
            .position(|v| v.name == name)
            .ok_or_else(|| ActionError::ActorNotFound(name.to_string()))?;
        self.stats.forget(name);
        Ok(self.villagers.remove(idx))
    }

    /// Admin override: sets any job and tier without checking the job path.
    pub fn promote_villager(&mut self, name: &str, job: Job, job_tier: u8) -> Result<VillageEvent, ActionError> {
        if !(1..=3).contains(&job_tier) {
            return Err(ActionError::InvalidTier(job_tier));
        }
        let villager = self.villager_mut(name)?;
        let event = VillageEvent::JobChanged {
            name: villager.name.clone(),
            from: villager.job,
            from_tier: villager.job_tier,
            to: job,
            to_tier: job_tier,
        };
        villager.job = job;
        villager.job_tier = job_tier;
        info!("{}", event);
        Ok(event)
    }

    /// Applies job changes and task assignments, then build assignments.
    ///
    /// Without `force` a job change must be the next job on the villager's
    /// path; with `force` any job is accepted and the payload tier is used
    /// when it is valid. Bad entries are reported and skipped.
    pub fn apply_directives(&mut self, decisions: &DecisionPayload, force: bool) -> DirectiveOutcome {
        let mut outcome = DirectiveOutcome::default();
        let reject = |outcome: &mut DirectiveOutcome, name: &str, error: ActionError| {
            warn!(name, %error, "directive skipped");
            outcome.rejections.push(TaskRejection {
                name: name.to_string(),
                error,
            });
        };

        for assignment in &decisions.assignments {
            let name = assignment.name.as_str();
            let villager = match self.villager_mut(name) {
                Ok(v) => v,
                Err(error) => {
                    reject(&mut outcome, name, error);
                    continue;
                }
            };

            if let Some(job_name) = assignment.new_job.as_deref().filter(|s| !s.trim().is_empty()) {
                match job_name.parse::<Job>() {
                    Ok(job) if job != villager.job => {
                        match job_change(villager, job, assignment.job_tier, force) {
                            Ok(tier) => {
                                let event = VillageEvent::JobChanged {
                                    name: villager.name.clone(),
                                    from: villager.job,
                                    from_tier: villager.job_tier,
                                    to: job,
                                    to_tier: tier,
                                };
                                info!("{}", event);
                                villager.job = job;
                                villager.job_tier = tier;
                                outcome.events.push(event);
                            }
                            Err(error) => reject(&mut outcome, name, error),
                        }
                    }
                    Ok(_) => {}
                    Err(error) => reject(&mut outcome, name, error),
                }
            }

            if let Some(task_name) = assignment.task.as_deref().filter(|s| !s.trim().is_empty()) {
                match task_name.parse::<ActionKind>() {
                    Ok(task) => {
                        villager.assigned_task = Some(task);
                        outcome.events.push(VillageEvent::TaskAssigned {
                            name: villager.name.clone(),
                            task,
                        });
                    }
                    Err(error) => {
                        villager.assigned_task = None;
                        reject(&mut outcome, name, error);
                    }
                }
            }
        }

        for build in &decisions.build_actions {
            let name = build.assigned_to.as_str();
            let building = match build.building.parse::<BuildingKind>() {
                Ok(kind) => kind,
                Err(()) => {
                    reject(&mut outcome, name, ActionError::UnknownBuilding(build.building.clone()));
                    continue;
                }
            };
            match self.villager_mut(name) {
                Ok(villager) => {
                    villager.assigned_task = Some(ActionKind::build(building));
                    outcome.events.push(VillageEvent::BuildAssigned {
                        name: villager.name.clone(),
                        building,
                    });
                }
                Err(error) => reject(&mut outcome, name, error),
            }
        }

        outcome
    }

    /// Runs every villager's task in roster order against the live pool, then
    /// advances the day. Tasks stay assigned for following days.
    pub fn execute_day<R: Rng>(&mut self, resources: &mut ResourcePool, rng: &mut R) -> DayReport {
        let day = self.day;
        let mut events = Vec::new();
        let mut rejections = Vec::new();

        for villager in self.villagers.iter_mut() {
            let Some(task) = villager.assigned_task else {
                self.stats.record_idle(&villager.name);
                events.push(VillageEvent::Idle {
                    name: villager.name.clone(),
                });
                continue;
            };
            match actions::execute(task, villager, resources, &mut self.buildings, rng) {
                Ok(effect) => {
                    self.stats.record_action(&villager.name, task);
                    debug!(day, name = %villager.name, action = %task, %effect, "task done");
                    events.push(VillageEvent::Performed {
                        name: villager.name.clone(),
                        action: task,
                        effect,
                        summary: format!(
                            "{} (stamina {:.0}%, exp {})",
                            effect,
                            villager.stamina * 100.0,
                            villager.experience
                        ),
                    });
                }
                Err(error) => {
                    self.stats.record_rejection(&villager.name);
                    debug!(day, name = %villager.name, action = %task, %error, "task rejected");
                    rejections.push(TaskRejection {
                        name: villager.name.clone(),
                        error,
                    });
                }
            }
        }

        self.day += 1;
        info!(day, resources = %resources, buildings = %self.buildings, "day complete");
        DayReport {
            day,
            events,
            rejections,
            resources: *resources,
            buildings: self.buildings,
        }
    }

    pub fn snapshot(&self, resources: &ResourcePool) -> VillageSnapshot {
        VillageSnapshot {
            day: self.day,
            resources: *resources,
            villagers: self.villagers.iter().map(Villager::view).collect(),
            buildings: self.buildings,
        }
    }

    pub fn summary(&self, resources: &ResourcePool) -> String {
        let mut out = format!(
            "Day {}\nResources: {}\nBuildings: {}\nVillagers:\n",
            self.day, resources, self.buildings
        );
        for v in &self.villagers {
            let task = v.assigned_task.map(ActionKind::label).unwrap_or("idle");
            let _ = writeln!(
                out,
                "  {} - {} (T{}) stamina {:.0}% exp {} task {}",
                v.name,
                v.job,
                v.job_tier,
                v.stamina * 100.0,
                v.experience,
                task
            );
        }
        out
    }
}

fn job_change(villager: &Villager, job: Job, requested_tier: Option<u8>, force: bool) -> Result<u8, ActionError> {
    if force {
        return Ok(requested_tier
            .filter(|tier| (1..=3).contains(tier))
            .unwrap_or_else(|| job.tier()));
    }
    if villager.job.next() == Some(job) {
        return Ok(job.tier());
    }
    Err(ActionError::IllegalPromotion {
        name: villager.name.clone(),
        from: villager.job.label(),
        from_tier: villager.job_tier,
        to: job.label(),
        to_tier: requested_tier.unwrap_or_else(|| job.tier()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::oracle::{Assignment, BuildAssignment};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn assign(name: &str, job: Option<&str>, tier: Option<u8>, task: Option<&str>) -> Assignment {
        Assignment {
            name: name.into(),
            new_job: job.map(str::to_string),
            job_tier: tier,
            task: task.map(str::to_string),
        }
    }

    fn payload(assignments: Vec<Assignment>, build_actions: Vec<BuildAssignment>) -> DecisionPayload {
        DecisionPayload {
            assignments,
            build_actions,
        }
    }

    #[test]
    fn default_village_matches_starting_roster() {
        let village = Village::default();
        let names: Vec<&str> = village.villagers().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["Alice", "Bob", "Charlie"]);
        assert_eq!(village.day(), 1);
        assert_eq!(village.buildings().houses, 1);
        assert!(village.villagers().iter().all(|v| v.job_tier == 1 && v.stamina == 1.0));
    }

    #[test]
    fn both_choppers_add_to_empty_pool() {
        let mut village = Village::empty(Buildings::default());
        village.add_villager("A", Job::Woodcutter, 1).unwrap();
        village.add_villager("B", Job::Woodcutter, 1).unwrap();
        village.apply_directives(
            &payload(
                vec![
                    assign("A", None, None, Some("chop_wood")),
                    assign("B", None, None, Some("chop_wood")),
                ],
                vec![],
            ),
            false,
        );

        let mut pool = ResourcePool::default();
        let mut rng = StdRng::seed_from_u64(4);
        let report = village.execute_day(&mut pool, &mut rng);

        assert!(report.rejections.is_empty());
        let total: u32 = report
            .events
            .iter()
            .map(|e| match e {
                VillageEvent::Performed {
                    effect: ActionEffect::Gathered { amount, .. },
                    ..
                } => *amount,
                _ => 0,
            })
            .sum();
        assert_eq!(pool.wood, total);
        assert!(pool.wood >= 16);
        assert_eq!(report.day, 1);
        assert_eq!(village.day(), 2);
    }

    #[test]
    fn earlier_builder_can_starve_later_one() {
        let mut village = Village::empty(Buildings::default());
        village.add_villager("First", Job::Builder, 3).unwrap();
        village.add_villager("Second", Job::Engineer, 3).unwrap();
        village.apply_directives(
            &payload(
                vec![],
                vec![
                    BuildAssignment {
                        building: "house".into(),
                        assigned_to: "First".into(),
                    },
                    BuildAssignment {
                        building: "house".into(),
                        assigned_to: "Second".into(),
                    },
                ],
            ),
            false,
        );
        let mut pool = ResourcePool::new(60, 40, 0);
        let report = village.execute_day(&mut pool, &mut StdRng::seed_from_u64(1));
        assert_eq!(report.buildings.houses, 1);
        assert_eq!(report.rejections.len(), 1);
        assert_eq!(report.rejections[0].name, "Second");
        assert_eq!(pool, ResourcePool::new(10, 10, 0));
    }

    #[test]
    fn idle_villagers_change_nothing() {
        let mut village = Village::default();
        let mut pool = ResourcePool::new(5, 5, 5);
        let report = village.execute_day(&mut pool, &mut StdRng::seed_from_u64(1));
        assert_eq!(report.events.len(), 3);
        assert!(report.events.iter().all(|e| matches!(e, VillageEvent::Idle { .. })));
        assert_eq!(pool, ResourcePool::new(5, 5, 5));
        assert_eq!(village.stats().get("Alice").unwrap().idle_count, 1);
    }

    #[test]
    fn unknown_names_are_skipped() {
        let mut village = Village::default();
        let outcome = village.apply_directives(
            &payload(
                vec![
                    assign("Zed", Some("miner"), Some(1), Some("mine_stone")),
                    assign("Alice", None, None, Some("chop_wood")),
                ],
                vec![BuildAssignment {
                    building: "castle".into(),
                    assigned_to: "Alice".into(),
                }],
            ),
            false,
        );
        assert_eq!(outcome.rejections.len(), 2);
        assert!(matches!(outcome.rejections[0].error, ActionError::ActorNotFound(_)));
        assert!(matches!(outcome.rejections[1].error, ActionError::UnknownBuilding(_)));
        assert_eq!(village.villager("Alice").unwrap().assigned_task, Some(ActionKind::ChopWood));
    }

    #[test]
    fn build_action_overrides_assignment_task() {
        let mut village = Village::default();
        village.promote_villager("Alice", Job::Builder, 3).unwrap();
        village.apply_directives(
            &payload(
                vec![assign("Alice", Some("builder"), Some(3), Some("chop_wood"))],
                vec![BuildAssignment {
                    building: "workshop".into(),
                    assigned_to: "Alice".into(),
                }],
            ),
            false,
        );
        assert_eq!(
            village.villager("Alice").unwrap().assigned_task,
            Some(ActionKind::BuildWorkshop)
        );
    }

    #[test]
    fn illegal_job_change_needs_force() {
        let mut village = Village::default();
        let jump = payload(vec![assign("Alice", Some("engineer"), Some(3), None)], vec![]);

        let outcome = village.apply_directives(&jump, false);
        assert!(matches!(outcome.rejections[0].error, ActionError::IllegalPromotion { .. }));
        assert_eq!(village.villager("Alice").unwrap().job, Job::Woodcutter);

        let outcome = village.apply_directives(&jump, true);
        assert!(outcome.rejections.is_empty());
        let alice = village.villager("Alice").unwrap();
        assert_eq!((alice.job, alice.job_tier), (Job::Engineer, 3));
    }

    #[test]
    fn path_promotion_uses_job_tier() {
        let mut village = Village::default();
        let outcome = village.apply_directives(
            &payload(vec![assign("Bob", Some("farmer"), Some(1), Some("farm_crops"))], vec![]),
            false,
        );
        assert!(outcome.rejections.is_empty());
        let bob = village.villager("Bob").unwrap();
        assert_eq!((bob.job, bob.job_tier), (Job::Farmer, 2));
    }

    #[test]
    fn unknown_task_clears_assignment() {
        let mut village = Village::default();
        village.apply_directives(&payload(vec![assign("Charlie", None, None, Some("mine_stone"))], vec![]), false);
        let outcome =
            village.apply_directives(&payload(vec![assign("Charlie", None, None, Some("dig_gold"))], vec![]), false);
        assert!(matches!(outcome.rejections[0].error, ActionError::UnknownAction(_)));
        assert_eq!(village.villager("Charlie").unwrap().assigned_task, None);
    }

    #[test]
    fn roster_management() {
        let mut village = Village::default();
        assert!(matches!(
            village.add_villager("Alice", Job::Miner, 1),
            Err(ActionError::DuplicateActor(_))
        ));
        assert!(matches!(
            village.add_villager("Dana", Job::Miner, 4),
            Err(ActionError::InvalidTier(4))
        ));
        village.add_villager("Dana", Job::Chef, 3).unwrap();
        assert_eq!(village.villagers().len(), 4);
        let removed = village.remove_villager("Bob").unwrap();
        assert_eq!(removed.job, Job::Forager);
        assert!(village.remove_villager("Bob").is_err());
    }

    #[test]
    fn snapshot_and_summary_reflect_state() {
        let village = Village::default();
        let pool = ResourcePool::new(50, 20, 50);
        let snapshot = village.snapshot(&pool);
        assert_eq!(snapshot.day, 1);
        assert_eq!(snapshot.villagers.len(), 3);
        assert_eq!(snapshot.resources, pool);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["villagers"][0]["job"], "woodcutter");

        let summary = village.summary(&pool);
        assert!(summary.contains("Alice - woodcutter (T1)"));
        assert!(summary.contains("wood=50 stone=20 food=50"));
    }
}
