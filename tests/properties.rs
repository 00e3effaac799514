use oracle_village::{
    ActionKind, Buildings, GridWorld, Job, ResourcePool, Villager, actions,
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn any_action() -> impl Strategy<Value = ActionKind> {
    prop::sample::select(ActionKind::ALL.to_vec())
}

fn any_job() -> impl Strategy<Value = Job> {
    prop::sample::select(vec![
        Job::Woodcutter,
        Job::Lumberjack,
        Job::Builder,
        Job::Forager,
        Job::Farmer,
        Job::Chef,
        Job::Miner,
        Job::Excavator,
        Job::Engineer,
    ])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn tree_ids_are_dense_and_unique(seed in any::<u64>(), size in 1i32..24) {
        let mut rng = StdRng::seed_from_u64(seed);
        let grid = GridWorld::new(size, &mut rng);
        let mut ids: Vec<u64> = grid.trees().map(|t| t.id).collect();
        // Tiles are generated in x-major order, so ids already ascend.
        prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
        ids.dedup();
        prop_assert_eq!(ids.len() as u64, grid.trees_placed());
        prop_assert!(ids.iter().copied().eq(0..grid.trees_placed()));
    }

    #[test]
    fn each_tree_is_cut_at_most_once(seed in any::<u64>(), picks in prop::collection::vec(any::<prop::sample::Index>(), 1..40)) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut grid = GridWorld::new(10, &mut rng);
        let trees: Vec<_> = grid
            .tiles()
            .iter()
            .flat_map(|tile| tile.trees.iter().map(move |t| (tile.pos(), t.id)))
            .collect();
        prop_assume!(!trees.is_empty());

        let mut cut = std::collections::HashSet::new();
        let mut wood = 0;
        for pick in picks {
            let (pos, id) = trees[pick.index(trees.len())];
            match grid.cut_tree(pos, id, &mut rng) {
                Ok(amount) => {
                    prop_assert!(cut.insert(id), "tree {} cut twice", id);
                    prop_assert!((5..=15).contains(&amount));
                    wood += amount;
                }
                Err(_) => prop_assert!(cut.contains(&id)),
            }
        }
        prop_assert_eq!(grid.resources().wood, wood);
        prop_assert_eq!(grid.stats().trees_cut, cut.len() as u64);
    }

    #[test]
    fn rejected_actions_change_nothing(
        seed in any::<u64>(),
        job in any_job(),
        tier in 1u8..=3,
        start in (0u32..150, 0u32..150, 0u32..150),
        plan in prop::collection::vec(any_action(), 1..60),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut villager = Villager::new("Prop", job, tier);
        let mut pool = ResourcePool::new(start.0, start.1, start.2);
        let mut buildings = Buildings::default();

        for action in plan {
            let before = (pool, buildings, villager.clone());
            let allowed = actions::can_execute(action, &villager, &pool).is_ok();
            match actions::execute(action, &mut villager, &mut pool, &mut buildings, &mut rng) {
                Ok(_) => {
                    prop_assert!(allowed);
                    prop_assert!(buildings.houses >= before.1.houses);
                    prop_assert!(villager.experience >= before.2.experience);
                    prop_assert!(villager.experience <= 100);
                    prop_assert!((0.0..=1.0).contains(&villager.stamina));
                }
                Err(_) => {
                    prop_assert!(!allowed);
                    prop_assert_eq!(pool, before.0);
                    prop_assert_eq!(buildings, before.1);
                    prop_assert_eq!(&villager, &before.2);
                }
            }
        }
    }
}
