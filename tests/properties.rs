use cyberfield::prelude::*;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

fn mesh(seed: u64, size: usize) -> Network {
    let mut rng = StdRng::seed_from_u64(seed);
    generators::mesh(size, 0.2, 0.2, 0.8, &mut rng).unwrap()
}

fn mode(seed: u64) -> GameMode {
    let mut mode = GameMode::default().with_seed(seed).with_max_steps(40).with_deceptive_nodes(2);
    mode.red.action_set.spread.enabled = true;
    mode.red.action_set.random_infect.enabled = true;
    mode.red.action_set.zero_day.enabled = true;
    mode.red.action_set.zero_day.days_required = 3;
    mode
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn state_stays_consistent(seed in 0u64..10_000, size in 4usize..12, actions in prop::collection::vec(0usize..400, 1..40)) {
        let mut env = Environment::new(mode(seed), mesh(seed, size)).unwrap();
        env.reset().unwrap();
        for action in actions {
            let step = env.step(action).unwrap();
            for node in env.network_interface().network().nodes() {
                let v = node.vulnerability_score();
                prop_assert!((0.0..=1.0).contains(&v));
                // blue never believes a safe node is compromised
                prop_assert!(!node.blue_view_compromised || node.true_compromised);
            }
            prop_assert!(step.observation.iter().all(|x| (-1.0..=1.0).contains(x)));
            if step.done {
                break;
            }
        }
    }

    #[test]
    fn isolate_then_reconnect_is_exact(seed in 0u64..10_000, size in 3usize..15, pick in 0usize..15) {
        let mut rng = StdRng::seed_from_u64(seed);
        let network = mesh(seed, size);
        let mut ni = NetworkInterface::new(Arc::new(GameMode::default()), network, &mut rng).unwrap();
        let id = NodeId::new((pick % size) as u32);
        let before = ni.network().edges();
        let neighbours = ni.base_network().neighbours(id);

        ni.isolate_node(id).unwrap();
        prop_assert!(ni.connected_nodes(id).is_empty());
        ni.reconnect_node(id).unwrap();
        prop_assert_eq!(ni.network().edges(), before);
        prop_assert_eq!(ni.connected_nodes(id), neighbours);
    }

    #[test]
    fn make_node_safe_is_idempotent(seed in 0u64..10_000, pick in 0usize..8) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut ni = NetworkInterface::new(Arc::new(GameMode::default()), mesh(seed, 8), &mut rng).unwrap();
        let id = NodeId::new(pick as u32);
        ni.attack_node(id, 1.0, true, true, &mut rng).unwrap();

        ni.make_node_safe(id).unwrap();
        let once = ni.snapshot();
        ni.make_node_safe(id).unwrap();
        prop_assert_eq!(ni.snapshot(), once);
    }

    #[test]
    fn episodes_replay_exactly(seed in 0u64..10_000, actions in prop::collection::vec(0usize..400, 1..25)) {
        let play = || {
            let mut env = Environment::new(mode(seed), mesh(seed, 7)).unwrap();
            env.reset().unwrap();
            let mut steps = Vec::new();
            for action in &actions {
                let step = env.step(*action).unwrap();
                let done = step.done;
                steps.push(step);
                if done {
                    break;
                }
            }
            steps
        };
        prop_assert_eq!(play(), play());
    }

    #[test]
    fn attack_probability_is_bounded(skill in 0.0f64..=1.0, vulnerability in 0.0f64..=1.0) {
        let p = cyberfield::chance::attack_success_probability(skill, vulnerability, true);
        prop_assert!((0.0..=1.0).contains(&p));
        prop_assert!(p <= skill + 1e-12);
        let ignoring = cyberfield::chance::attack_success_probability(skill, vulnerability, false);
        prop_assert!(ignoring >= p - 1e-12);
    }
}
