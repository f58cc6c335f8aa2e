use cyberfield::prelude::*;
use cyberfield::simulation::LossReason;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn eighteen(seed: u64) -> Network {
    let mut rng = StdRng::seed_from_u64(seed);
    generators::eighteen_node(0.2, 0.8, &mut rng).unwrap()
}

fn noop(env: &Environment) -> usize {
    env.blue_agent().find_action(BlueActionKind::DoNothing, None).unwrap()
}

#[test]
fn grace_period_as_long_as_the_game() {
    for action in [0, 7, 10_000] {
        let mut mode = GameMode::default().with_seed(21).with_max_steps(1).with_grace_period(1);
        mode.red.always_succeeds = true;
        mode.rewards.end_rewards_are_multiplied_by_end_state = false;
        let mut env = Environment::new(mode, eighteen(1)).unwrap();
        env.reset().unwrap();

        let step = env.step(action).unwrap();
        assert!(step.done);
        assert_eq!(step.reward, 100.0);
        assert_eq!(step.info.outcome, Some(Outcome::Blue));
        assert_eq!(step.info.red_info.len(), 1);
        assert_eq!(step.info.red_info[0].action, RedActionKind::DoNothing);
    }
}

#[test]
fn same_seed_same_episode() {
    let run = || {
        let mut mode = GameMode::default().with_seed(77).with_max_steps(60).with_deceptive_nodes(2);
        mode.miscellaneous.collect_additional_per_ts_data = true;
        let mut env = Environment::new(mode, eighteen(5)).unwrap();
        env.reset().unwrap();
        let mut actions = StdRng::seed_from_u64(9);
        let mut steps = Vec::new();
        loop {
            let action = actions.gen_range(0..env.action_space_size());
            let step = env.step(action).unwrap();
            let done = step.done;
            steps.push(step);
            if done {
                break;
            }
        }
        steps
    };
    let first = run();
    assert!(!first.is_empty());
    assert_eq!(first, run());
}

#[test]
fn reset_with_seed_replays() {
    let mut env = Environment::new(GameMode::default().with_max_steps(40), eighteen(2)).unwrap();
    let play = |env: &mut Environment| {
        let first = env.reset_with_seed(1234).unwrap();
        let mut rewards = Vec::new();
        for i in 0..40 {
            let step = env.step(i % env.action_space_size()).unwrap();
            rewards.push(step.reward);
            if step.done {
                break;
            }
        }
        (first, rewards)
    };
    let a = play(&mut env);
    let b = play(&mut env);
    assert_eq!(a, b);
    assert_eq!(env.seed(), 1234);
}

#[test]
fn attacks_come_from_entry_points_or_compromised_neighbours() {
    let mut mode = GameMode::default().with_seed(3).with_max_steps(200);
    mode.red.skill = 0.9;
    mode.red.attack_from = cyberfield::simulation::config::AttackSource::AnyNode;
    mode.red.action_set.spread.enabled = true;
    mode.red.action_set.spread.likelihood = 0.5;
    mode.red.action_set.spread.chance = 0.5;
    mode.red.chance_to_spread_to_unconnected_node = 0.0;
    mode.miscellaneous.collect_additional_per_ts_data = true;
    let mut env = Environment::new(mode, eighteen(8)).unwrap();
    env.reset().unwrap();
    let action = noop(&env);

    let mut checked = 0;
    for _ in 0..200 {
        let step = env.step(action).unwrap();
        let start = step.info.start_state.as_ref().unwrap();
        let ni = env.network_interface();
        for attack in ni.true_attacks() {
            checked += 1;
            match attack.attacker {
                None => assert!(ni.entry_nodes().contains(&attack.target)),
                Some(attacker) => {
                    assert_eq!(start.compromised.get(&attacker), Some(&true));
                    assert!(ni.network().has_edge(attacker, attack.target));
                }
            }
        }
        if step.done {
            break;
        }
    }
    assert!(checked > 0);
}

#[test]
fn natural_spreading_matches_configured_chances() {
    let mut mode = GameMode::default()
        .with_seed(11)
        .with_max_steps(50)
        .with_only_natural_spread(0.3, 0.05);
    mode.game_rules.lose_when_n_percent_of_nodes_lost = false;
    mode.game_rules.lose_when_high_value_node_lost = false;
    mode.game_rules.lose_when_all_nodes_lost = true;
    let mut rng = StdRng::seed_from_u64(4);
    let network = generators::ring(20, 0.2, 0.8, &mut rng).unwrap();
    let mut env = Environment::new(mode, network).unwrap();
    let action = noop(&env);

    let (mut near, mut near_hits, mut far, mut far_hits) = (0usize, 0usize, 0usize, 0usize);
    for _ in 0..40 {
        env.reset().unwrap();
        loop {
            let step = env.step(action).unwrap();
            for record in &step.info.red_info {
                if record.action != RedActionKind::NaturalSpread {
                    continue;
                }
                for (attacker, success) in record.attacking_nodes.iter().zip(&record.successes) {
                    match attacker {
                        Some(_) => {
                            near += 1;
                            near_hits += *success as usize;
                        }
                        None => {
                            far += 1;
                            far_hits += *success as usize;
                        }
                    }
                }
            }
            if step.done {
                break;
            }
        }
    }

    assert!(near > 1_000 && far > 1_000, "too few samples: {} {}", near, far);
    let near_rate = near_hits as f64 / near as f64;
    let far_rate = far_hits as f64 / far as f64;
    assert!((near_rate - 0.3).abs() < 0.04, "connected rate {}", near_rate);
    assert!((far_rate - 0.05).abs() < 0.02, "unconnected rate {}", far_rate);
}

#[test]
fn target_node_loss() {
    let mut mode = GameMode::default().with_seed(6).with_max_steps(300);
    mode.red.always_succeeds = true;
    mode.red.naturally_spread = false;
    mode.red.action_set.do_nothing.enabled = false;
    mode.red.target_mechanism = cyberfield::simulation::config::TargetMechanism::TargetSpecificNode {
        target: Some(NodeId::new(12)),
        always_shortest: true,
    };
    mode.game_rules.lose_when_n_percent_of_nodes_lost = false;
    mode.game_rules.lose_when_high_value_node_lost = false;
    mode.game_rules.lose_when_target_node_lost = true;
    let mut env = Environment::new(mode, eighteen(3)).unwrap();
    env.reset().unwrap();
    let action = noop(&env);

    let last = loop {
        let step = env.step(action).unwrap();
        if step.done {
            break step;
        }
    };
    assert_eq!(
        last.info.outcome,
        Some(Outcome::Red { reason: LossReason::TargetNodeLost })
    );
    assert_eq!(last.info.blue_action, BlueActionKind::Failed);
    // entry, then one hop per turn along a shortest path 0/1 -> 12
    assert!(env.current_duration() <= 6);
}

#[test]
fn blue_defence_outlasts_doing_nothing() {
    let play = |policy: &str| {
        let mut wins = 0;
        for seed in 0..20 {
            let mode = GameMode::default().with_seed(seed).with_max_steps(80);
            let mut env = Environment::new(mode, eighteen(seed)).unwrap();
            let mut policy = PolicyRegistry::global().create(policy, seed).unwrap();
            env.reset().unwrap();
            loop {
                let step = env.step(policy.choose_action(&env)).unwrap();
                if step.done {
                    if step.info.outcome == Some(Outcome::Blue) {
                        wins += 1;
                    }
                    break;
                }
            }
        }
        wins
    };
    assert!(play("scan-and-fix") >= play("do-nothing"));
}

#[test]
fn observation_length_is_stable() {
    let mode = GameMode::default().with_seed(1).with_deceptive_nodes(3);
    let mut env = Environment::new(mode, eighteen(1)).unwrap();
    let size = env.observation_size();
    assert_eq!(env.reset().unwrap().len(), size);
    for i in 0..30 {
        let step = env.step(env.action_space_size() - 1 - i % 5).unwrap();
        assert_eq!(step.observation.len(), size);
        if step.done {
            break;
        }
    }
}
