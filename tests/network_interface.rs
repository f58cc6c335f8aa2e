use cyberfield::prelude::*;
use cyberfield::simulation::config::{OnReset, TargetMechanism};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

fn interface(mode: GameMode, seed: u64) -> (NetworkInterface, StdRng) {
    let mut rng = StdRng::seed_from_u64(seed);
    let network = generators::eighteen_node(0.2, 0.8, &mut rng).unwrap();
    let ni = NetworkInterface::new(Arc::new(mode), network, &mut rng).unwrap();
    (ni, rng)
}

#[test]
fn reset_restores_the_base_topology() {
    let (mut ni, mut rng) = interface(GameMode::default().with_deceptive_nodes(2), 1);
    let base_edges = ni.base_network().edges();

    ni.attack_node(NodeId::new(0), 1.0, true, true, &mut rng).unwrap();
    ni.set_red_current_location(Some(NodeId::new(0)));
    ni.update_stored_attacks(&[None], &[NodeId::new(0)], &[true], &mut rng).unwrap();
    ni.isolate_node(NodeId::new(4)).unwrap();
    for (a, b) in [(0, 2), (1, 3), (2, 3)] {
        ni.add_deceptive_node(NodeId::new(a), NodeId::new(b), &mut rng).unwrap();
    }
    assert_ne!(ni.network().edges(), base_edges);
    assert!(ni.deceptive_node_pointer() > 0);

    ni.reset(&mut rng).unwrap();
    assert_eq!(ni.network().edges(), base_edges);
    assert_eq!(ni.network().len(), 18);
    assert!(ni.red_current_location().is_none());
    assert!(ni.true_attacks().is_empty());
    assert!(ni.detected_attacks().is_empty());
    assert_eq!(ni.deceptive_node_pointer(), 0);
    assert_eq!(ni.current_deceptive_nodes(), 0);
    assert!(!ni.reached_max_deceptive_nodes());
    assert!(ni.get_nodes(NodeFilter::all().true_compromised()).is_empty());
}

#[test]
fn deceptive_nodes_fill_then_relocate() {
    let (mut ni, mut rng) = interface(GameMode::default().with_deceptive_nodes(2), 2);
    let first = ni.add_deceptive_node(NodeId::new(0), NodeId::new(2), &mut rng).unwrap();
    let second = ni.add_deceptive_node(NodeId::new(1), NodeId::new(3), &mut rng).unwrap();
    assert_eq!(first, Some(NodeId::new(18)));
    assert_eq!(second, Some(NodeId::new(19)));
    assert!(ni.reached_max_deceptive_nodes());
    assert!(ni.network().has_edge(NodeId::new(0), NodeId::new(18)));
    assert!(!ni.network().has_edge(NodeId::new(0), NodeId::new(2)));

    // pool is full, the oldest one moves and its old edge comes back
    let moved = ni.add_deceptive_node(NodeId::new(2), NodeId::new(4), &mut rng).unwrap();
    assert_eq!(moved, Some(NodeId::new(18)));
    assert!(ni.network().has_edge(NodeId::new(0), NodeId::new(2)));
    assert!(ni.network().has_edge(NodeId::new(18), NodeId::new(4)));
    assert_eq!(ni.network().len(), 20);
    assert_eq!(ni.get_nodes(NodeFilter::all().deceptive()).len(), 2);
}

#[test]
fn relocation_can_be_switched_off() {
    let mut mode = GameMode::default().with_deceptive_nodes(1);
    mode.blue.action_set.deceptive_nodes.allow_relocation = false;
    let (mut ni, mut rng) = interface(mode, 3);
    assert!(ni.add_deceptive_node(NodeId::new(0), NodeId::new(2), &mut rng).unwrap().is_some());
    let edges = ni.network().edges();
    assert_eq!(ni.add_deceptive_node(NodeId::new(1), NodeId::new(3), &mut rng).unwrap(), None);
    assert_eq!(ni.network().edges(), edges);
}

#[test]
fn deceptive_node_needs_a_live_edge() {
    let (mut ni, mut rng) = interface(GameMode::default().with_deceptive_nodes(2), 4);
    let edges = ni.network().edges();
    // 0 and 5 are not neighbours
    assert_eq!(ni.add_deceptive_node(NodeId::new(0), NodeId::new(5), &mut rng).unwrap(), None);
    assert_eq!(ni.network().edges(), edges);
    assert_eq!(ni.current_deceptive_nodes(), 0);
    assert!(ni.add_deceptive_node(NodeId::new(0), NodeId::new(99), &mut rng).is_err());
}

#[test]
fn malformed_references_are_errors() {
    let (mut ni, mut rng) = interface(GameMode::default(), 5);
    let ghost = NodeId::new(500);
    assert!(ni.node(ghost).is_err());
    assert!(ni.make_node_safe(ghost).is_err());
    assert!(ni.isolate_node(ghost).is_err());
    assert!(ni.attack_node(ghost, 1.0, true, true, &mut rng).is_err());
}

#[test]
fn on_reset_redraws() {
    let mut mode = GameMode::default();
    mode.on_reset = OnReset {
        randomise_vulnerabilities: true,
        choose_new_entry_nodes: true,
        choose_new_high_value_nodes: true,
    };
    mode.game_rules.number_of_entry_nodes = 2;
    let (mut ni, mut rng) = interface(mode, 6);
    let before = ni.get_all_vulnerabilities();
    let mut changed = false;
    for _ in 0..5 {
        ni.reset(&mut rng).unwrap();
        changed |= ni.get_all_vulnerabilities() != before;
        assert_eq!(ni.entry_nodes().len(), 2);
        assert_eq!(ni.high_value_nodes().len(), 1);
        assert!(ni.entry_nodes().iter().all(|id| !ni.high_value_nodes().contains(id)));
        assert!(ni.get_all_vulnerabilities().values().all(|v| (0.2..=0.8).contains(v)));
    }
    assert!(changed);
}

#[test]
fn target_is_drawn_when_not_given() {
    let mut mode = GameMode::default();
    mode.red.target_mechanism = TargetMechanism::TargetSpecificNode { target: None, always_shortest: false };
    let (ni, _) = interface(mode, 7);
    let target = ni.target_node().unwrap();
    assert!(!ni.entry_nodes().contains(&target));
}

#[test]
fn undesignated_target_is_redrawn_away_from_new_entry_nodes() {
    let mut mode = GameMode::default();
    mode.red.target_mechanism = TargetMechanism::TargetSpecificNode { target: None, always_shortest: false };
    mode.on_reset.choose_new_entry_nodes = true;
    mode.game_rules.number_of_entry_nodes = 12;
    let (mut ni, mut rng) = interface(mode, 9);

    let mut targets = std::collections::BTreeSet::new();
    for _ in 0..20 {
        ni.reset(&mut rng).unwrap();
        let target = ni.target_node().unwrap();
        assert!(!ni.entry_nodes().contains(&target));
        targets.insert(target);
    }
    assert!(targets.len() > 1);
}

#[test]
fn designated_target_survives_resets() {
    let mut mode = GameMode::default();
    mode.red.target_mechanism = TargetMechanism::TargetSpecificNode { target: Some(NodeId::new(12)), always_shortest: true };
    mode.on_reset.choose_new_entry_nodes = true;
    let (mut ni, mut rng) = interface(mode, 10);
    for _ in 0..5 {
        ni.reset(&mut rng).unwrap();
        assert_eq!(ni.target_node(), Some(NodeId::new(12)));
    }
}

#[test]
fn discovery_rules_filter_detected_attacks() {
    let mut mode = GameMode::default();
    mode.blue.attack_discovery.failed_attacks.enabled = true;
    mode.blue.attack_discovery.failed_attacks.standard_node = 1.0;
    mode.blue.attack_discovery.succeeded_attacks_unknown_compromise.enabled = false;
    mode.blue.intrusion_discovery_chance.immediate.standard_node = 0.0;
    let (mut ni, mut rng) = interface(mode, 8);

    ni.attack_node(NodeId::new(2), 1.0, true, true, &mut rng).unwrap();
    ni.update_stored_attacks(
        &[None, Some(NodeId::new(2))],
        &[NodeId::new(2), NodeId::new(4)],
        &[true, false],
        &mut rng,
    )
    .unwrap();
    assert_eq!(ni.true_attacks().len(), 2);
    // the unseen success stays hidden, the failure is reported
    assert_eq!(ni.detected_attacks().len(), 1);
    assert_eq!(ni.detected_attacks()[0].target, NodeId::new(4));
}
