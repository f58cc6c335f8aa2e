use super::BlueActionKind;
use crate::chance;
use crate::error::NetworkError;
use crate::network::{NetworkInterface, NodeId};
use crate::simulation::config::{GameMode, VulnerabilityOnSafe};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How much one reduce_vulnerability lowers a node's score.
pub const VULNERABILITY_STEP: f64 = 0.2;

/// What a blue action touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlueTarget {
    None,
    Node(NodeId),
    Deceptive { node: NodeId, between: (NodeId, NodeId) },
}

impl BlueTarget {
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Self::None => None,
            Self::Node(id) => Some(*id),
            Self::Deceptive { node, .. } => Some(*node),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Node(BlueActionKind, NodeId),
    Global(BlueActionKind),
    Edge(NodeId, NodeId),
}

/// Maps discrete action indices onto blue's enabled actions.
///
/// The index space is laid out as: one block per enabled per-node action
/// (reduce vulnerability, restore, make safe, isolate, reconnect) each with
/// one slot per network node, then the global actions (scan, do nothing),
/// then one add_deceptive_node slot per edge of the base network. Indices
/// are fixed for the lifetime of the agent.
#[derive(Debug, Clone)]
pub struct BlueAgent {
    game_mode: Arc<GameMode>,
    slots: Vec<Slot>,
}

impl BlueAgent {
    pub fn new(game_mode: Arc<GameMode>, ni: &NetworkInterface) -> Self {
        let set = game_mode.blue.action_set;
        let base = ni.base_network();
        let node_ids: Vec<NodeId> = base.nodes().iter().filter(|n| !n.deceptive).map(|n| n.id).collect();

        let per_node = [
            (BlueActionKind::ReduceVulnerability, set.reduce_vulnerability),
            (BlueActionKind::RestoreNode, set.restore_node),
            (BlueActionKind::MakeNodeSafe, set.make_node_safe.enabled),
            (BlueActionKind::Isolate, set.isolate_node),
            (BlueActionKind::Reconnect, set.reconnect_node),
        ];
        let mut slots = Vec::new();
        for (kind, enabled) in per_node {
            if enabled {
                slots.extend(node_ids.iter().map(|id| Slot::Node(kind, *id)));
            }
        }
        if set.scan {
            slots.push(Slot::Global(BlueActionKind::Scan));
        }
        if set.do_nothing {
            slots.push(Slot::Global(BlueActionKind::DoNothing));
        }
        if set.deceptive_nodes.enabled {
            slots.extend(base.edges().into_iter().map(|(a, b)| Slot::Edge(a, b)));
        }
        Self { game_mode, slots }
    }

    pub fn action_space_size(&self) -> usize {
        self.slots.len()
    }

    /// Index of `kind` acting on `node`; `None` for the global actions.
    pub fn find_action(&self, kind: BlueActionKind, node: Option<NodeId>) -> Option<usize> {
        self.slots.iter().position(|slot| match (*slot, node) {
            (Slot::Node(k, id), Some(target)) => k == kind && id == target,
            (Slot::Global(k), None) => k == kind,
            _ => false,
        })
    }

    pub fn describe_action(&self, index: usize) -> String {
        match self.slots.get(index) {
            Some(Slot::Node(kind, id)) => format!("{} {}", kind, id),
            Some(Slot::Global(kind)) => kind.to_string(),
            Some(Slot::Edge(a, b)) => format!("{} {}-{}", BlueActionKind::AddDeceptiveNode, a, b),
            None => format!("{} (out of range)", BlueActionKind::DoNothing),
        }
    }

    /// Applies the action at `index`. Anything that cannot be carried out,
    /// an unknown index included, becomes do_nothing.
    pub fn perform_action<R: Rng + ?Sized>(
        &self,
        index: usize,
        ni: &mut NetworkInterface,
        rng: &mut R,
    ) -> Result<(BlueActionKind, BlueTarget), NetworkError> {
        let Some(slot) = self.slots.get(index).copied() else {
            return Ok(self.do_nothing());
        };
        match slot {
            Slot::Node(kind, id) => self.node_action(kind, id, ni, rng),
            Slot::Global(BlueActionKind::Scan) => self.scan_all_nodes(ni, rng),
            Slot::Global(_) => Ok(self.do_nothing()),
            Slot::Edge(a, b) => self.add_deceptive_node(a, b, ni, rng),
        }
    }

    fn node_action<R: Rng + ?Sized>(
        &self,
        kind: BlueActionKind,
        id: NodeId,
        ni: &mut NetworkInterface,
        rng: &mut R,
    ) -> Result<(BlueActionKind, BlueTarget), NetworkError> {
        match kind {
            BlueActionKind::ReduceVulnerability => self.reduce_vulnerability(id, ni)?,
            BlueActionKind::RestoreNode => self.restore_node(id, ni)?,
            BlueActionKind::MakeNodeSafe => self.make_node_safe(id, ni, rng)?,
            BlueActionKind::Isolate => ni.isolate_node(id)?,
            BlueActionKind::Reconnect => ni.reconnect_node(id)?,
            _ => return Ok(self.do_nothing()),
        }
        Ok((kind, BlueTarget::Node(id)))
    }

    fn reduce_vulnerability(&self, id: NodeId, ni: &mut NetworkInterface) -> Result<(), NetworkError> {
        let (lower, _) = ni.vulnerability_bounds();
        let score = ni.node(id)?.vulnerability_score();
        let reduced = (score - VULNERABILITY_STEP).max(lower).min(score);
        ni.set_vulnerability_score(id, reduced)
    }

    fn restore_node(&self, id: NodeId, ni: &mut NetworkInterface) -> Result<(), NetworkError> {
        ni.make_node_safe(id)?;
        ni.reset_node_vulnerability(id)
    }

    fn make_node_safe<R: Rng + ?Sized>(&self, id: NodeId, ni: &mut NetworkInterface, rng: &mut R) -> Result<(), NetworkError> {
        ni.make_node_safe(id)?;
        let (lower, upper) = ni.vulnerability_bounds();
        match self.game_mode.blue.action_set.make_node_safe.on_safe {
            VulnerabilityOnSafe::Unchanged => Ok(()),
            VulnerabilityOnSafe::Shift { change } => {
                let score = ni.node(id)?.vulnerability_score();
                ni.set_vulnerability_score(id, (score + change).clamp(lower, upper))
            }
            VulnerabilityOnSafe::Randomise => ni.set_vulnerability_score(id, chance::uniform_in(lower, upper, rng)),
        }
    }

    fn scan_all_nodes<R: Rng + ?Sized>(
        &self,
        ni: &mut NetworkInterface,
        rng: &mut R,
    ) -> Result<(BlueActionKind, BlueTarget), NetworkError> {
        for id in ni.network().node_ids().collect::<Vec<_>>() {
            ni.scan_node(id, rng)?;
        }
        Ok((BlueActionKind::Scan, BlueTarget::None))
    }

    fn add_deceptive_node<R: Rng + ?Sized>(
        &self,
        a: NodeId,
        b: NodeId,
        ni: &mut NetworkInterface,
        rng: &mut R,
    ) -> Result<(BlueActionKind, BlueTarget), NetworkError> {
        match ni.add_deceptive_node(a, b, rng)? {
            Some(node) => Ok((
                BlueActionKind::AddDeceptiveNode,
                BlueTarget::Deceptive { node, between: (a, b) },
            )),
            None => Ok(self.do_nothing()),
        }
    }

    fn do_nothing(&self) -> (BlueActionKind, BlueTarget) {
        (BlueActionKind::DoNothing, BlueTarget::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Network;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    // triangle 0-1-2 with a tail 2-3
    fn network() -> Network {
        let mut net = Network::new();
        for _ in 0..4 {
            net.add_node(0.6);
        }
        for (a, b) in [(0, 1), (1, 2), (0, 2), (2, 3)] {
            net.add_edge(NodeId::new(a), NodeId::new(b)).unwrap();
        }
        net.set_entry_nodes([NodeId::new(0)]).unwrap();
        net.set_high_value_nodes([NodeId::new(3)]).unwrap();
        net
    }

    fn setup(mode: GameMode) -> (BlueAgent, NetworkInterface, StdRng) {
        let mode = Arc::new(mode);
        let mut rng = StdRng::seed_from_u64(99);
        let ni = NetworkInterface::new(mode.clone(), network(), &mut rng).unwrap();
        let blue = BlueAgent::new(mode, &ni);
        (blue, ni, rng)
    }

    #[test]
    fn action_space_layout() {
        let (blue, _, _) = setup(GameMode::default().with_deceptive_nodes(1));
        // 5 per-node kinds * 4 nodes + scan + do nothing + 4 edges
        assert_eq!(blue.action_space_size(), 26);
        assert_eq!(blue.describe_action(0), "reduce_vulnerability 0");
        assert_eq!(blue.describe_action(4), "restore_node 0");
        assert_eq!(blue.describe_action(20), "scan");
        assert_eq!(blue.describe_action(21), "do_nothing");
        assert_eq!(blue.describe_action(22), "add_deceptive_node 0-1");
        assert_eq!(blue.find_action(BlueActionKind::MakeNodeSafe, Some(NodeId::new(3))), Some(11));
        assert_eq!(blue.find_action(BlueActionKind::DoNothing, None), Some(21));
        assert_eq!(blue.find_action(BlueActionKind::Scan, Some(NodeId::new(0))), None);
    }

    #[test]
    fn disabled_actions_leave_no_slots() {
        let mut mode = GameMode::default();
        mode.blue.action_set.isolate_node = false;
        mode.blue.action_set.reconnect_node = false;
        mode.blue.action_set.restore_node = false;
        let (blue, _, _) = setup(mode);
        assert_eq!(blue.action_space_size(), 2 * 4 + 2);
    }

    #[test]
    fn out_of_range_is_do_nothing() {
        let (blue, mut ni, mut rng) = setup(GameMode::default());
        let before = ni.get_all_vulnerabilities();
        let outcome = blue.perform_action(10_000, &mut ni, &mut rng).unwrap();
        assert_eq!(outcome, (BlueActionKind::DoNothing, BlueTarget::None));
        assert_eq!(ni.get_all_vulnerabilities(), before);
    }

    #[test]
    fn reduce_vulnerability_stops_at_the_lower_bound() {
        let (blue, mut ni, mut rng) = setup(GameMode::default());
        let id = NodeId::new(1);
        blue.perform_action(1, &mut ni, &mut rng).unwrap();
        assert!((ni.node(id).unwrap().vulnerability_score() - 0.4).abs() < 1e-9);
        blue.perform_action(1, &mut ni, &mut rng).unwrap();
        blue.perform_action(1, &mut ni, &mut rng).unwrap();
        assert!((ni.node(id).unwrap().vulnerability_score() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn reduce_vulnerability_follows_the_game_rules_bounds() {
        let mut mode = GameMode::default();
        mode.game_rules.node_vulnerability_lower_bound = 0.0;
        mode.game_rules.node_vulnerability_upper_bound = 1.0;
        let (blue, mut ni, mut rng) = setup(mode);
        assert_eq!(ni.vulnerability_bounds(), (0.0, 1.0));
        let id = NodeId::new(1);
        for _ in 0..4 {
            blue.perform_action(1, &mut ni, &mut rng).unwrap();
        }
        // the network's own 0.2 floor no longer applies
        assert!(ni.node(id).unwrap().vulnerability_score() < 1e-9);
    }

    #[test]
    fn restore_resets_vulnerability() {
        let (blue, mut ni, mut rng) = setup(GameMode::default());
        let id = NodeId::new(2);
        ni.attack_node(id, 1.0, true, true, &mut rng).unwrap();
        ni.set_vulnerability_score(id, 0.95).unwrap();
        let outcome = blue.perform_action(4 + 2, &mut ni, &mut rng).unwrap();
        assert_eq!(outcome, (BlueActionKind::RestoreNode, BlueTarget::Node(id)));
        let node = ni.node(id).unwrap();
        assert!(!node.true_compromised);
        assert_eq!(node.vulnerability_score(), 0.6);
    }

    #[test]
    fn make_safe_vulnerability_policies() {
        let mut mode = GameMode::default();
        mode.blue.action_set.make_node_safe.on_safe = VulnerabilityOnSafe::Shift { change: 0.5 };
        let (blue, mut ni, mut rng) = setup(mode);
        let id = NodeId::new(0);
        ni.attack_node(id, 1.0, true, true, &mut rng).unwrap();
        let outcome = blue.perform_action(8, &mut ni, &mut rng).unwrap();
        assert_eq!(outcome.0, BlueActionKind::MakeNodeSafe);
        // clamped to the default upper bound
        assert_eq!(ni.node(id).unwrap().vulnerability_score(), 0.8);

        let mut mode = GameMode::default();
        mode.blue.action_set.make_node_safe.on_safe = VulnerabilityOnSafe::Randomise;
        let (blue, mut ni, mut rng) = setup(mode);
        for _ in 0..20 {
            blue.perform_action(8, &mut ni, &mut rng).unwrap();
            let v = ni.node(id).unwrap().vulnerability_score();
            assert!((0.2..=0.8).contains(&v));
        }
    }

    #[test]
    fn isolate_and_reconnect_round_trip() {
        let (blue, mut ni, mut rng) = setup(GameMode::default());
        let edges = ni.network().edges();
        blue.perform_action(12 + 2, &mut ni, &mut rng).unwrap();
        assert!(ni.connected_nodes(NodeId::new(2)).is_empty());
        blue.perform_action(16 + 2, &mut ni, &mut rng).unwrap();
        assert_eq!(ni.network().edges(), edges);
    }

    #[test]
    fn deceptive_node_on_a_dead_edge_degrades() {
        let (blue, mut ni, mut rng) = setup(GameMode::default().with_deceptive_nodes(2));
        ni.isolate_node(NodeId::new(3)).unwrap();
        // edge 2-3 is the last base edge
        let outcome = blue.perform_action(25, &mut ni, &mut rng).unwrap();
        assert_eq!(outcome, (BlueActionKind::DoNothing, BlueTarget::None));
        assert_eq!(ni.current_deceptive_nodes(), 0);

        let outcome = blue.perform_action(22, &mut ni, &mut rng).unwrap();
        assert_eq!(
            outcome,
            (
                BlueActionKind::AddDeceptiveNode,
                BlueTarget::Deceptive { node: NodeId::new(4), between: (NodeId::new(0), NodeId::new(1)) }
            )
        );
    }

    #[test]
    fn scan_only_changes_blue_view() {
        let mut mode = GameMode::default();
        mode.blue.intrusion_discovery_chance.immediate.standard_node = 0.0;
        mode.blue.intrusion_discovery_chance.on_scan.standard_node = 1.0;
        let (blue, mut ni, mut rng) = setup(mode);
        ni.attack_node(NodeId::new(1), 1.0, true, true, &mut rng).unwrap();
        let truth = ni.get_all_node_compromised_states();
        assert_eq!(blue.perform_action(20, &mut ni, &mut rng).unwrap().0, BlueActionKind::Scan);
        assert_eq!(ni.get_all_node_compromised_states(), truth);
        assert!(ni.node(NodeId::new(1)).unwrap().blue_view_compromised);
    }
}
