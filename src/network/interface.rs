//! The only place network state is read or written during an episode.
//!
//! Three views of the topology are kept:
//! - `base`: the network as it stood at the last reset (entry/high value
//!   nodes and vulnerabilities already resolved),
//! - `topology`: the intended edges right now, i.e. base plus deceptive node
//!   rewiring, ignoring isolation,
//! - `current`: the live network, `topology` minus every edge touching an
//!   isolated node.
//!
//! Reconnecting a node restores its `topology` edges, so isolate followed by
//! reconnect is exact.

use super::observation;
use super::{Graph, Network, Node, NodeId};
use crate::chance;
use crate::error::{EnvError, NetworkError};
use crate::simulation::config::{EntryNodePlacement, GameMode, HighValuePlacement, TargetMechanism};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// One attack attempt. `attacker` is `None` when red came in from outside
/// through an entry node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackRecord {
    pub attacker: Option<NodeId>,
    pub target: NodeId,
}

/// Per-node state at one instant, used for rewards and step info.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub compromised: BTreeMap<NodeId, bool>,
    pub blue_view: BTreeMap<NodeId, bool>,
    pub vulnerabilities: BTreeMap<NodeId, f64>,
    pub isolation: BTreeMap<NodeId, bool>,
    pub red_location: Option<NodeId>,
}

impl Snapshot {
    pub fn compromised_count(&self) -> usize {
        self.compromised.values().filter(|c| **c).count()
    }

    pub fn safe_count(&self) -> usize {
        self.compromised.len() - self.compromised_count()
    }
}

/// Node query. Every `Some` field must match (AND semantics); `None` ignores
/// the attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeFilter {
    pub compromised: Option<bool>,
    pub blue_view_compromised: Option<bool>,
    pub isolated: Option<bool>,
    pub deceptive: Option<bool>,
}

impl NodeFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn true_compromised(mut self) -> Self {
        self.compromised = Some(true);
        self
    }

    pub fn true_safe(mut self) -> Self {
        self.compromised = Some(false);
        self
    }

    pub fn blue_view_compromised(mut self) -> Self {
        self.blue_view_compromised = Some(true);
        self
    }

    pub fn isolated(mut self) -> Self {
        self.isolated = Some(true);
        self
    }

    pub fn not_isolated(mut self) -> Self {
        self.isolated = Some(false);
        self
    }

    pub fn deceptive(mut self) -> Self {
        self.deceptive = Some(true);
        self
    }

    pub fn not_deceptive(mut self) -> Self {
        self.deceptive = Some(false);
        self
    }

    pub fn matches(&self, node: &Node) -> bool {
        self.compromised.is_none_or(|v| node.true_compromised == v)
            && self.blue_view_compromised.is_none_or(|v| node.blue_view_compromised == v)
            && self.isolated.is_none_or(|v| node.isolated == v)
            && self.deceptive.is_none_or(|v| node.deceptive == v)
    }
}

#[derive(Debug, Clone, Copy)]
struct DeceptivePlacement {
    node: NodeId,
    between: (NodeId, NodeId),
}

#[derive(Debug, Clone)]
pub struct NetworkInterface {
    game_mode: Arc<GameMode>,
    original: Network,
    base: Network,
    current: Network,
    topology: Graph,
    target_node: Option<NodeId>,

    red_current_location: Option<NodeId>,
    true_attacks: Vec<AttackRecord>,
    detected_attacks: Vec<AttackRecord>,

    deceptive_placements: Vec<DeceptivePlacement>,
    deceptive_node_pointer: usize,
    current_deceptive_nodes: usize,
    reached_max_deceptive_nodes: bool,
}

impl NetworkInterface {
    /// Resolves missing entry and high value nodes once, then resets.
    /// Vulnerability bounds always come from the game rules.
    pub fn new<R: Rng + ?Sized>(game_mode: Arc<GameMode>, network: Network, rng: &mut R) -> Result<Self, EnvError> {
        game_mode.validate()?;
        game_mode.validate_against(&network)?;

        let rules = &game_mode.game_rules;
        let mut original = network.with_bounds(rules.node_vulnerability_lower_bound, rules.node_vulnerability_upper_bound)?;
        if original.entry_nodes().is_empty() {
            assign_entry_nodes(&mut original, &game_mode, rng)?;
        }
        if original.high_value_nodes().is_empty() && game_mode.game_rules.number_of_high_value_nodes > 0 {
            assign_high_value_nodes(&mut original, &game_mode, rng)?;
        }

        let base = original.clone();
        let topology = base.graph().clone();
        let current = base.clone();
        let mut interface = Self {
            game_mode,
            original,
            base,
            current,
            topology,
            target_node: None,
            red_current_location: None,
            true_attacks: Vec::new(),
            detected_attacks: Vec::new(),
            deceptive_placements: Vec::new(),
            deceptive_node_pointer: 0,
            current_deceptive_nodes: 0,
            reached_max_deceptive_nodes: false,
        };
        interface.reset(rng)?;
        Ok(interface)
    }

    /// Restores the base topology, applying the on reset policy. An
    /// undesignated target is redrawn from the non entry nodes every time.
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), NetworkError> {
        let on_reset = self.game_mode.on_reset;
        let mut base = self.original.clone();
        if on_reset.randomise_vulnerabilities {
            base.randomise_vulnerabilities(rng);
        }
        if on_reset.choose_new_entry_nodes {
            assign_entry_nodes(&mut base, &self.game_mode, rng)?;
        }
        if on_reset.choose_new_high_value_nodes && self.game_mode.game_rules.number_of_high_value_nodes > 0 {
            assign_high_value_nodes(&mut base, &self.game_mode, rng)?;
        }
        self.target_node = match self.game_mode.red.target_mechanism {
            TargetMechanism::TargetSpecificNode { target: Some(target), .. } => Some(target),
            TargetMechanism::TargetSpecificNode { target: None, .. } => draw_target(&base, rng),
            _ => None,
        };

        self.topology = base.graph().clone();
        self.current = base.clone();
        self.base = base;
        self.red_current_location = None;
        self.true_attacks.clear();
        self.detected_attacks.clear();
        self.deceptive_placements.clear();
        self.deceptive_node_pointer = 0;
        self.current_deceptive_nodes = 0;
        self.reached_max_deceptive_nodes = false;
        Ok(())
    }

    // ---- queries ----

    pub fn game_mode(&self) -> &GameMode {
        &self.game_mode
    }

    pub fn network(&self) -> &Network {
        &self.current
    }

    pub fn base_network(&self) -> &Network {
        &self.base
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, NetworkError> {
        self.current.node(id).ok_or(NetworkError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, NetworkError> {
        self.current.node_mut(id).ok_or(NetworkError::UnknownNode(id))
    }

    /// Nodes of the live network matching `filter`, ordered by id.
    pub fn get_nodes(&self, filter: NodeFilter) -> Vec<&Node> {
        self.current.nodes().iter().filter(|n| filter.matches(n)).collect()
    }

    pub fn get_node_ids(&self, filter: NodeFilter) -> Vec<NodeId> {
        self.get_nodes(filter).into_iter().map(|n| n.id).collect()
    }

    /// Live neighbours of a node.
    pub fn connected_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.current.neighbours(id)
    }

    /// Edges `id` has in the intended topology, whether or not it is isolated.
    pub fn base_connections(&self, id: NodeId) -> Vec<NodeId> {
        if !self.topology.contains_node(id) {
            return Vec::new();
        }
        let mut out: Vec<NodeId> = self.topology.neighbors(id).collect();
        out.sort_unstable();
        out
    }

    pub fn entry_nodes(&self) -> Vec<NodeId> {
        self.base.entry_nodes().iter().copied().collect()
    }

    pub fn high_value_nodes(&self) -> Vec<NodeId> {
        self.base.high_value_nodes().iter().copied().collect()
    }

    pub fn target_node(&self) -> Option<NodeId> {
        self.target_node
    }

    pub fn vulnerability_bounds(&self) -> (f64, f64) {
        self.base.vulnerability_bounds()
    }

    /// Non deceptive node count, the denominator for loss percentages.
    pub fn standard_node_count(&self) -> usize {
        self.base.len()
    }

    /// Node slots including every deceptive node that could ever be placed.
    pub fn padded_node_count(&self) -> usize {
        self.base.len() + self.game_mode.blue.action_set.deceptive_nodes.capacity()
    }

    pub fn red_current_location(&self) -> Option<NodeId> {
        self.red_current_location
    }

    pub fn set_red_current_location(&mut self, location: Option<NodeId>) {
        self.red_current_location = location;
    }

    pub fn true_attacks(&self) -> &[AttackRecord] {
        &self.true_attacks
    }

    pub fn detected_attacks(&self) -> &[AttackRecord] {
        &self.detected_attacks
    }

    pub fn deceptive_node_pointer(&self) -> usize {
        self.deceptive_node_pointer
    }

    pub fn current_deceptive_nodes(&self) -> usize {
        self.current_deceptive_nodes
    }

    pub fn reached_max_deceptive_nodes(&self) -> bool {
        self.reached_max_deceptive_nodes
    }

    pub fn get_all_node_compromised_states(&self) -> BTreeMap<NodeId, bool> {
        self.current.nodes().iter().map(|n| (n.id, n.true_compromised)).collect()
    }

    pub fn get_all_node_blue_view_compromised_states(&self) -> BTreeMap<NodeId, bool> {
        self.current.nodes().iter().map(|n| (n.id, n.blue_view_compromised)).collect()
    }

    pub fn get_all_vulnerabilities(&self) -> BTreeMap<NodeId, f64> {
        self.current.nodes().iter().map(|n| (n.id, n.vulnerability_score())).collect()
    }

    pub fn get_all_isolation(&self) -> BTreeMap<NodeId, bool> {
        self.current.nodes().iter().map(|n| (n.id, n.isolated)).collect()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            compromised: self.get_all_node_compromised_states(),
            blue_view: self.get_all_node_blue_view_compromised_states(),
            vulnerabilities: self.get_all_vulnerabilities(),
            isolation: self.get_all_isolation(),
            red_location: self.red_current_location,
        }
    }

    pub fn get_current_observation(&self) -> Vec<f64> {
        observation::encode(self)
    }

    pub fn get_observation_size(&self) -> usize {
        observation::size(self)
    }

    // ---- mutations ----

    /// One attack attempt against `id`. A node that is already compromised is
    /// left alone and reported as a success.
    pub fn attack_node<R: Rng + ?Sized>(
        &mut self,
        id: NodeId,
        skill: f64,
        use_vulnerability: bool,
        guarantee: bool,
        rng: &mut R,
    ) -> Result<bool, NetworkError> {
        let node = self.node(id)?;
        if node.true_compromised {
            return Ok(true);
        }
        let succeeded = guarantee
            || chance::resolve(
                chance::attack_success_probability(skill, node.vulnerability_score(), use_vulnerability),
                rng,
            );
        if succeeded {
            let discovery = self
                .game_mode
                .blue
                .intrusion_discovery_chance
                .immediate
                .for_node(node.deceptive);
            let discovered = chance::resolve(discovery, rng);
            let node = self.node_mut(id)?;
            node.true_compromised = true;
            if discovered {
                node.blue_view_compromised = true;
            }
        }
        Ok(succeeded)
    }

    /// Clears compromise in both views. Never touches vulnerability.
    pub fn make_node_safe(&mut self, id: NodeId) -> Result<(), NetworkError> {
        let node = self.node_mut(id)?;
        node.true_compromised = false;
        node.blue_view_compromised = false;
        if self.red_current_location == Some(id) {
            self.red_current_location = None;
        }
        Ok(())
    }

    pub fn set_vulnerability_score(&mut self, id: NodeId, score: f64) -> Result<(), NetworkError> {
        self.node_mut(id)?.set_vulnerability_score(score);
        Ok(())
    }

    pub fn reset_node_vulnerability(&mut self, id: NodeId) -> Result<(), NetworkError> {
        self.node_mut(id)?.reset_vulnerability();
        Ok(())
    }

    pub fn isolate_node(&mut self, id: NodeId) -> Result<(), NetworkError> {
        let node = self.node_mut(id)?;
        if node.isolated {
            return Ok(());
        }
        node.isolated = true;
        for neighbour in self.current.neighbours(id) {
            self.current.remove_edge(id, neighbour)?;
        }
        Ok(())
    }

    pub fn reconnect_node(&mut self, id: NodeId) -> Result<(), NetworkError> {
        let node = self.node_mut(id)?;
        if !node.isolated {
            return Ok(());
        }
        node.isolated = false;
        for neighbour in self.base_connections(id) {
            if !self.node(neighbour)?.isolated {
                self.current.add_edge(id, neighbour)?;
            }
        }
        Ok(())
    }

    /// Reveals a compromised node to blue with the on scan discovery chance.
    pub fn scan_node<R: Rng + ?Sized>(&mut self, id: NodeId, rng: &mut R) -> Result<(), NetworkError> {
        let node = self.node(id)?;
        if !node.true_compromised || node.blue_view_compromised {
            return Ok(());
        }
        let chance = self.game_mode.blue.intrusion_discovery_chance.on_scan.for_node(node.deceptive);
        if chance::resolve(chance, rng) {
            self.node_mut(id)?.blue_view_compromised = true;
        }
        Ok(())
    }

    /// Places a deceptive node on the live edge `a`-`b`, creating a new one
    /// while the pool has room and relocating the oldest placement otherwise.
    /// Returns `None` (and changes nothing) when the edge is not live or no
    /// node can be placed.
    pub fn add_deceptive_node<R: Rng + ?Sized>(
        &mut self,
        a: NodeId,
        b: NodeId,
        rng: &mut R,
    ) -> Result<Option<NodeId>, NetworkError> {
        self.node(a)?;
        self.node(b)?;
        if a == b || !self.current.has_edge(a, b) {
            return Ok(None);
        }
        let settings = self.game_mode.blue.action_set.deceptive_nodes;
        let capacity = settings.capacity();
        if capacity == 0 {
            return Ok(None);
        }

        let deceptive = if self.current_deceptive_nodes < capacity {
            let id = NodeId::new(self.current.len() as u32);
            let (lower, upper) = self.vulnerability_bounds();
            let (ax, ay, bx, by) = {
                let (na, nb) = (self.node(a)?, self.node(b)?);
                (na.x, na.y, nb.x, nb.y)
            };
            let mut node = Node::new(id, chance::uniform_in(lower, upper, rng))
                .with_name(format!("deceptive-{}", self.current_deceptive_nodes))
                .with_position((ax + bx) / 2.0, (ay + by) / 2.0);
            node.deceptive = true;
            self.current.push_node(node)?;
            self.topology.add_node(id);
            self.deceptive_placements.push(DeceptivePlacement { node: id, between: (a, b) });
            self.current_deceptive_nodes += 1;
            if self.current_deceptive_nodes == capacity {
                self.reached_max_deceptive_nodes = true;
            }
            id
        } else {
            if !settings.allow_relocation {
                return Ok(None);
            }
            let slot = self.deceptive_node_pointer % self.deceptive_placements.len();
            self.deceptive_node_pointer = (slot + 1) % capacity;
            let placement = self.deceptive_placements[slot];
            self.vacate(placement)?;

            let id = placement.node;
            let was_compromised = self.node(id)?.true_compromised;
            if settings.new_node_on_relocate && was_compromised {
                self.node_mut(id)?.reset_state();
                if self.red_current_location == Some(id) {
                    self.red_current_location = None;
                }
            }
            self.deceptive_placements[slot].between = (a, b);
            id
        };

        self.topology.remove_edge(a, b);
        self.current.remove_edge(a, b)?;
        self.topology.add_edge(deceptive, a, ());
        self.topology.add_edge(deceptive, b, ());
        if !self.node(deceptive)?.isolated {
            self.current.add_edge(deceptive, a)?;
            self.current.add_edge(deceptive, b)?;
        }
        debug!(
            "{} placed between {} and {}",
            self.node(deceptive)?.label(),
            self.node(a)?.label(),
            self.node(b)?.label()
        );
        Ok(Some(deceptive))
    }

    /// Lifts a deceptive node off its edge and restores the edge it split.
    fn vacate(&mut self, placement: DeceptivePlacement) -> Result<(), NetworkError> {
        let id = placement.node;
        let (x, y) = placement.between;
        for neighbour in self.base_connections(id) {
            self.topology.remove_edge(id, neighbour);
        }
        for neighbour in self.current.neighbours(id) {
            self.current.remove_edge(id, neighbour)?;
        }
        self.topology.add_edge(x, y, ());
        if !self.node(x)?.isolated && !self.node(y)?.isolated {
            self.current.add_edge(x, y)?;
        }
        Ok(())
    }

    /// Records this turn's attacks. Every attempt goes into the true list;
    /// the attack discovery rules decide which ones blue gets to see.
    pub fn update_stored_attacks<R: Rng + ?Sized>(
        &mut self,
        attackers: &[Option<NodeId>],
        targets: &[NodeId],
        successes: &[bool],
        rng: &mut R,
    ) -> Result<(), NetworkError> {
        let rules = self.game_mode.blue.attack_discovery;
        for ((attacker, target), succeeded) in attackers.iter().zip(targets).zip(successes) {
            let record = AttackRecord { attacker: *attacker, target: *target };
            self.true_attacks.push(record);

            let node = self.node(*target)?;
            let chance = match (*succeeded, node.blue_view_compromised) {
                (false, _) => rules.failed_attacks.chance(node.deceptive),
                (true, true) => rules.succeeded_attacks_known_compromise.chance(node.deceptive),
                (true, false) => rules.succeeded_attacks_unknown_compromise.chance(node.deceptive),
            };
            if chance::resolve(chance, rng) {
                self.detected_attacks.push(record);
            }
        }
        Ok(())
    }

    pub fn reset_stored_attacks(&mut self) {
        self.true_attacks.clear();
        self.detected_attacks.clear();
    }
}

fn draw_target<R: Rng + ?Sized>(network: &Network, rng: &mut R) -> Option<NodeId> {
    let candidates: Vec<NodeId> = network
        .node_ids()
        .filter(|id| !network.entry_nodes().contains(id))
        .collect();
    let pool = if candidates.is_empty() {
        network.node_ids().collect()
    } else {
        candidates
    };
    chance::choose(&pool, rng).copied()
}

fn assign_entry_nodes<R: Rng + ?Sized>(network: &mut Network, mode: &GameMode, rng: &mut R) -> Result<(), NetworkError> {
    let count = mode.game_rules.number_of_entry_nodes.min(network.len());
    let mut ids: Vec<NodeId> = network.node_ids().collect();
    ids.shuffle(rng);
    match mode.game_rules.entry_node_placement {
        EntryNodePlacement::Random => {}
        // stable sorts keep the shuffle as the tie breaker
        EntryNodePlacement::PreferCentral => ids.sort_by_key(|id| std::cmp::Reverse(network.degree(*id))),
        EntryNodePlacement::PreferEdge => ids.sort_by_key(|id| network.degree(*id)),
    }
    ids.truncate(count);
    network.set_entry_nodes(ids)
}

fn assign_high_value_nodes<R: Rng + ?Sized>(
    network: &mut Network,
    mode: &GameMode,
    rng: &mut R,
) -> Result<(), NetworkError> {
    let count = mode.game_rules.number_of_high_value_nodes.min(network.len());
    let entry: Vec<NodeId> = network.entry_nodes().iter().copied().collect();
    let mut ids: Vec<NodeId> = network.node_ids().collect();
    ids.shuffle(rng);
    if mode.game_rules.high_value_node_placement == HighValuePlacement::FurthestFromEntry {
        let distances = network.hop_distances(&entry);
        // unreachable nodes count as furthest
        ids.sort_by_key(|id| std::cmp::Reverse(distances.get(id).copied().unwrap_or(usize::MAX)));
    }
    // non entry nodes first, keeping the order inside each group
    ids.sort_by_key(|id| entry.contains(id));
    ids.truncate(count);
    network.set_high_value_nodes(ids)
}
