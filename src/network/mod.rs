pub mod node;
pub mod generators;
pub mod interface;
pub mod observation;

pub use interface::{AttackRecord, NetworkInterface, NodeFilter, Snapshot};
pub use node::{Node, NodeId};

use crate::chance;
use crate::error::NetworkError;
use petgraph::algo::dijkstra;
use petgraph::graphmap::UnGraphMap;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

pub type Graph = UnGraphMap<NodeId, ()>;

pub const DEFAULT_VULNERABILITY_LOWER_BOUND: f64 = 0.2;
pub const DEFAULT_VULNERABILITY_UPPER_BOUND: f64 = 0.8;

/// Undirected graph of nodes. Nodes live in an arena indexed by [`NodeId`];
/// the graph only stores ids.
#[derive(Debug, Clone)]
pub struct Network {
    nodes: Vec<Node>,
    graph: Graph,
    entry_nodes: BTreeSet<NodeId>,
    high_value_nodes: BTreeSet<NodeId>,
    vulnerability_lower_bound: f64,
    vulnerability_upper_bound: f64,
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl Network {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            graph: Graph::new(),
            entry_nodes: BTreeSet::new(),
            high_value_nodes: BTreeSet::new(),
            vulnerability_lower_bound: DEFAULT_VULNERABILITY_LOWER_BOUND,
            vulnerability_upper_bound: DEFAULT_VULNERABILITY_UPPER_BOUND,
        }
    }

    pub fn with_bounds(mut self, lower: f64, upper: f64) -> Result<Self, NetworkError> {
        if !(0.0..=1.0).contains(&lower) || !(0.0..=1.0).contains(&upper) || lower > upper {
            return Err(NetworkError::InvalidBounds { lower, upper });
        }
        self.vulnerability_lower_bound = lower;
        self.vulnerability_upper_bound = upper;
        Ok(self)
    }

    pub fn add_node(&mut self, vulnerability: f64) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u32);
        self.nodes.push(Node::new(id, vulnerability));
        self.graph.add_node(id);
        id
    }

    /// Inserts a fully built node. Its id must be the next arena slot.
    pub fn push_node(&mut self, node: Node) -> Result<NodeId, NetworkError> {
        let expected = NodeId::new(self.nodes.len() as u32);
        if node.id != expected {
            return Err(if node.id.index() < self.nodes.len() {
                NetworkError::DuplicateNode(node.id)
            } else {
                NetworkError::UnknownNode(node.id)
            });
        }
        self.graph.add_node(node.id);
        self.nodes.push(node);
        Ok(expected)
    }

    pub fn add_edge(&mut self, a: NodeId, b: NodeId) -> Result<(), NetworkError> {
        self.check(a)?;
        self.check(b)?;
        if a == b {
            return Err(NetworkError::SelfLoop(a));
        }
        self.graph.add_edge(a, b, ());
        Ok(())
    }

    pub fn remove_edge(&mut self, a: NodeId, b: NodeId) -> Result<(), NetworkError> {
        self.check(a)?;
        self.check(b)?;
        self.graph
            .remove_edge(a, b)
            .map(|_| ())
            .ok_or(NetworkError::UnknownEdge(a, b))
    }

    fn check(&self, id: NodeId) -> Result<(), NetworkError> {
        if id.index() < self.nodes.len() {
            Ok(())
        } else {
            Err(NetworkError::UnknownNode(id))
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().map(|n| n.id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn has_edge(&self, a: NodeId, b: NodeId) -> bool {
        self.graph.contains_edge(a, b)
    }

    /// Edges as `(low, high)` pairs in ascending order. The ordering is what the
    /// blue action space enumerates, so it must stay stable.
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        let mut edges: Vec<(NodeId, NodeId)> = self
            .graph
            .all_edges()
            .map(|(a, b, _)| if a < b { (a, b) } else { (b, a) })
            .collect();
        edges.sort_unstable();
        edges.dedup();
        edges
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Sorted neighbours.
    pub fn neighbours(&self, id: NodeId) -> Vec<NodeId> {
        if !self.graph.contains_node(id) {
            return Vec::new();
        }
        let mut out: Vec<NodeId> = self.graph.neighbors(id).collect();
        out.sort_unstable();
        out
    }

    pub fn degree(&self, id: NodeId) -> usize {
        if self.graph.contains_node(id) {
            self.graph.neighbors(id).count()
        } else {
            0
        }
    }

    pub fn entry_nodes(&self) -> &BTreeSet<NodeId> {
        &self.entry_nodes
    }

    pub fn high_value_nodes(&self) -> &BTreeSet<NodeId> {
        &self.high_value_nodes
    }

    pub fn set_entry_nodes(&mut self, ids: impl IntoIterator<Item = NodeId>) -> Result<(), NetworkError> {
        let ids: BTreeSet<NodeId> = ids.into_iter().collect();
        for id in &ids {
            self.check(*id)?;
        }
        for node in &mut self.nodes {
            node.entry_node = ids.contains(&node.id);
        }
        self.entry_nodes = ids;
        self.warn_on_overlap();
        Ok(())
    }

    pub fn set_high_value_nodes(&mut self, ids: impl IntoIterator<Item = NodeId>) -> Result<(), NetworkError> {
        let ids: BTreeSet<NodeId> = ids.into_iter().collect();
        for id in &ids {
            self.check(*id)?;
        }
        for node in &mut self.nodes {
            node.high_value_node = ids.contains(&node.id);
        }
        self.high_value_nodes = ids;
        self.warn_on_overlap();
        Ok(())
    }

    fn warn_on_overlap(&self) {
        let overlap: Vec<String> = self
            .entry_nodes
            .intersection(&self.high_value_nodes)
            .map(|id| id.to_string())
            .collect();
        if !overlap.is_empty() {
            warn!("Nodes {} are both entry and high value nodes", overlap.join(", "));
        }
    }

    pub fn vulnerability_bounds(&self) -> (f64, f64) {
        (self.vulnerability_lower_bound, self.vulnerability_upper_bound)
    }

    pub fn randomise_vulnerabilities<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let (lower, upper) = self.vulnerability_bounds();
        for node in &mut self.nodes {
            node.set_vulnerability(chance::uniform_in(lower, upper, rng));
        }
    }

    /// Hop distance from the closest of `sources` to every reachable node.
    pub fn hop_distances(&self, sources: &[NodeId]) -> BTreeMap<NodeId, usize> {
        let mut best: BTreeMap<NodeId, usize> = BTreeMap::new();
        for source in sources {
            if !self.graph.contains_node(*source) {
                continue;
            }
            for (node, dist) in dijkstra(&self.graph, *source, None, |_| 1usize) {
                best.entry(node)
                    .and_modify(|d| *d = (*d).min(dist))
                    .or_insert(dist);
            }
        }
        best
    }
}
