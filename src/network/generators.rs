// Ready made topologies. Vulnerabilities are drawn uniformly within the
// network's bounds, positions are cosmetic.

use super::{Network, NodeId};
use crate::chance;
use crate::error::NetworkError;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

const MESH_CONNECTIVITY: f64 = 0.15;
const GNP_PROBABILITY: f64 = 0.3;
const GNP_MAX_ATTEMPTS: usize = 1_000;

/// Named generator, as picked on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    Mesh,
    Ring,
    Star,
    Eighteen,
    Gnp,
}

impl Topology {
    /// `size` is ignored by the fixed eighteen node network.
    pub fn build<R: Rng + ?Sized>(self, size: usize, lower: f64, upper: f64, rng: &mut R) -> Result<Network, NetworkError> {
        match self {
            Self::Mesh => mesh(size, MESH_CONNECTIVITY, lower, upper, rng),
            Self::Ring => ring(size, lower, upper, rng),
            Self::Star => star(size, lower, upper, rng),
            Self::Eighteen => eighteen_node(lower, upper, rng),
            Self::Gnp => gnp_random_connected(size, GNP_PROBABILITY, lower, upper, rng),
        }
    }
}

impl FromStr for Topology {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mesh" => Ok(Self::Mesh),
            "ring" => Ok(Self::Ring),
            "star" => Ok(Self::Star),
            "eighteen" | "18" => Ok(Self::Eighteen),
            "gnp" => Ok(Self::Gnp),
            other => Err(format!("unknown network '{}', use mesh, ring, star, eighteen or gnp", other)),
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mesh => "mesh",
            Self::Ring => "ring",
            Self::Star => "star",
            Self::Eighteen => "eighteen",
            Self::Gnp => "gnp",
        };
        f.write_str(name)
    }
}

fn with_random_nodes<R: Rng + ?Sized>(
    size: usize,
    lower: f64,
    upper: f64,
    rng: &mut R,
) -> Result<(Network, Vec<NodeId>), NetworkError> {
    let mut net = Network::new().with_bounds(lower, upper)?;
    let mut ids = Vec::with_capacity(size);
    for i in 0..size {
        let id = net.add_node(chance::uniform_in(lower, upper, rng));
        let angle = TAU * i as f64 / size.max(1) as f64;
        if let Some(node) = net.node_mut(id) {
            node.x = angle.cos();
            node.y = angle.sin();
        }
        ids.push(id);
    }
    Ok((net, ids))
}

/// Connected random mesh. Starts from a random spanning tree, then adds each
/// remaining pair with probability `connectivity`.
pub fn mesh<R: Rng + ?Sized>(
    size: usize,
    connectivity: f64,
    lower: f64,
    upper: f64,
    rng: &mut R,
) -> Result<Network, NetworkError> {
    let (mut net, mut ids) = with_random_nodes(size, lower, upper, rng)?;
    ids.shuffle(rng);
    for i in 1..ids.len() {
        let parent = ids[rng.gen_range(0..i)];
        net.add_edge(ids[i], parent)?;
    }
    ids.sort_unstable();
    for (i, a) in ids.iter().enumerate() {
        for b in &ids[i + 1..] {
            if !net.has_edge(*a, *b) && chance::resolve(connectivity, rng) {
                net.add_edge(*a, *b)?;
            }
        }
    }
    Ok(net)
}

/// Erdős-Rényi G(n, p) graph, redrawn until it is connected. Gives up after
/// a fixed number of draws.
pub fn gnp_random_connected<R: Rng + ?Sized>(
    size: usize,
    probability: f64,
    lower: f64,
    upper: f64,
    rng: &mut R,
) -> Result<Network, NetworkError> {
    for _ in 0..GNP_MAX_ATTEMPTS {
        let (mut net, ids) = with_random_nodes(size, lower, upper, rng)?;
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                if chance::resolve(probability, rng) {
                    net.add_edge(*a, *b)?;
                }
            }
        }
        let reachable = net.hop_distances(&ids[..ids.len().min(1)]).len();
        if reachable == size {
            return Ok(net);
        }
    }
    Err(NetworkError::Disconnected {
        size,
        probability,
        attempts: GNP_MAX_ATTEMPTS,
    })
}

pub fn ring<R: Rng + ?Sized>(size: usize, lower: f64, upper: f64, rng: &mut R) -> Result<Network, NetworkError> {
    let (mut net, ids) = with_random_nodes(size, lower, upper, rng)?;
    if size > 1 {
        for w in ids.windows(2) {
            net.add_edge(w[0], w[1])?;
        }
    }
    if size > 2 {
        net.add_edge(ids[size - 1], ids[0])?;
    }
    Ok(net)
}

/// Node 0 is the hub.
pub fn star<R: Rng + ?Sized>(size: usize, lower: f64, upper: f64, rng: &mut R) -> Result<Network, NetworkError> {
    let (mut net, ids) = with_random_nodes(size, lower, upper, rng)?;
    if let Some((hub, spokes)) = ids.split_first() {
        if let Some(node) = net.node_mut(*hub) {
            node.x = 0.0;
            node.y = 0.0;
        }
        for spoke in spokes {
            net.add_edge(*hub, *spoke)?;
        }
    }
    Ok(net)
}

/// Fixed 18 node corporate style network: two entry points feeding a core,
/// a server cluster behind it. Entry nodes are preset to 0 and 1, the high
/// value node to 16.
pub fn eighteen_node<R: Rng + ?Sized>(lower: f64, upper: f64, rng: &mut R) -> Result<Network, NetworkError> {
    const EDGES: [(u32, u32); 23] = [
        (0, 2), (1, 3), (2, 3), (2, 4), (3, 5),
        (4, 5), (4, 6), (4, 7), (5, 8), (5, 9),
        (6, 10), (7, 10), (8, 11), (9, 11), (10, 12),
        (11, 12), (12, 13), (12, 14), (13, 15), (14, 15),
        (15, 16), (15, 17), (16, 17),
    ];
    let (mut net, _) = with_random_nodes(18, lower, upper, rng)?;
    for (a, b) in EDGES {
        net.add_edge(NodeId::new(a), NodeId::new(b))?;
    }
    net.set_entry_nodes([NodeId::new(0), NodeId::new(1)])?;
    net.set_high_value_nodes([NodeId::new(16)])?;
    Ok(net)
}
