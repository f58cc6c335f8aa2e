// Flattened observation vector. Layout, in order, each part only when its
// observation_space flag is on:
//   adjacency matrix            padded x padded
//   compromised status (blue)   padded, -1 for empty deceptive slots
//   vulnerabilities             padded, -1 for empty deceptive slots
//   average vulnerability       1
//   graph connectivity          1
//   attacking nodes             padded
//   attacked nodes              padded
//   entry nodes, high value     padded + padded
//   red skill                   1
// `padded` is the node count plus the deceptive node capacity.

use super::interface::NetworkInterface;
use petgraph::unionfind::UnionFind;

const EMPTY_SLOT: f64 = -1.0;

pub fn size(interface: &NetworkInterface) -> usize {
    let space = interface.game_mode().observation_space;
    let n = interface.padded_node_count();
    let mut total = 0;
    if space.node_connections {
        total += n * n;
    }
    for (flag, len) in [
        (space.compromised_status, n),
        (space.vulnerabilities, n),
        (space.average_vulnerability, 1),
        (space.graph_connectivity, 1),
        (space.attacking_nodes, n),
        (space.attacked_nodes, n),
        (space.special_nodes, 2 * n),
        (space.red_agent_skill, 1),
    ] {
        if flag {
            total += len;
        }
    }
    total
}

pub fn encode(interface: &NetworkInterface) -> Vec<f64> {
    let mode = interface.game_mode();
    let space = mode.observation_space;
    let network = interface.network();
    let padded = interface.padded_node_count();
    let live = network.len();
    let mut obs = Vec::with_capacity(size(interface));

    if space.node_connections {
        let mut matrix = vec![0.0; padded * padded];
        for (a, b) in network.edges() {
            matrix[a.index() * padded + b.index()] = 1.0;
            matrix[b.index() * padded + a.index()] = 1.0;
        }
        obs.extend(matrix);
    }

    let per_node = |value: &dyn Fn(usize) -> f64, obs: &mut Vec<f64>| {
        for i in 0..padded {
            obs.push(if i < live { value(i) } else { EMPTY_SLOT });
        }
    };
    let nodes = network.nodes();

    if space.compromised_status {
        per_node(&|i| if nodes[i].blue_view_compromised { 1.0 } else { 0.0 }, &mut obs);
    }
    if space.vulnerabilities {
        per_node(&|i| nodes[i].vulnerability_score(), &mut obs);
    }
    if space.average_vulnerability {
        let avg = if live == 0 {
            0.0
        } else {
            nodes.iter().map(|n| n.vulnerability_score()).sum::<f64>() / live as f64
        };
        obs.push(avg);
    }
    if space.graph_connectivity {
        obs.push(connectivity(interface));
    }

    let detected = interface.detected_attacks();
    if space.attacking_nodes {
        let mut v = vec![0.0; padded];
        for record in detected {
            if let Some(attacker) = record.attacker {
                v[attacker.index()] = 1.0;
            }
        }
        obs.extend(v);
    }
    if space.attacked_nodes {
        let mut v = vec![0.0; padded];
        for record in detected {
            v[record.target.index()] = 1.0;
        }
        obs.extend(v);
    }
    if space.special_nodes {
        let mut entry = vec![0.0; padded];
        let mut high_value = vec![0.0; padded];
        for node in nodes {
            if node.entry_node {
                entry[node.id.index()] = 1.0;
            }
            if node.high_value_node {
                high_value[node.id.index()] = 1.0;
            }
        }
        obs.extend(entry);
        obs.extend(high_value);
    }
    if space.red_agent_skill {
        obs.push(mode.red.skill.clamp(0.0, 1.0));
    }
    obs
}

/// Fraction of node pairs of the live network that can reach each other.
pub fn connectivity(interface: &NetworkInterface) -> f64 {
    let network = interface.network();
    let n = network.len();
    if n < 2 {
        return 1.0;
    }
    let mut components = UnionFind::<usize>::new(n);
    for (a, b) in network.edges() {
        components.union(a.index(), b.index());
    }
    let mut sizes = vec![0usize; n];
    for i in 0..n {
        sizes[components.find(i)] += 1;
    }
    let connected_pairs: usize = sizes.iter().map(|s| s * s.saturating_sub(1) / 2).sum();
    connected_pairs as f64 / (n * (n - 1) / 2) as f64
}
