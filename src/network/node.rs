use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable arena index of a node. Edges, special-node sets and attack records
/// all refer to nodes through this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: Option<String>,
    pub x: f64,
    pub y: f64,

    // Baseline, what a full restore returns to
    vulnerability: f64,
    vulnerability_score: f64,

    pub true_compromised: bool,
    pub blue_view_compromised: bool,
    pub isolated: bool,
    pub deceptive: bool,
    pub entry_node: bool,
    pub high_value_node: bool,
}

impl Node {
    pub fn new(id: NodeId, vulnerability: f64) -> Self {
        let vulnerability = vulnerability.clamp(0.0, 1.0);
        Self {
            id,
            name: None,
            x: 0.0,
            y: 0.0,
            vulnerability,
            vulnerability_score: vulnerability,
            true_compromised: false,
            blue_view_compromised: false,
            isolated: false,
            deceptive: false,
            entry_node: false,
            high_value_node: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn vulnerability(&self) -> f64 {
        self.vulnerability
    }

    pub fn vulnerability_score(&self) -> f64 {
        self.vulnerability_score
    }

    /// Sets the current score; always kept within [0, 1].
    pub fn set_vulnerability_score(&mut self, score: f64) {
        self.vulnerability_score = score.clamp(0.0, 1.0);
    }

    /// Replaces both baseline and current score (used when re-randomising).
    pub fn set_vulnerability(&mut self, vulnerability: f64) {
        self.vulnerability = vulnerability.clamp(0.0, 1.0);
        self.vulnerability_score = self.vulnerability;
    }

    pub fn reset_vulnerability(&mut self) {
        self.vulnerability_score = self.vulnerability;
    }

    /// Clears compromise and isolation, keeping identity and flags.
    pub fn reset_state(&mut self) {
        self.true_compromised = false;
        self.blue_view_compromised = false;
        self.isolated = false;
        self.vulnerability_score = self.vulnerability;
    }

    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.id.to_string(),
        }
    }
}
