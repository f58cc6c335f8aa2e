pub mod red;
pub mod blue;

pub use blue::{BlueAgent, BlueTarget};
pub use red::{RedActionRecord, RedAgent};

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedActionKind {
    DoNothing,
    Spread,
    RandomInfect,
    BasicAttack,
    ZeroDay,
    Move,
    /// Spreading that happens on its own every turn, next to the chosen action.
    NaturalSpread,
    /// The chosen action had nothing to act on.
    NoPossibleTargets,
}

impl RedActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DoNothing => "do_nothing",
            Self::Spread => "spread",
            Self::RandomInfect => "random_infect",
            Self::BasicAttack => "basic_attack",
            Self::ZeroDay => "zero_day",
            Self::Move => "move",
            Self::NaturalSpread => "natural_spread",
            Self::NoPossibleTargets => "no_possible_targets",
        }
    }
}

impl fmt::Display for RedActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlueActionKind {
    ReduceVulnerability,
    RestoreNode,
    MakeNodeSafe,
    Isolate,
    Reconnect,
    Scan,
    DoNothing,
    AddDeceptiveNode,
    /// Red won before blue got to move.
    Failed,
}

impl BlueActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ReduceVulnerability => "reduce_vulnerability",
            Self::RestoreNode => "restore_node",
            Self::MakeNodeSafe => "make_node_safe",
            Self::Isolate => "isolate",
            Self::Reconnect => "reconnect",
            Self::Scan => "scan",
            Self::DoNothing => "do_nothing",
            Self::AddDeceptiveNode => "add_deceptive_node",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for BlueActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
