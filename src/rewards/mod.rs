//! Reward functions, selectable by name from `rewards.reward_function`.
//!
//! Every function is pure: the same [`RewardArgs`] always give the same
//! reward. `start` is the state after red moved and `end` the state after
//! blue answered.
//!
//! `standard_rewards` constants:
//!
//! | action               | cost |
//! |----------------------|------|
//! | reduce_vulnerability | 0.5  |
//! | restore_node         | 1.0  |
//! | make_node_safe       | 0.5  |
//! | scan                 | 0.0  |
//! | isolate              | 10.0 |
//! | reconnect            | 0.0  |
//! | add_deceptive_node   | 8.0  |
//! | do_nothing           | 0.5 + 0.1 per compromised node |
//!
//! On top of the cost: +5 per node recovered, scaled by `exp(-0.004 * p)`
//! where `p` is the percentage of nodes still compromised; -3 for a make
//! safe or restore that recovered nothing; -1 for a vulnerability reduction
//! that changed nothing; +5 per unit of vulnerability removed (ignored when
//! red ignores defences); +1 per intrusion a scan revealed; -2 for moving a
//! deceptive node once the pool is exhausted.

mod functions;

pub use functions::*;

use crate::agents::BlueActionKind;
use crate::network::{NodeId, Snapshot};
use std::collections::HashMap;
use std::sync::OnceLock;

pub const DEFAULT_REWARD_FUNCTION: &str = "standard_rewards";

/// Everything a reward function gets to see about one blue turn.
#[derive(Debug, Clone)]
pub struct RewardArgs<'a> {
    pub blue_action: BlueActionKind,
    pub blue_node: Option<NodeId>,
    pub start: &'a Snapshot,
    pub end: &'a Snapshot,
    pub red_ignores_defences: bool,
    /// The deceptive pool was full before blue acted.
    pub deceptive_pool_exhausted: bool,
}

pub type RewardFn = fn(&RewardArgs<'_>) -> f64;

pub struct RewardRegistry {
    functions: HashMap<String, RewardFn>,
}

impl RewardRegistry {
    pub fn new() -> Self {
        let mut registry = Self { functions: HashMap::new() };
        registry.register_builtin();
        registry
    }

    fn register_builtin(&mut self) {
        self.register("standard_rewards", standard_rewards);
        self.register("safe_nodes_give_rewards", safe_nodes_give_rewards);
        self.register("punish_bad_actions", punish_bad_actions);
        self.register("one_per_timestep", one_per_timestep);
        self.register("zero_reward", zero_reward);
        self.register("dcbo_cost_func", dcbo_cost_func);
    }

    pub fn register(&mut self, name: &str, function: RewardFn) {
        self.functions.insert(name.to_lowercase(), function);
    }

    pub fn get(&self, name: &str) -> Option<RewardFn> {
        self.functions.get(&name.to_lowercase()).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(&name.to_lowercase())
    }

    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn global() -> &'static RewardRegistry {
        static REGISTRY: OnceLock<RewardRegistry> = OnceLock::new();
        REGISTRY.get_or_init(RewardRegistry::new)
    }
}

impl Default for RewardRegistry {
    fn default() -> Self {
        Self::new()
    }
}
