use crate::error::ConfigError;
use crate::network::{Network, NodeId};
use crate::rewards::RewardRegistry;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Fully resolved game mode. Every section falls back to its defaults, so a
/// JSON document only has to mention the settings it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GameMode {
    pub red: RedConfig,
    pub blue: BlueConfig,
    pub game_rules: GameRules,
    pub observation_space: ObservationSpace,
    pub on_reset: OnReset,
    pub rewards: RewardsConfig,
    pub miscellaneous: Miscellaneous,
}

// ---- red ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackSource {
    /// Red only attacks from its single main node.
    OnlyMainNode,
    /// Every compromised node is a launch point.
    AnyNode,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TargetMechanism {
    Random,
    PrioritiseConnected,
    PrioritiseUnconnected,
    PrioritiseVulnerable,
    PrioritiseResilient,
    TargetSpecificNode {
        #[serde(default)]
        target: Option<NodeId>,
        #[serde(default)]
        always_shortest: bool,
    },
}

impl TargetMechanism {
    pub fn uses_vulnerability(&self) -> bool {
        matches!(self, Self::PrioritiseVulnerable | Self::PrioritiseResilient)
    }

    pub fn is_target_specific(&self) -> bool {
        matches!(self, Self::TargetSpecificNode { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LikelihoodAction {
    #[serde(rename = "use")]
    pub enabled: bool,
    pub likelihood: f64,
}

impl LikelihoodAction {
    pub fn weight(&self) -> f64 {
        if self.enabled { self.likelihood.max(0.0) } else { 0.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChanceAction {
    #[serde(rename = "use")]
    pub enabled: bool,
    pub likelihood: f64,
    /// Chance that each candidate node is compromised.
    pub chance: f64,
}

impl ChanceAction {
    pub fn weight(&self) -> f64 {
        if self.enabled { self.likelihood.max(0.0) } else { 0.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZeroDayAction {
    #[serde(rename = "use")]
    pub enabled: bool,
    pub likelihood: f64,
    pub start_amount: u32,
    /// Turns needed to earn one more zero day.
    pub days_required: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedActionSet {
    pub spread: ChanceAction,
    pub random_infect: ChanceAction,
    #[serde(rename = "move")]
    pub movement: LikelihoodAction,
    pub basic_attack: LikelihoodAction,
    pub do_nothing: LikelihoodAction,
    pub zero_day: ZeroDayAction,
}

impl Default for RedActionSet {
    fn default() -> Self {
        Self {
            spread: ChanceAction { enabled: false, likelihood: 0.1, chance: 0.1 },
            random_infect: ChanceAction { enabled: false, likelihood: 0.1, chance: 0.1 },
            movement: LikelihoodAction { enabled: false, likelihood: 0.1 },
            basic_attack: LikelihoodAction { enabled: true, likelihood: 1.0 },
            do_nothing: LikelihoodAction { enabled: true, likelihood: 0.1 },
            zero_day: ZeroDayAction { enabled: false, likelihood: 0.1, start_amount: 0, days_required: 10 },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedConfig {
    pub skill: f64,
    pub use_skill: bool,
    pub ignores_defences: bool,
    pub always_succeeds: bool,
    pub attack_from: AttackSource,
    pub naturally_spread: bool,
    pub chance_to_spread_to_connected_node: f64,
    pub chance_to_spread_to_unconnected_node: f64,
    pub action_set: RedActionSet,
    pub target_mechanism: TargetMechanism,
}

impl Default for RedConfig {
    fn default() -> Self {
        Self {
            skill: 0.5,
            use_skill: true,
            ignores_defences: false,
            always_succeeds: false,
            attack_from: AttackSource::AnyNode,
            naturally_spread: true,
            chance_to_spread_to_connected_node: 0.01,
            chance_to_spread_to_unconnected_node: 0.005,
            action_set: RedActionSet::default(),
            target_mechanism: TargetMechanism::Random,
        }
    }
}

impl RedConfig {
    /// Skill handed to the interface for each attack.
    pub fn effective_skill(&self) -> f64 {
        if self.use_skill { self.skill } else { 1.0 }
    }
}

// ---- blue ----

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum VulnerabilityOnSafe {
    Unchanged,
    /// Signed shift, clamped to the network bounds.
    Shift { change: f64 },
    /// Uniform redraw within the network bounds.
    Randomise,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MakeNodeSafe {
    #[serde(rename = "use")]
    pub enabled: bool,
    pub on_safe: VulnerabilityOnSafe,
}

impl Default for MakeNodeSafe {
    fn default() -> Self {
        Self { enabled: true, on_safe: VulnerabilityOnSafe::Unchanged }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeceptiveNodes {
    #[serde(rename = "use")]
    pub enabled: bool,
    pub max_number: usize,
    /// A compromised node that gets moved comes back as a fresh one.
    pub new_node_on_relocate: bool,
    pub allow_relocation: bool,
}

impl Default for DeceptiveNodes {
    fn default() -> Self {
        Self { enabled: false, max_number: 2, new_node_on_relocate: true, allow_relocation: true }
    }
}

impl DeceptiveNodes {
    pub fn capacity(&self) -> usize {
        if self.enabled { self.max_number } else { 0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlueActionSet {
    pub reduce_vulnerability: bool,
    pub restore_node: bool,
    pub make_node_safe: MakeNodeSafe,
    pub scan: bool,
    pub isolate_node: bool,
    pub reconnect_node: bool,
    pub do_nothing: bool,
    pub deceptive_nodes: DeceptiveNodes,
}

impl Default for BlueActionSet {
    fn default() -> Self {
        Self {
            reduce_vulnerability: true,
            restore_node: true,
            make_node_safe: MakeNodeSafe::default(),
            scan: true,
            isolate_node: true,
            reconnect_node: true,
            do_nothing: true,
            deceptive_nodes: DeceptiveNodes::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryChance {
    pub standard_node: f64,
    pub deceptive_node: f64,
}

impl DiscoveryChance {
    pub fn for_node(&self, deceptive: bool) -> f64 {
        if deceptive { self.deceptive_node } else { self.standard_node }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntrusionDiscovery {
    pub immediate: DiscoveryChance,
    pub on_scan: DiscoveryChance,
}

impl Default for IntrusionDiscovery {
    fn default() -> Self {
        Self {
            immediate: DiscoveryChance { standard_node: 0.5, deceptive_node: 1.0 },
            on_scan: DiscoveryChance { standard_node: 0.7, deceptive_node: 1.0 },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackDiscoveryRule {
    #[serde(rename = "use")]
    pub enabled: bool,
    pub standard_node: f64,
    pub deceptive_node: f64,
}

impl AttackDiscoveryRule {
    pub fn chance(&self, deceptive: bool) -> f64 {
        match (self.enabled, deceptive) {
            (false, _) => 0.0,
            (true, true) => self.deceptive_node,
            (true, false) => self.standard_node,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackDiscovery {
    pub failed_attacks: AttackDiscoveryRule,
    pub succeeded_attacks_known_compromise: AttackDiscoveryRule,
    pub succeeded_attacks_unknown_compromise: AttackDiscoveryRule,
}

impl Default for AttackDiscovery {
    fn default() -> Self {
        Self {
            failed_attacks: AttackDiscoveryRule { enabled: false, standard_node: 0.5, deceptive_node: 1.0 },
            succeeded_attacks_known_compromise: AttackDiscoveryRule {
                enabled: true,
                standard_node: 1.0,
                deceptive_node: 1.0,
            },
            succeeded_attacks_unknown_compromise: AttackDiscoveryRule {
                enabled: false,
                standard_node: 0.5,
                deceptive_node: 1.0,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BlueConfig {
    pub action_set: BlueActionSet,
    pub intrusion_discovery_chance: IntrusionDiscovery,
    pub attack_discovery: AttackDiscovery,
}

// ---- game rules ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryNodePlacement {
    Random,
    /// Highest degree first.
    PreferCentral,
    /// Lowest degree first.
    PreferEdge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighValuePlacement {
    Random,
    FurthestFromEntry,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRules {
    pub min_number_of_network_nodes: usize,
    pub node_vulnerability_lower_bound: f64,
    pub node_vulnerability_upper_bound: f64,
    pub max_steps: u32,
    pub lose_when_all_nodes_lost: bool,
    pub lose_when_n_percent_of_nodes_lost: bool,
    pub percentage_of_nodes_compromised_equals_loss: f64,
    pub lose_when_high_value_node_lost: bool,
    pub lose_when_target_node_lost: bool,
    pub number_of_high_value_nodes: usize,
    pub high_value_node_placement: HighValuePlacement,
    pub number_of_entry_nodes: usize,
    pub entry_node_placement: EntryNodePlacement,
    pub grace_period_length: u32,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            min_number_of_network_nodes: 2,
            node_vulnerability_lower_bound: 0.2,
            node_vulnerability_upper_bound: 0.8,
            max_steps: 500,
            lose_when_all_nodes_lost: false,
            lose_when_n_percent_of_nodes_lost: true,
            percentage_of_nodes_compromised_equals_loss: 0.8,
            lose_when_high_value_node_lost: true,
            lose_when_target_node_lost: false,
            number_of_high_value_nodes: 1,
            high_value_node_placement: HighValuePlacement::Random,
            number_of_entry_nodes: 1,
            entry_node_placement: EntryNodePlacement::Random,
            grace_period_length: 0,
        }
    }
}

// ---- observation / reset / rewards / misc ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservationSpace {
    pub node_connections: bool,
    pub compromised_status: bool,
    pub vulnerabilities: bool,
    pub average_vulnerability: bool,
    pub graph_connectivity: bool,
    pub attacking_nodes: bool,
    pub attacked_nodes: bool,
    pub special_nodes: bool,
    pub red_agent_skill: bool,
}

impl Default for ObservationSpace {
    fn default() -> Self {
        Self {
            node_connections: true,
            compromised_status: true,
            vulnerabilities: true,
            average_vulnerability: false,
            graph_connectivity: false,
            attacking_nodes: true,
            attacked_nodes: true,
            special_nodes: true,
            red_agent_skill: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OnReset {
    pub randomise_vulnerabilities: bool,
    pub choose_new_high_value_nodes: bool,
    pub choose_new_entry_nodes: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardsConfig {
    pub reward_function: String,
    pub rewards_for_loss: f64,
    pub rewards_for_reaching_max_steps: f64,
    pub end_rewards_are_multiplied_by_end_state: bool,
    pub reduce_negative_rewards_for_closer_fails: bool,
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            reward_function: "standard_rewards".to_string(),
            rewards_for_loss: -100.0,
            rewards_for_reaching_max_steps: 100.0,
            end_rewards_are_multiplied_by_end_state: true,
            reduce_negative_rewards_for_closer_fails: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Miscellaneous {
    pub random_seed: Option<u64>,
    pub output_timestep_data: bool,
    pub collect_additional_per_ts_data: bool,
}

fn probability(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ProbabilityOutOfRange { name, value })
    }
}

fn discovery_order(name: &'static str, chance: &DiscoveryChance) -> Result<(), ConfigError> {
    probability(name, chance.standard_node)?;
    probability(name, chance.deceptive_node)?;
    if chance.deceptive_node < chance.standard_node {
        return Err(ConfigError::DeceptiveChanceBelowStandard {
            name,
            standard: chance.standard_node,
            deceptive: chance.deceptive_node,
        });
    }
    Ok(())
}

impl GameMode {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let mode: GameMode = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        mode.validate()?;
        Ok(mode)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json_str(&content)?)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.miscellaneous.random_seed = Some(seed);
        self
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.game_rules.max_steps = max_steps;
        self
    }

    pub fn with_grace_period(mut self, turns: u32) -> Self {
        self.game_rules.grace_period_length = turns;
        self
    }

    pub fn with_reward_function(mut self, name: impl Into<String>) -> Self {
        self.rewards.reward_function = name.into();
        self
    }

    pub fn with_deceptive_nodes(mut self, max_number: usize) -> Self {
        self.blue.action_set.deceptive_nodes.enabled = true;
        self.blue.action_set.deceptive_nodes.max_number = max_number;
        self
    }

    /// Red that only spreads by itself, every chosen action disabled.
    pub fn with_only_natural_spread(mut self, connected: f64, unconnected: f64) -> Self {
        let set = &mut self.red.action_set;
        set.spread.enabled = false;
        set.random_infect.enabled = false;
        set.movement.enabled = false;
        set.basic_attack.enabled = false;
        set.zero_day.enabled = false;
        set.do_nothing = LikelihoodAction { enabled: true, likelihood: 1.0 };
        self.red.naturally_spread = true;
        self.red.chance_to_spread_to_connected_node = connected;
        self.red.chance_to_spread_to_unconnected_node = unconnected;
        self
    }

    /// Checks every network independent rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let red = &self.red;
        let set = &red.action_set;

        probability("red.skill", red.skill)?;
        probability("red.chance_to_spread_to_connected_node", red.chance_to_spread_to_connected_node)?;
        probability("red.chance_to_spread_to_unconnected_node", red.chance_to_spread_to_unconnected_node)?;
        probability("red.action_set.spread.chance", set.spread.chance)?;
        probability("red.action_set.random_infect.chance", set.random_infect.chance)?;

        let likelihoods = [
            ("red.action_set.spread.likelihood", set.spread.likelihood),
            ("red.action_set.random_infect.likelihood", set.random_infect.likelihood),
            ("red.action_set.move.likelihood", set.movement.likelihood),
            ("red.action_set.basic_attack.likelihood", set.basic_attack.likelihood),
            ("red.action_set.do_nothing.likelihood", set.do_nothing.likelihood),
            ("red.action_set.zero_day.likelihood", set.zero_day.likelihood),
        ];
        for (name, value) in likelihoods {
            if value < 0.0 {
                return Err(ConfigError::Negative { name, value });
            }
        }

        let any_red_action = set.spread.enabled
            || set.random_infect.enabled
            || set.movement.enabled
            || set.basic_attack.enabled
            || set.do_nothing.enabled
            || set.zero_day.enabled;
        if !any_red_action {
            return Err(ConfigError::NoRedAction);
        }
        if set.zero_day.enabled && set.zero_day.days_required == 0 {
            return Err(ConfigError::ZeroDayWithoutRecharge);
        }
        if red.ignores_defences && red.target_mechanism.uses_vulnerability() {
            return Err(ConfigError::IgnoresDefencesWithVulnerabilityPriority);
        }

        let blue = &self.blue.action_set;
        if blue.isolate_node != blue.reconnect_node {
            return Err(ConfigError::IsolateWithoutReconnect);
        }
        if blue.deceptive_nodes.enabled && blue.deceptive_nodes.max_number == 0 {
            return Err(ConfigError::NoDeceptiveCapacity);
        }
        let any_blue_action = blue.reduce_vulnerability
            || blue.restore_node
            || blue.make_node_safe.enabled
            || blue.scan
            || blue.isolate_node
            || blue.do_nothing
            || blue.deceptive_nodes.enabled;
        if !any_blue_action {
            return Err(ConfigError::NoBlueAction);
        }

        discovery_order("blue.intrusion_discovery_chance.immediate", &self.blue.intrusion_discovery_chance.immediate)?;
        discovery_order("blue.intrusion_discovery_chance.on_scan", &self.blue.intrusion_discovery_chance.on_scan)?;
        let attack = &self.blue.attack_discovery;
        for (name, rule) in [
            ("blue.attack_discovery.failed_attacks", &attack.failed_attacks),
            ("blue.attack_discovery.succeeded_attacks_known_compromise", &attack.succeeded_attacks_known_compromise),
            ("blue.attack_discovery.succeeded_attacks_unknown_compromise", &attack.succeeded_attacks_unknown_compromise),
        ] {
            probability(name, rule.standard_node)?;
            probability(name, rule.deceptive_node)?;
        }

        let rules = &self.game_rules;
        probability("game_rules.node_vulnerability_lower_bound", rules.node_vulnerability_lower_bound)?;
        probability("game_rules.node_vulnerability_upper_bound", rules.node_vulnerability_upper_bound)?;
        if rules.node_vulnerability_lower_bound > rules.node_vulnerability_upper_bound {
            return Err(ConfigError::InvertedBounds {
                lower: rules.node_vulnerability_lower_bound,
                upper: rules.node_vulnerability_upper_bound,
            });
        }
        if rules.max_steps == 0 {
            return Err(ConfigError::NoSteps);
        }
        if rules.grace_period_length > rules.max_steps {
            return Err(ConfigError::GraceExceedsMaxSteps {
                grace: rules.grace_period_length,
                max_steps: rules.max_steps,
            });
        }
        probability(
            "game_rules.percentage_of_nodes_compromised_equals_loss",
            rules.percentage_of_nodes_compromised_equals_loss,
        )?;
        let target_loss = rules.lose_when_target_node_lost && red.target_mechanism.is_target_specific();
        if !(rules.lose_when_all_nodes_lost
            || rules.lose_when_n_percent_of_nodes_lost
            || (rules.lose_when_high_value_node_lost && rules.number_of_high_value_nodes > 0)
            || target_loss)
        {
            return Err(ConfigError::NoLossCondition);
        }

        if !RewardRegistry::global().contains(&self.rewards.reward_function) {
            return Err(ConfigError::UnknownRewardFunction(self.rewards.reward_function.clone()));
        }
        Ok(())
    }

    /// Network dependent rules. Preset entry and high value nodes satisfy
    /// their counts unless a reset asks for new ones.
    pub fn validate_against(&self, network: &Network) -> Result<(), ConfigError> {
        let rules = &self.game_rules;
        if network.len() < rules.min_number_of_network_nodes.max(1) {
            return Err(ConfigError::TooFewNodes {
                required: rules.min_number_of_network_nodes.max(1),
                actual: network.len(),
            });
        }

        let picks_entry = network.entry_nodes().is_empty() || self.on_reset.choose_new_entry_nodes;
        if picks_entry && (rules.number_of_entry_nodes == 0 || rules.number_of_entry_nodes > network.len()) {
            return Err(ConfigError::TooManySpecialNodes {
                kind: "entry",
                requested: rules.number_of_entry_nodes,
                available: network.len(),
            });
        }

        let picks_high_value = network.high_value_nodes().is_empty() || self.on_reset.choose_new_high_value_nodes;
        if rules.lose_when_high_value_node_lost && picks_high_value && rules.number_of_high_value_nodes > network.len() {
            return Err(ConfigError::TooManySpecialNodes {
                kind: "high value",
                requested: rules.number_of_high_value_nodes,
                available: network.len(),
            });
        }

        if let TargetMechanism::TargetSpecificNode { target: Some(target), .. } = self.red.target_mechanism {
            if !network.contains(target) {
                return Err(ConfigError::UnknownTarget(target));
            }
        }
        Ok(())
    }
}
