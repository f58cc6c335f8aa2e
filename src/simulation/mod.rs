pub mod config;
pub mod runner;

pub use config::GameMode;
pub use runner::{RunConfig, Simulation};

use crate::agents::{BlueActionKind, BlueAgent, BlueTarget, RedActionRecord, RedAgent};
use crate::error::{ConfigError, EnvError, NetworkError};
use crate::network::{Network, NetworkInterface, NodeFilter, Snapshot};
use crate::rewards::{RewardArgs, RewardFn, RewardRegistry};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossReason {
    AllNodesLost,
    PercentageOfNodesLost,
    HighValueNodeLost,
    TargetNodeLost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "winner")]
pub enum Outcome {
    Blue,
    Red { reason: LossReason },
}

/// Everything a step reports besides observation, reward and done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    pub blue_action: BlueActionKind,
    pub blue_node: BlueTarget,
    pub red_info: Vec<RedActionRecord>,
    pub outcome: Option<Outcome>,
    /// Filled only with `miscellaneous.collect_additional_per_ts_data`.
    pub start_state: Option<Snapshot>,
    pub post_red_state: Option<Snapshot>,
    pub end_state: Option<Snapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub observation: Vec<f64>,
    pub reward: f64,
    pub done: bool,
    pub info: StepInfo,
}

/// One episode at a time of red against an externally driven blue.
///
/// Owns its network interface, both agents and the RNG, so independent
/// environments can run on separate threads.
pub struct Environment {
    game_mode: Arc<GameMode>,
    interface: NetworkInterface,
    red: RedAgent,
    blue: BlueAgent,
    reward_fn: RewardFn,
    rng: StdRng,
    seed: u64,
    current_duration: u32,
    done: bool,
}

impl Environment {
    /// Validates the game mode against the network and builds the episode.
    /// Without `miscellaneous.random_seed` the seed comes from OS entropy.
    pub fn new(game_mode: GameMode, network: Network) -> Result<Self, EnvError> {
        game_mode.validate()?;
        let reward_fn = RewardRegistry::global()
            .get(&game_mode.rewards.reward_function)
            .ok_or_else(|| ConfigError::UnknownRewardFunction(game_mode.rewards.reward_function.clone()))?;
        let seed = game_mode
            .miscellaneous
            .random_seed
            .unwrap_or_else(|| StdRng::from_entropy().next_u64());
        let mut rng = StdRng::seed_from_u64(seed);

        let game_mode = Arc::new(game_mode);
        let interface = NetworkInterface::new(game_mode.clone(), network, &mut rng)?;
        let red = RedAgent::new(game_mode.clone());
        let blue = BlueAgent::new(game_mode.clone(), &interface);
        debug!(
            "Environment ready: {} nodes, {} blue actions, seed {}",
            interface.standard_node_count(),
            blue.action_space_size(),
            seed
        );

        Ok(Self {
            game_mode,
            interface,
            red,
            blue,
            reward_fn,
            rng,
            seed,
            current_duration: 0,
            done: false,
        })
    }

    pub fn game_mode(&self) -> &GameMode {
        &self.game_mode
    }

    pub fn network_interface(&self) -> &NetworkInterface {
        &self.interface
    }

    pub fn red_agent(&self) -> &RedAgent {
        &self.red
    }

    pub fn blue_agent(&self) -> &BlueAgent {
        &self.blue
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn current_duration(&self) -> u32 {
        self.current_duration
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn action_space_size(&self) -> usize {
        self.blue.action_space_size()
    }

    pub fn observation_size(&self) -> usize {
        self.interface.get_observation_size()
    }

    pub fn observation(&self) -> Vec<f64> {
        self.interface.get_current_observation()
    }

    /// Starts a new episode and returns its first observation.
    pub fn reset(&mut self) -> Result<Vec<f64>, NetworkError> {
        self.interface.reset(&mut self.rng)?;
        self.red.reset();
        self.current_duration = 0;
        self.done = false;
        Ok(self.observation())
    }

    /// Reseeds the RNG, then resets. Same seed and same actions give the
    /// same episode.
    pub fn reset_with_seed(&mut self, seed: u64) -> Result<Vec<f64>, NetworkError> {
        self.seed = seed;
        self.rng = StdRng::seed_from_u64(seed);
        self.reset()
    }

    /// Plays one red turn and, unless red won, blue's `action`.
    pub fn step(&mut self, action: usize) -> Result<StepOutcome, NetworkError> {
        if self.done {
            warn!("step called on a finished episode, reset first");
        }
        let collect = self.game_mode.miscellaneous.collect_additional_per_ts_data;
        let verbose = self.game_mode.miscellaneous.output_timestep_data;

        let start_state = collect.then(|| self.interface.snapshot());
        self.interface.reset_stored_attacks();

        let red_info = if self.current_duration < self.game_mode.game_rules.grace_period_length {
            vec![RedActionRecord::grace_period()]
        } else {
            self.red.perform_action(&mut self.interface, &mut self.rng)?
        };
        let post_red = self.interface.snapshot();
        if verbose {
            for record in &red_info {
                debug!(
                    "t={} red {} targets={:?} successes={:?}",
                    self.current_duration, record.action, record.target_nodes, record.successes
                );
            }
        }

        if let Some(reason) = self.loss_reason() {
            let rewards = &self.game_mode.rewards;
            let mut reward = rewards.rewards_for_loss;
            if rewards.reduce_negative_rewards_for_closer_fails {
                let max_steps = self.game_mode.game_rules.max_steps as f64;
                reward *= 1.0 - self.current_duration as f64 / max_steps;
            }
            self.done = true;
            if verbose {
                debug!("t={} red wins: {:?}", self.current_duration, reason);
            }
            return Ok(StepOutcome {
                observation: self.observation(),
                reward,
                done: true,
                info: StepInfo {
                    blue_action: BlueActionKind::Failed,
                    blue_node: BlueTarget::None,
                    red_info,
                    outcome: Some(Outcome::Red { reason }),
                    start_state,
                    post_red_state: collect.then_some(post_red.clone()),
                    end_state: collect.then_some(post_red),
                },
            });
        }

        let pool_exhausted = self.interface.reached_max_deceptive_nodes();
        let (blue_action, blue_node) = self.blue.perform_action(action, &mut self.interface, &mut self.rng)?;
        let end_state = self.interface.snapshot();
        if verbose {
            debug!("t={} blue {}", self.current_duration, self.blue.describe_action(action));
        }

        let mut reward = (self.reward_fn)(&RewardArgs {
            blue_action,
            blue_node: blue_node.node(),
            start: &post_red,
            end: &end_state,
            red_ignores_defences: self.game_mode.red.ignores_defences,
            deceptive_pool_exhausted: pool_exhausted,
        });

        self.current_duration += 1;
        let mut outcome = None;
        if self.current_duration >= self.game_mode.game_rules.max_steps {
            let rewards = &self.game_mode.rewards;
            reward = rewards.rewards_for_reaching_max_steps;
            if rewards.end_rewards_are_multiplied_by_end_state {
                reward *= self.safe_fraction();
            }
            self.done = true;
            outcome = Some(Outcome::Blue);
            if verbose {
                debug!("t={} blue survives", self.current_duration);
            }
        }

        Ok(StepOutcome {
            observation: self.observation(),
            reward,
            done: self.done,
            info: StepInfo {
                blue_action,
                blue_node,
                red_info,
                outcome,
                start_state,
                post_red_state: collect.then_some(post_red),
                end_state: collect.then_some(end_state),
            },
        })
    }

    /// First loss condition that holds, in priority order.
    fn loss_reason(&self) -> Option<LossReason> {
        let rules = &self.game_mode.game_rules;
        let ni = &self.interface;
        let total = ni.standard_node_count();
        let lost = ni.get_nodes(NodeFilter::all().true_compromised().not_deceptive()).len();

        if rules.lose_when_all_nodes_lost && total > 0 && lost == total {
            return Some(LossReason::AllNodesLost);
        }
        if rules.lose_when_n_percent_of_nodes_lost
            && total > 0
            && lost as f64 / total as f64 >= rules.percentage_of_nodes_compromised_equals_loss
        {
            return Some(LossReason::PercentageOfNodesLost);
        }
        let compromised = |id| ni.node(id).is_ok_and(|n| n.true_compromised);
        if rules.lose_when_high_value_node_lost && ni.high_value_nodes().into_iter().any(compromised) {
            return Some(LossReason::HighValueNodeLost);
        }
        if rules.lose_when_target_node_lost && ni.target_node().is_some_and(compromised) {
            return Some(LossReason::TargetNodeLost);
        }
        None
    }

    fn safe_fraction(&self) -> f64 {
        let total = self.interface.standard_node_count();
        if total == 0 {
            return 1.0;
        }
        let safe = self.interface.get_nodes(NodeFilter::all().true_safe().not_deceptive()).len();
        safe as f64 / total as f64
    }
}
