use super::{Environment, GameMode, Outcome};
use crate::agents::BlueActionKind;
use crate::metrics::analyzer::{self, AnalysisReport};
use crate::metrics::logger::SummaryLogger;
use crate::metrics::{EpisodeOutcome, EpisodeSummary, MetricsCollector};
use crate::network::generators::Topology;
use crate::network::NodeFilter;
use crate::strategies::PolicyRegistry;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// A batch of independent episodes played by one scripted blue policy.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub name: String,
    pub policy_name: String,
    pub episodes: usize,
    pub workers: usize,
    pub seed: u64,
    pub topology: Topology,
    pub nodes: usize,
    pub game_mode: GameMode,
    pub output_dir: PathBuf,
}

impl RunConfig {
    pub fn new(policy_name: impl Into<String>) -> Self {
        let policy_name = policy_name.into();
        Self {
            name: policy_name.clone(),
            policy_name,
            episodes: 100,
            workers: 4,
            seed: 0,
            topology: Topology::Mesh,
            nodes: 10,
            game_mode: GameMode::default(),
            output_dir: PathBuf::from("results"),
        }
    }

    pub fn with_episodes(mut self, episodes: usize) -> Self {
        self.episodes = episodes;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_network(mut self, topology: Topology, nodes: usize) -> Self {
        self.topology = topology;
        self.nodes = nodes;
        self
    }

    pub fn with_game_mode(mut self, game_mode: GameMode) -> Self {
        self.game_mode = game_mode;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Episode `n` always plays with the same seed, whichever worker runs it.
    pub fn episode_seed(&self, episode: usize) -> u64 {
        self.seed.wrapping_add(episode as u64)
    }
}

pub struct Simulation {
    config: RunConfig,
    pub metrics: MetricsCollector,
}

impl Simulation {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            metrics: MetricsCollector::new(),
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Plays every episode, one environment per episode, spread over
    /// `workers` threads.
    pub fn run(&mut self) -> Result<()> {
        info!("Starting run: {}", self.config.name);
        info!("Policy: {}", self.config.policy_name);
        info!("Episodes: {}, Workers: {}", self.config.episodes, self.config.workers);
        info!("Network: {} ({} nodes), seed {}", self.config.topology, self.config.nodes, self.config.seed);

        if !PolicyRegistry::global().contains(&self.config.policy_name) {
            anyhow::bail!("Unknown policy: {}", self.config.policy_name);
        }
        self.config.game_mode.validate()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers.max(1))
            .build()?;

        let pb = ProgressBar::new(self.config.episodes as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.orange/yellow} {pos}/{len} {msg}")?
                .progress_chars("█▓░"),
        );

        let config = &self.config;
        let metrics = &self.metrics;
        pool.install(|| {
            (0..config.episodes).into_par_iter().try_for_each(|episode| -> Result<()> {
                let summary = run_episode(config, episode)?;
                metrics.record(summary);
                pb.inc(1);
                let snapshot = metrics.snapshot();
                pb.set_message(format!(
                    "Blue wins: {:.1}% | Avg reward: {:.2}",
                    100.0 * snapshot.blue_wins as f64 / snapshot.episodes.max(1) as f64,
                    snapshot.avg_reward
                ));
                Ok(())
            })
        })?;

        pb.finish_with_message("Run complete");
        Ok(())
    }

    pub fn report(&self) -> AnalysisReport {
        analyzer::analyze(&self.metrics.get_summaries(), &self.config.policy_name)
    }

    /// Writes the summaries as CSV and the analysis as JSON, both stamped
    /// with the local time.
    pub fn save_results(&self) -> Result<AnalysisReport> {
        let summaries = self.metrics.get_summaries();
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let dir = &self.config.output_dir;

        std::fs::create_dir_all(dir)?;

        let csv_path = dir.join(format!("{}_{}.csv", self.config.name, timestamp));
        let mut logger = SummaryLogger::new(&csv_path)?;
        logger.log_batch(&summaries)?;
        let rows = logger.finish()?;
        info!("{} episodes saved to: {}", rows, csv_path.display());

        let report = analyzer::analyze(&summaries, &self.config.policy_name);
        let json_path = dir.join(format!("{}_{}_analysis.json", self.config.name, timestamp));
        std::fs::write(&json_path, serde_json::to_string_pretty(&report)?)?;
        info!("Analysis saved to: {}", json_path.display());

        info!("Blue win rate: {:.2}%", report.blue_win_rate * 100.0);
        info!("Avg reward: {:.2}", report.avg_reward);
        info!("Avg length: {:.1} steps", report.avg_length);

        Ok(report)
    }
}

/// Builds a fresh network, environment and policy for `episode` and plays it
/// to the end.
pub fn run_episode(config: &RunConfig, episode: usize) -> Result<EpisodeSummary> {
    let seed = config.episode_seed(episode);
    let rules = &config.game_mode.game_rules;
    let mut rng = StdRng::seed_from_u64(seed);
    let network = config
        .topology
        .build(
            config.nodes,
            rules.node_vulnerability_lower_bound,
            rules.node_vulnerability_upper_bound,
            &mut rng,
        )
        .with_context(|| format!("building {} network for episode {}", config.topology, episode))?;

    let mut env = Environment::new(config.game_mode.clone().with_seed(seed), network)?;
    let mut policy = PolicyRegistry::global()
        .create(&config.policy_name, seed)
        .ok_or_else(|| anyhow::anyhow!("Unknown policy: {}", config.policy_name))?;

    env.reset()?;
    policy.reset();
    let mut total_reward = 0.0;
    let mut deceptive_nodes_placed = 0;
    let outcome = loop {
        let action = policy.choose_action(&env);
        let step = env.step(action)?;
        total_reward += step.reward;
        if step.info.blue_action == BlueActionKind::AddDeceptiveNode {
            deceptive_nodes_placed += 1;
        }
        if let Some(outcome) = step.info.outcome {
            break outcome;
        }
    };

    let compromised_at_end = env
        .network_interface()
        .get_nodes(NodeFilter::all().true_compromised().not_deceptive())
        .len();
    let (outcome, loss_reason) = match outcome {
        Outcome::Blue => (EpisodeOutcome::BlueWin, None),
        Outcome::Red { reason } => (EpisodeOutcome::RedWin, Some(reason)),
    };
    debug!("Episode {} ({}) finished after {} steps: {:?}", episode, policy.name(), env.current_duration(), outcome);

    Ok(EpisodeSummary {
        episode,
        seed,
        steps: env.current_duration(),
        total_reward,
        outcome,
        loss_reason,
        compromised_at_end,
        deceptive_nodes_placed,
    })
}
