pub mod logger;
pub mod analyzer;

use crate::simulation::LossReason;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use parking_lot::RwLock;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeOutcome {
    BlueWin,
    RedWin,
}

/// One finished episode, one CSV row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub episode: usize,
    pub seed: u64,
    pub steps: u32,
    pub total_reward: f64,
    pub outcome: EpisodeOutcome,
    pub loss_reason: Option<LossReason>,
    pub compromised_at_end: usize,
    pub deceptive_nodes_placed: usize,
}

/// Totals so far, for progress reporting while episodes are still running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub elapsed_s: f64,
    pub episodes: usize,
    pub blue_wins: usize,
    pub avg_reward: f64,
}

/// Shared sink for episode summaries. Cloning is cheap and every clone
/// writes to the same store, so parallel workers each hold one.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    inner: Arc<RwLock<MetricsInner>>,
    start_time: Instant,
}

#[derive(Debug, Default)]
struct MetricsInner {
    summaries: Vec<EpisodeSummary>,
    total_reward: f64,
    blue_wins: usize,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MetricsInner::default())),
            start_time: Instant::now(),
        }
    }

    pub fn record(&self, summary: EpisodeSummary) {
        if !summary.total_reward.is_finite() {
            warn!("Episode {} finished with a non finite reward, dropping it", summary.episode);
            return;
        }
        let mut inner = self.inner.write();
        inner.total_reward += summary.total_reward;
        if summary.outcome == EpisodeOutcome::BlueWin {
            inner.blue_wins += 1;
        }
        inner.summaries.push(summary);
    }

    pub fn len(&self) -> usize {
        self.inner.read().summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.read();
        let episodes = inner.summaries.len();
        let avg_reward = if episodes > 0 {
            inner.total_reward / episodes as f64
        } else {
            0.0
        };
        MetricsSnapshot {
            elapsed_s: self.start_time.elapsed().as_secs_f64(),
            episodes,
            blue_wins: inner.blue_wins,
            avg_reward,
        }
    }

    /// Summaries in episode order, whatever order the workers finished in.
    pub fn get_summaries(&self) -> Vec<EpisodeSummary> {
        let mut summaries = self.inner.read().summaries.clone();
        summaries.sort_by_key(|s| s.episode);
        summaries
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) fn summary(episode: usize, outcome: EpisodeOutcome, reward: f64, steps: u32) -> EpisodeSummary {
    EpisodeSummary {
        episode,
        seed: episode as u64,
        steps,
        total_reward: reward,
        outcome,
        loss_reason: match outcome {
            EpisodeOutcome::BlueWin => None,
            EpisodeOutcome::RedWin => Some(LossReason::HighValueNodeLost),
        },
        compromised_at_end: if outcome == EpisodeOutcome::RedWin { 3 } else { 1 },
        deceptive_nodes_placed: 0,
    }
}
