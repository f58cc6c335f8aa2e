use super::{EpisodeOutcome, EpisodeSummary};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub policy_name: String,
    pub episodes: usize,
    pub blue_win_rate: f64,
    pub avg_reward: f64,
    pub avg_length: f64,
    pub avg_compromised_at_end: f64,
    /// How red won, by loss reason name.
    pub loss_reasons: BTreeMap<String, usize>,
}

pub fn analyze(summaries: &[EpisodeSummary], policy_name: &str) -> AnalysisReport {
    if summaries.is_empty() {
        return AnalysisReport {
            policy_name: policy_name.to_string(),
            episodes: 0,
            blue_win_rate: 0.0,
            avg_reward: 0.0,
            avg_length: 0.0,
            avg_compromised_at_end: 0.0,
            loss_reasons: BTreeMap::new(),
        };
    }

    let n = summaries.len() as f64;
    let blue_wins = summaries.iter().filter(|s| s.outcome == EpisodeOutcome::BlueWin).count();

    let mut loss_reasons = BTreeMap::new();
    for reason in summaries.iter().filter_map(|s| s.loss_reason) {
        let name = serde_json::to_value(reason)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| format!("{:?}", reason));
        *loss_reasons.entry(name).or_insert(0) += 1;
    }

    AnalysisReport {
        policy_name: policy_name.to_string(),
        episodes: summaries.len(),
        blue_win_rate: blue_wins as f64 / n,
        avg_reward: summaries.iter().map(|s| s.total_reward).sum::<f64>() / n,
        avg_length: summaries.iter().map(|s| s.steps as f64).sum::<f64>() / n,
        avg_compromised_at_end: summaries.iter().map(|s| s.compromised_at_end as f64).sum::<f64>() / n,
        loss_reasons,
    }
}

/// Pools several reports into one, weighting each by its episode count.
pub fn merge(reports: &[AnalysisReport]) -> AnalysisReport {
    let episodes: usize = reports.iter().map(|r| r.episodes).sum();
    let n = episodes.max(1) as f64;
    let weighted = |f: fn(&AnalysisReport) -> f64| reports.iter().map(|r| f(r) * r.episodes as f64).sum::<f64>() / n;

    let mut loss_reasons = BTreeMap::new();
    for report in reports {
        for (reason, count) in &report.loss_reasons {
            *loss_reasons.entry(reason.clone()).or_insert(0) += count;
        }
    }

    AnalysisReport {
        policy_name: reports.iter().map(|r| r.policy_name.as_str()).collect::<Vec<_>>().join("+"),
        episodes,
        blue_win_rate: weighted(|r| r.blue_win_rate),
        avg_reward: weighted(|r| r.avg_reward),
        avg_length: weighted(|r| r.avg_length),
        avg_compromised_at_end: weighted(|r| r.avg_compromised_at_end),
        loss_reasons,
    }
}
