use super::RewardArgs;
use crate::agents::BlueActionKind;

const RECOVERY_BONUS: f64 = 5.0;
const REDUNDANT_FIX_PENALTY: f64 = 3.0;
const USELESS_REDUCTION_PENALTY: f64 = 1.0;
const VULNERABILITY_BONUS: f64 = 5.0;
const SCAN_BONUS: f64 = 1.0;
const RELOCATION_PENALTY: f64 = 2.0;

pub fn action_cost(args: &RewardArgs<'_>) -> f64 {
    match args.blue_action {
        BlueActionKind::ReduceVulnerability => 0.5,
        BlueActionKind::RestoreNode => 1.0,
        BlueActionKind::MakeNodeSafe => 0.5,
        BlueActionKind::Scan => 0.0,
        BlueActionKind::Isolate => 10.0,
        BlueActionKind::Reconnect => 0.0,
        BlueActionKind::AddDeceptiveNode => 8.0,
        BlueActionKind::DoNothing => 0.5 + 0.1 * args.end.compromised_count() as f64,
        BlueActionKind::Failed => 0.0,
    }
}

/// Decreasing, flattening weight for recovering nodes while `percent` of the
/// network is still compromised.
pub fn recovery_scale(percent: f64) -> f64 {
    (-0.004 * percent.clamp(0.0, 100.0)).exp()
}

fn penalties(args: &RewardArgs<'_>) -> f64 {
    let mut penalty = 0.0;
    match args.blue_action {
        BlueActionKind::MakeNodeSafe | BlueActionKind::RestoreNode => {
            if args.end.compromised_count() >= args.start.compromised_count() {
                penalty += REDUNDANT_FIX_PENALTY;
            }
        }
        BlueActionKind::ReduceVulnerability => {
            let unchanged = args.blue_node.is_some_and(|id| {
                args.start.vulnerabilities.get(&id) == args.end.vulnerabilities.get(&id)
            });
            if unchanged {
                penalty += USELESS_REDUCTION_PENALTY;
            }
        }
        BlueActionKind::AddDeceptiveNode if args.deceptive_pool_exhausted => {
            penalty += RELOCATION_PENALTY;
        }
        _ => {}
    }
    penalty
}

fn bonuses(args: &RewardArgs<'_>) -> f64 {
    let mut bonus = 0.0;

    let (before, after) = (args.start.compromised_count(), args.end.compromised_count());
    if after < before && !args.end.compromised.is_empty() {
        let percent = 100.0 * after as f64 / args.end.compromised.len() as f64;
        bonus += RECOVERY_BONUS * (before - after) as f64 * recovery_scale(percent);
    }

    if !args.red_ignores_defences {
        let reduced: f64 = args
            .start
            .vulnerabilities
            .iter()
            .filter_map(|(id, v)| args.end.vulnerabilities.get(id).map(|after| (v - after).max(0.0)))
            .sum();
        bonus += VULNERABILITY_BONUS * reduced;
    }

    if args.blue_action == BlueActionKind::Scan {
        let revealed = args
            .end
            .blue_view
            .iter()
            .filter(|(id, seen)| **seen && !args.start.blue_view.get(*id).copied().unwrap_or(false))
            .count();
        bonus += SCAN_BONUS * revealed as f64;
    }
    bonus
}

pub fn standard_rewards(args: &RewardArgs<'_>) -> f64 {
    bonuses(args) - action_cost(args) - penalties(args)
}

pub fn safe_nodes_give_rewards(args: &RewardArgs<'_>) -> f64 {
    args.end.safe_count() as f64
}

/// `standard_rewards` without any of the positive terms.
pub fn punish_bad_actions(args: &RewardArgs<'_>) -> f64 {
    -(action_cost(args) + penalties(args))
}

pub fn one_per_timestep(_args: &RewardArgs<'_>) -> f64 {
    1.0
}

pub fn zero_reward(_args: &RewardArgs<'_>) -> f64 {
    0.0
}

/// Cost of the end state: one per compromised node.
pub fn dcbo_cost_func(args: &RewardArgs<'_>) -> f64 {
    -(args.end.compromised_count() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{NodeId, Snapshot};

    fn snapshot(compromised: &[u8], vulnerabilities: &[f64]) -> Snapshot {
        let ids = (0..compromised.len() as u32).map(NodeId::new);
        Snapshot {
            compromised: ids.clone().zip(compromised.iter().map(|c| *c == 1)).collect(),
            blue_view: ids.clone().zip(compromised.iter().map(|c| *c == 1)).collect(),
            vulnerabilities: ids.clone().zip(vulnerabilities.iter().copied()).collect(),
            isolation: ids.map(|id| (id, false)).collect(),
            red_location: None,
        }
    }

    fn args<'a>(action: BlueActionKind, start: &'a Snapshot, end: &'a Snapshot) -> RewardArgs<'a> {
        RewardArgs {
            blue_action: action,
            blue_node: None,
            start,
            end,
            red_ignores_defences: false,
            deceptive_pool_exhausted: false,
        }
    }

    #[test]
    fn redundant_make_safe() {
        let state = snapshot(&[1, 1, 1, 1, 1], &[0.5; 5]);
        let reward = standard_rewards(&args(BlueActionKind::MakeNodeSafe, &state, &state));
        assert_eq!((reward * 10.0).round() / 10.0, -3.5);
    }

    #[test]
    fn safe_nodes_are_counted() {
        let state = snapshot(&[1, 1, 0, 1, 0], &[0.5; 5]);
        assert_eq!(safe_nodes_give_rewards(&args(BlueActionKind::DoNothing, &state, &state)).round(), 2.0);
    }

    #[test]
    fn doing_nothing_costs_more_under_attack() {
        let calm = snapshot(&[0, 0, 0, 0], &[0.5; 4]);
        let busy = snapshot(&[1, 1, 1, 0], &[0.5; 4]);
        let calm_reward = standard_rewards(&args(BlueActionKind::DoNothing, &calm, &calm));
        let busy_reward = standard_rewards(&args(BlueActionKind::DoNothing, &busy, &busy));
        assert!((calm_reward + 0.5).abs() < 1e-12);
        assert!((busy_reward + 0.8).abs() < 1e-12);
    }

    #[test]
    fn recovery_is_rewarded() {
        let start = snapshot(&[1, 1, 0, 0], &[0.5; 4]);
        let end = snapshot(&[1, 0, 0, 0], &[0.5; 4]);
        let reward = standard_rewards(&args(BlueActionKind::MakeNodeSafe, &start, &end));
        let expected = 5.0 * (-0.004f64 * 25.0).exp() - 0.5;
        assert!((reward - expected).abs() < 1e-12);
    }

    #[test]
    fn recovery_scale_decreases() {
        assert_eq!(recovery_scale(0.0), 1.0);
        assert!(recovery_scale(10.0) > recovery_scale(50.0));
        assert_eq!(recovery_scale(150.0), recovery_scale(100.0));
    }

    #[test]
    fn vulnerability_reduction() {
        let start = snapshot(&[0, 0], &[0.6, 0.5]);
        let end = snapshot(&[0, 0], &[0.4, 0.5]);
        let mut a = args(BlueActionKind::ReduceVulnerability, &start, &end);
        a.blue_node = Some(NodeId::new(0));
        assert!((standard_rewards(&a) - 0.5).abs() < 1e-9);

        a.red_ignores_defences = true;
        assert!((standard_rewards(&a) + 0.5).abs() < 1e-9);

        let mut useless = args(BlueActionKind::ReduceVulnerability, &start, &start);
        useless.blue_node = Some(NodeId::new(1));
        assert!((standard_rewards(&useless) + 1.5).abs() < 1e-9);
    }

    #[test]
    fn scan_pays_per_revealed_intrusion() {
        let start = snapshot(&[0, 0, 0], &[0.5; 3]);
        let mut end = start.clone();
        end.blue_view.insert(NodeId::new(1), true);
        end.blue_view.insert(NodeId::new(2), true);
        assert_eq!(standard_rewards(&args(BlueActionKind::Scan, &start, &end)), 2.0);
    }

    #[test]
    fn relocation_costs_extra() {
        let state = snapshot(&[0, 0], &[0.5; 2]);
        let mut a = args(BlueActionKind::AddDeceptiveNode, &state, &state);
        assert_eq!(standard_rewards(&a), -8.0);
        a.deceptive_pool_exhausted = true;
        assert_eq!(standard_rewards(&a), -10.0);
    }

    #[test]
    fn punishments_are_never_positive() {
        let start = snapshot(&[1, 1, 0, 0], &[0.6; 4]);
        let end = snapshot(&[0, 0, 0, 0], &[0.2; 4]);
        for action in [
            BlueActionKind::ReduceVulnerability,
            BlueActionKind::RestoreNode,
            BlueActionKind::MakeNodeSafe,
            BlueActionKind::Scan,
            BlueActionKind::DoNothing,
        ] {
            assert!(punish_bad_actions(&args(action, &start, &end)) <= 0.0);
        }
    }

    #[test]
    fn trivial_functions() {
        let state = snapshot(&[1, 0, 1], &[0.5; 3]);
        let a = args(BlueActionKind::DoNothing, &state, &state);
        assert_eq!(one_per_timestep(&a), 1.0);
        assert_eq!(zero_reward(&a), 0.0);
        assert_eq!(dcbo_cost_func(&a), -2.0);
    }
}
