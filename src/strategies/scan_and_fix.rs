use super::BluePolicy;
use crate::agents::BlueActionKind;
use crate::network::NodeFilter;
use crate::simulation::Environment;

/// Fixes the first node blue believes is compromised, scans otherwise.
/// Falls back from make safe to restore, and from scan to doing nothing,
/// when the preferred action is disabled.
#[derive(Debug, Clone, Default)]
pub struct ScanAndFix {
    fixes: u64,
    scans: u64,
}

impl ScanAndFix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fixes(&self) -> u64 {
        self.fixes
    }

    pub fn scans(&self) -> u64 {
        self.scans
    }
}

impl BluePolicy for ScanAndFix {
    fn choose_action(&mut self, env: &Environment) -> usize {
        let blue = env.blue_agent();
        let suspects = env
            .network_interface()
            .get_node_ids(NodeFilter::all().blue_view_compromised().not_deceptive());

        for id in suspects {
            let fix = blue
                .find_action(BlueActionKind::MakeNodeSafe, Some(id))
                .or_else(|| blue.find_action(BlueActionKind::RestoreNode, Some(id)));
            if let Some(index) = fix {
                self.fixes += 1;
                return index;
            }
        }

        if let Some(index) = blue.find_action(BlueActionKind::Scan, None) {
            self.scans += 1;
            return index;
        }
        blue.find_action(BlueActionKind::DoNothing, None).unwrap_or(usize::MAX)
    }

    fn name(&self) -> &str {"ScanAndFix"}

    fn reset(&mut self) {
        self.fixes = 0;
        self.scans = 0;
    }

    fn clone_box(&self) -> Box<dyn BluePolicy> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Network, NodeId};
    use crate::simulation::config::GameMode;

    #[test]
    fn scans_until_something_shows_up() {
        let mut net = Network::new();
        for _ in 0..3 {
            net.add_node(0.5);
        }
        net.add_edge(NodeId::new(0), NodeId::new(1)).unwrap();
        net.add_edge(NodeId::new(1), NodeId::new(2)).unwrap();
        let mut mode = GameMode::default().with_seed(7);
        mode.red.always_succeeds = true;
        mode.red.action_set.do_nothing.enabled = false;
        mode.red.naturally_spread = false;
        mode.game_rules.lose_when_n_percent_of_nodes_lost = false;
        mode.game_rules.lose_when_high_value_node_lost = false;
        mode.game_rules.lose_when_all_nodes_lost = true;
        mode.blue.intrusion_discovery_chance.immediate.standard_node = 1.0;
        let mut env = Environment::new(mode, net).unwrap();
        env.reset().unwrap();

        let mut policy = ScanAndFix::new();
        let scan = env.blue_agent().find_action(BlueActionKind::Scan, None).unwrap();
        assert_eq!(policy.choose_action(&env), scan);

        // red lands on the entry node and is seen straight away
        let step = env.step(scan).unwrap();
        assert!(!step.done);
        let entry = env.network_interface().entry_nodes()[0];
        let fix = policy.choose_action(&env);
        assert_eq!(
            Some(fix),
            env.blue_agent().find_action(BlueActionKind::MakeNodeSafe, Some(entry))
        );
        let step = env.step(fix).unwrap();
        assert_eq!(step.info.blue_action, BlueActionKind::MakeNodeSafe);
        assert_eq!(policy.fixes(), 1);
    }
}
