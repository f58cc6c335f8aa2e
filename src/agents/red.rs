use super::RedActionKind;
use crate::chance;
use crate::error::NetworkError;
use crate::network::{NetworkInterface, NodeFilter, NodeId};
use crate::simulation::config::{AttackSource, GameMode, TargetMechanism};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Outcome of one red sub-action. The three vectors are parallel, one entry
/// per attempt, and empty for actions that attempt nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedActionRecord {
    pub action: RedActionKind,
    pub attacking_nodes: Vec<Option<NodeId>>,
    pub target_nodes: Vec<NodeId>,
    pub successes: Vec<bool>,
}

impl RedActionRecord {
    fn empty(action: RedActionKind) -> Self {
        Self {
            action,
            attacking_nodes: Vec::new(),
            target_nodes: Vec::new(),
            successes: Vec::new(),
        }
    }

    fn push(&mut self, attacker: Option<NodeId>, target: NodeId, succeeded: bool) {
        self.attacking_nodes.push(attacker);
        self.target_nodes.push(target);
        self.successes.push(succeeded);
    }

    /// Red sat out the turn, no attempts.
    pub fn do_nothing() -> Self {
        Self::empty(RedActionKind::DoNothing)
    }

    pub fn grace_period() -> Self {
        Self::do_nothing()
    }

    pub fn succeeded(&self) -> usize {
        self.successes.iter().filter(|s| **s).count()
    }
}

/// (attacker, target) pair. `None` attacker means entry from outside.
type Route = (Option<NodeId>, NodeId);

#[derive(Debug, Clone)]
pub struct RedAgent {
    game_mode: Arc<GameMode>,
    zero_days: u32,
    days_since_zero_day: u32,
}

impl RedAgent {
    pub fn new(game_mode: Arc<GameMode>) -> Self {
        let zero_days = game_mode.red.action_set.zero_day.start_amount;
        Self {
            game_mode,
            zero_days,
            days_since_zero_day: 0,
        }
    }

    pub fn reset(&mut self) {
        self.zero_days = self.game_mode.red.action_set.zero_day.start_amount;
        self.days_since_zero_day = 0;
    }

    pub fn zero_days(&self) -> u32 {
        self.zero_days
    }

    /// Plays one red turn: the chosen action, then natural spreading.
    pub fn perform_action<R: Rng + ?Sized>(
        &mut self,
        ni: &mut NetworkInterface,
        rng: &mut R,
    ) -> Result<Vec<RedActionRecord>, NetworkError> {
        // blue may have cleaned red's foothold last turn
        if let Some(location) = ni.red_current_location() {
            if !ni.node(location)?.true_compromised {
                ni.set_red_current_location(None);
            }
        }
        self.accrue_zero_day();

        let start_compromised = ni.get_node_ids(NodeFilter::all().true_compromised());
        let action = self.choose_action(rng);
        let mut records = vec![self.resolve(action, ni, &start_compromised, rng)?];

        if self.game_mode.red.naturally_spread {
            records.push(self.natural_spread(ni, &start_compromised, rng)?);
        }

        for record in &records {
            debug!(
                "Red {}: {} attempts, {} succeeded",
                record.action.name(),
                record.target_nodes.len(),
                record.succeeded()
            );
            self.store(ni, record, rng)?;
        }
        Ok(records)
    }

    fn accrue_zero_day(&mut self) {
        let zero_day = self.game_mode.red.action_set.zero_day;
        if !zero_day.enabled {
            return;
        }
        self.days_since_zero_day += 1;
        if self.days_since_zero_day >= zero_day.days_required {
            self.zero_days += 1;
            self.days_since_zero_day = 0;
        }
    }

    /// Weighted draw over enabled actions; zero day only while stocked.
    fn choose_action<R: Rng + ?Sized>(&self, rng: &mut R) -> RedActionKind {
        let set = &self.game_mode.red.action_set;
        let zero_day = if set.zero_day.enabled && self.zero_days > 0 {
            set.zero_day.likelihood.max(0.0)
        } else {
            0.0
        };
        let options = [
            (RedActionKind::DoNothing, set.do_nothing.weight()),
            (RedActionKind::Spread, set.spread.weight()),
            (RedActionKind::RandomInfect, set.random_infect.weight()),
            (RedActionKind::BasicAttack, set.basic_attack.weight()),
            (RedActionKind::ZeroDay, zero_day),
            (RedActionKind::Move, set.movement.weight()),
        ];
        let weights: Vec<f64> = options.iter().map(|(_, w)| *w).collect();
        chance::choose_weighted(&weights, rng)
            .map(|i| options[i].0)
            .unwrap_or(RedActionKind::DoNothing)
    }

    fn resolve<R: Rng + ?Sized>(
        &mut self,
        action: RedActionKind,
        ni: &mut NetworkInterface,
        start_compromised: &[NodeId],
        rng: &mut R,
    ) -> Result<RedActionRecord, NetworkError> {
        match action {
            RedActionKind::DoNothing => Ok(RedActionRecord::do_nothing()),
            RedActionKind::Spread => self.spread(ni, start_compromised, rng),
            RedActionKind::RandomInfect => self.random_infect(ni, rng),
            RedActionKind::BasicAttack => self.single_attack(ni, start_compromised, false, rng),
            RedActionKind::ZeroDay => self.single_attack(ni, start_compromised, true, rng),
            RedActionKind::Move => self.move_location(ni, rng),
            RedActionKind::NaturalSpread | RedActionKind::NoPossibleTargets => {
                Ok(RedActionRecord::empty(RedActionKind::NoPossibleTargets))
            }
        }
    }

    /// Nodes red attacks from this turn.
    fn sources(&self, ni: &NetworkInterface, start_compromised: &[NodeId]) -> Vec<NodeId> {
        match self.game_mode.red.attack_from {
            AttackSource::OnlyMainNode => ni.red_current_location().into_iter().collect(),
            AttackSource::AnyNode => start_compromised.to_vec(),
        }
    }

    /// Every (attacker, target) pair open to red. Entry nodes are reachable
    /// from outside while red has no main location.
    fn routes(&self, ni: &NetworkInterface, start_compromised: &[NodeId]) -> Result<Vec<Route>, NetworkError> {
        let mut routes = Vec::new();
        if ni.red_current_location().is_none() {
            for entry in ni.entry_nodes() {
                let node = ni.node(entry)?;
                if !node.true_compromised && !node.isolated {
                    routes.push((None, entry));
                }
            }
        }
        for source in self.sources(ni, start_compromised) {
            for target in ni.connected_nodes(source) {
                if !ni.node(target)?.true_compromised {
                    routes.push((Some(source), target));
                }
            }
        }
        Ok(routes)
    }

    fn attack<R: Rng + ?Sized>(
        &self,
        ni: &mut NetworkInterface,
        target: NodeId,
        guarantee: bool,
        rng: &mut R,
    ) -> Result<bool, NetworkError> {
        let red = &self.game_mode.red;
        ni.attack_node(
            target,
            red.effective_skill(),
            !red.ignores_defences,
            guarantee || red.always_succeeds,
            rng,
        )
    }

    fn on_compromise(&self, ni: &mut NetworkInterface, target: NodeId) {
        match self.game_mode.red.attack_from {
            AttackSource::AnyNode => ni.set_red_current_location(Some(target)),
            AttackSource::OnlyMainNode => {
                if ni.red_current_location().is_none() {
                    ni.set_red_current_location(Some(target));
                }
            }
        }
    }

    fn spread<R: Rng + ?Sized>(
        &mut self,
        ni: &mut NetworkInterface,
        start_compromised: &[NodeId],
        rng: &mut R,
    ) -> Result<RedActionRecord, NetworkError> {
        let routes = self.routes(ni, start_compromised)?;
        if routes.is_empty() {
            return Ok(RedActionRecord::empty(RedActionKind::NoPossibleTargets));
        }
        let spread_chance = self.game_mode.red.action_set.spread.chance;
        let mut record = RedActionRecord::empty(RedActionKind::Spread);
        for (attacker, target) in routes {
            if ni.node(target)?.true_compromised {
                continue;
            }
            let succeeded = chance::resolve(spread_chance, rng) && self.attack(ni, target, true, rng)?;
            if succeeded {
                self.on_compromise(ni, target);
            }
            record.push(attacker, target, succeeded);
        }
        Ok(record)
    }

    fn random_infect<R: Rng + ?Sized>(
        &mut self,
        ni: &mut NetworkInterface,
        rng: &mut R,
    ) -> Result<RedActionRecord, NetworkError> {
        let targets = ni.get_node_ids(NodeFilter::all().true_safe());
        if targets.is_empty() {
            return Ok(RedActionRecord::empty(RedActionKind::NoPossibleTargets));
        }
        let infect_chance = self.game_mode.red.action_set.random_infect.chance;
        let mut record = RedActionRecord::empty(RedActionKind::RandomInfect);
        for target in targets {
            let succeeded = chance::resolve(infect_chance, rng) && self.attack(ni, target, true, rng)?;
            if succeeded {
                self.on_compromise(ni, target);
            }
            record.push(None, target, succeeded);
        }
        Ok(record)
    }

    /// Basic attack, or a zero day when `zero_day` is set.
    fn single_attack<R: Rng + ?Sized>(
        &mut self,
        ni: &mut NetworkInterface,
        start_compromised: &[NodeId],
        zero_day: bool,
        rng: &mut R,
    ) -> Result<RedActionRecord, NetworkError> {
        let routes = self.routes(ni, start_compromised)?;
        let targets: Vec<NodeId> = routes
            .iter()
            .map(|(_, t)| *t)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let Some(target) = self.choose_target(ni, &targets, rng) else {
            return Ok(RedActionRecord::empty(RedActionKind::NoPossibleTargets));
        };
        let attacker = routes
            .iter()
            .find(|(_, t)| *t == target)
            .and_then(|(a, _)| *a);

        if zero_day {
            self.zero_days = self.zero_days.saturating_sub(1);
        }
        let succeeded = self.attack(ni, target, zero_day, rng)?;
        if succeeded {
            self.on_compromise(ni, target);
        }
        let kind = if zero_day { RedActionKind::ZeroDay } else { RedActionKind::BasicAttack };
        let mut record = RedActionRecord::empty(kind);
        record.push(attacker, target, succeeded);
        Ok(record)
    }

    /// Moves the main location to a compromised neighbour without attacking.
    fn move_location<R: Rng + ?Sized>(
        &mut self,
        ni: &mut NetworkInterface,
        rng: &mut R,
    ) -> Result<RedActionRecord, NetworkError> {
        let current = ni.red_current_location();
        let candidates: Vec<NodeId> = match current {
            Some(location) => {
                let mut out = Vec::new();
                for id in ni.connected_nodes(location) {
                    if ni.node(id)?.true_compromised {
                        out.push(id);
                    }
                }
                out
            }
            None => ni.get_node_ids(NodeFilter::all().true_compromised()),
        };
        let Some(target) = self.choose_target(ni, &candidates, rng) else {
            return Ok(RedActionRecord::empty(RedActionKind::NoPossibleTargets));
        };
        ni.set_red_current_location(Some(target));
        let mut record = RedActionRecord::empty(RedActionKind::Move);
        record.push(current, target, true);
        Ok(record)
    }

    fn natural_spread<R: Rng + ?Sized>(
        &mut self,
        ni: &mut NetworkInterface,
        start_compromised: &[NodeId],
        rng: &mut R,
    ) -> Result<RedActionRecord, NetworkError> {
        let red = self.game_mode.red;
        let mut record = RedActionRecord::empty(RedActionKind::NaturalSpread);
        let mut near = BTreeSet::new();

        for source in start_compromised {
            for target in ni.connected_nodes(*source) {
                near.insert(target);
                if ni.node(target)?.true_compromised {
                    continue;
                }
                let succeeded = chance::resolve(red.chance_to_spread_to_connected_node, rng);
                if succeeded {
                    ni.attack_node(target, 1.0, false, true, rng)?;
                }
                record.push(Some(*source), target, succeeded);
            }
        }

        for target in ni.get_node_ids(NodeFilter::all().true_safe()) {
            if near.contains(&target) {
                continue;
            }
            let succeeded = chance::resolve(red.chance_to_spread_to_unconnected_node, rng);
            if succeeded {
                ni.attack_node(target, 1.0, false, true, rng)?;
            }
            record.push(None, target, succeeded);
        }
        Ok(record)
    }

    /// Picks one node from `candidates` using the configured priority.
    fn choose_target<R: Rng + ?Sized>(
        &self,
        ni: &NetworkInterface,
        candidates: &[NodeId],
        rng: &mut R,
    ) -> Option<NodeId> {
        if candidates.is_empty() {
            return None;
        }
        let network = ni.network();
        let vulnerability = |id: NodeId| network.node(id).map(|n| n.vulnerability_score()).unwrap_or(0.0);
        match self.game_mode.red.target_mechanism {
            TargetMechanism::Random => chance::choose(candidates, rng).copied(),
            TargetMechanism::PrioritiseConnected => best_by(candidates, |id| network.degree(id) as f64, rng),
            TargetMechanism::PrioritiseUnconnected => best_by(candidates, |id| -(network.degree(id) as f64), rng),
            TargetMechanism::PrioritiseVulnerable => best_by(candidates, vulnerability, rng),
            TargetMechanism::PrioritiseResilient => best_by(candidates, |id| -vulnerability(id), rng),
            TargetMechanism::TargetSpecificNode { always_shortest, .. } => {
                let Some(goal) = ni.target_node() else {
                    return chance::choose(candidates, rng).copied();
                };
                let distances = network.hop_distances(&[goal]);
                if candidates.iter().all(|id| !distances.contains_key(id)) {
                    return chance::choose(candidates, rng).copied();
                }
                let distance = |id: NodeId| distances.get(&id).copied();
                if always_shortest {
                    best_by(candidates, |id| distance(id).map_or(f64::NEG_INFINITY, |d| -(d as f64)), rng)
                } else {
                    let weights: Vec<f64> = candidates
                        .iter()
                        .map(|id| distance(*id).map_or(0.0, |d| 1.0 / (d as f64 + 1.0)))
                        .collect();
                    chance::choose_weighted(&weights, rng).map(|i| candidates[i])
                }
            }
        }
    }

    /// Sends this turn's attacks to the interface. Attacks without a source
    /// node are only kept when they came in through an entry node.
    fn store<R: Rng + ?Sized>(
        &self,
        ni: &mut NetworkInterface,
        record: &RedActionRecord,
        rng: &mut R,
    ) -> Result<(), NetworkError> {
        if matches!(
            record.action,
            RedActionKind::DoNothing | RedActionKind::Move | RedActionKind::NoPossibleTargets
        ) {
            return Ok(());
        }
        let entry: BTreeSet<NodeId> = ni.entry_nodes().into_iter().collect();
        let mut attackers = Vec::new();
        let mut targets = Vec::new();
        let mut successes = Vec::new();
        for ((attacker, target), succeeded) in record
            .attacking_nodes
            .iter()
            .zip(&record.target_nodes)
            .zip(&record.successes)
        {
            if attacker.is_none() && !entry.contains(target) {
                continue;
            }
            attackers.push(*attacker);
            targets.push(*target);
            successes.push(*succeeded);
        }
        ni.update_stored_attacks(&attackers, &targets, &successes, rng)
    }
}

/// Highest scoring candidate, ties broken at random.
fn best_by<R: Rng + ?Sized>(candidates: &[NodeId], score: impl Fn(NodeId) -> f64, rng: &mut R) -> Option<NodeId> {
    let best = candidates.iter().map(|id| score(*id)).fold(f64::NEG_INFINITY, f64::max);
    let ties: Vec<NodeId> = candidates.iter().copied().filter(|id| score(*id) >= best).collect();
    chance::choose(&ties, rng).copied()
}
