// The two baselines: never act, or act uniformly at random.

use super::BluePolicy;
use crate::agents::BlueActionKind;
use crate::simulation::Environment;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, Copy)]
pub struct DoNothing;

impl BluePolicy for DoNothing {
    fn choose_action(&mut self, env: &Environment) -> usize {
        // an out of range index is do nothing as well
        env.blue_agent()
            .find_action(BlueActionKind::DoNothing, None)
            .unwrap_or(usize::MAX)
    }

    fn name(&self) -> &str {"DoNothing"}

    fn reset(&mut self) {}

    fn clone_box(&self) -> Box<dyn BluePolicy> {
        Box::new(*self)
    }
}

#[derive(Debug, Clone)]
pub struct RandomPolicy {
    seed: u64,
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self { seed, rng: StdRng::seed_from_u64(seed) }
    }
}

impl BluePolicy for RandomPolicy {
    fn choose_action(&mut self, env: &Environment) -> usize {
        let size = env.action_space_size();
        if size == 0 {
            return 0;
        }
        self.rng.gen_range(0..size)
    }

    fn name(&self) -> &str {"Random"}

    fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
    }

    fn clone_box(&self) -> Box<dyn BluePolicy> {
        Box::new(self.clone())
    }
}
