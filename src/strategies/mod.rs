pub mod static_policies;
pub mod scan_and_fix;

use crate::simulation::Environment;
use std::collections::HashMap;
use std::fmt;

/// Scripted blue player. Stands in for an external learner when running
/// episodes from the command line or in tests.
pub trait BluePolicy: Send + fmt::Debug {
    fn choose_action(&mut self, env: &Environment) -> usize;
    fn name(&self) -> &str;
    fn reset(&mut self);
    fn clone_box(&self) -> Box<dyn BluePolicy>;
}

type PolicyFactory = Box<dyn Fn(u64) -> Box<dyn BluePolicy> + Send + Sync>;

pub struct PolicyRegistry {
    policies: HashMap<String, PolicyFactory>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            policies: HashMap::new(),
        };
        registry.register_builtin();
        registry
    }

    fn register_builtin(&mut self) {
        self.register("do-nothing", |_| Box::new(static_policies::DoNothing));
        self.register("noop", |_| Box::new(static_policies::DoNothing));
        self.register("random", |seed| Box::new(static_policies::RandomPolicy::new(seed)));
        self.register("scan-and-fix", |_| Box::new(scan_and_fix::ScanAndFix::new()));
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(u64) -> Box<dyn BluePolicy> + Send + Sync + 'static,
    {
        self.policies.insert(name.to_lowercase(), Box::new(factory));
    }

    /// `seed` feeds policies that draw random actions.
    pub fn create(&self, name: &str, seed: u64) -> Option<Box<dyn BluePolicy>> {
        self.policies.get(&name.to_lowercase()).map(|factory| factory(seed))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.policies.contains_key(&name.to_lowercase())
    }

    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.policies.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn global() -> &'static PolicyRegistry {
        use std::sync::OnceLock;
        static REGISTRY: OnceLock<PolicyRegistry> = OnceLock::new();
        REGISTRY.get_or_init(PolicyRegistry::new)
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::new()
    }
}
