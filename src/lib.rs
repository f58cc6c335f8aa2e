pub mod agents;
pub mod chance;
pub mod error;
pub mod network;
pub mod rewards;
pub mod strategies;
pub mod metrics;
pub mod simulation;

pub use agents::{BlueAgent, RedAgent};
pub use error::{ConfigError, EnvError, NetworkError};
pub use network::{Network, NetworkInterface, NodeId};
pub use simulation::{Environment, GameMode, Simulation, RunConfig};
pub use metrics::MetricsCollector;

pub mod prelude {
    pub use crate::agents::{BlueActionKind, BlueAgent, BlueTarget, RedActionKind, RedAgent};
    pub use crate::network::{generators, Network, NetworkInterface, Node, NodeFilter, NodeId};
    pub use crate::rewards::RewardRegistry;
    pub use crate::simulation::{Environment, GameMode, Outcome, RunConfig, Simulation, StepOutcome};
    pub use crate::strategies::{BluePolicy, PolicyRegistry};
    pub use crate::metrics::EpisodeSummary;
}
