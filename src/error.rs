use crate::network::NodeId;
use thiserror::Error;

/// Structural problems with a network definition. These are never
/// recovered from; they mean the network itself is broken.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("node {0} already exists")]
    DuplicateNode(NodeId),

    #[error("edge {0} -> {0} would be a self loop")]
    SelfLoop(NodeId),

    #[error("no edge between {0} and {1}")]
    UnknownEdge(NodeId, NodeId),

    #[error("vulnerability bounds [{lower}, {upper}] are not a sub-range of [0, 1]")]
    InvalidBounds { lower: f64, upper: f64 },

    #[error("no connected {size} node graph after {attempts} draws with edge probability {probability}")]
    Disconnected { size: usize, probability: f64, attempts: usize },
}

/// Invalid or contradictory game mode settings, caught once before any
/// episode runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("red has no enabled action")]
    NoRedAction,

    #[error("red cannot ignore defences while prioritising by vulnerability")]
    IgnoresDefencesWithVulnerabilityPriority,

    #[error("blue has no enabled action")]
    NoBlueAction,

    #[error("isolate and reconnect must be enabled together")]
    IsolateWithoutReconnect,

    #[error("deceptive nodes are enabled with a capacity of zero")]
    NoDeceptiveCapacity,

    #[error("{name}: deceptive node chance {deceptive} is below standard node chance {standard}")]
    DeceptiveChanceBelowStandard {
        name: &'static str,
        standard: f64,
        deceptive: f64,
    },

    #[error("{name} must be within [0, 1], got {value}")]
    ProbabilityOutOfRange { name: &'static str, value: f64 },

    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("vulnerability lower bound {lower} exceeds upper bound {upper}")]
    InvertedBounds { lower: f64, upper: f64 },

    #[error("max_steps must be at least 1")]
    NoSteps,

    #[error("grace period of {grace} turns exceeds max_steps {max_steps}")]
    GraceExceedsMaxSteps { grace: u32, max_steps: u32 },

    #[error("zero day action requires days_required of at least 1")]
    ZeroDayWithoutRecharge,

    #[error("no loss condition is enabled and red can never win")]
    NoLossCondition,

    #[error("unknown reward function: {0}")]
    UnknownRewardFunction(String),

    #[error("network has {actual} nodes but at least {required} are required")]
    TooFewNodes { required: usize, actual: usize },

    #[error("requested {requested} {kind} nodes but the network only has {available} candidates")]
    TooManySpecialNodes {
        kind: &'static str,
        requested: usize,
        available: usize,
    },

    #[error("target node {0} is not part of the network")]
    UnknownTarget(NodeId),

    #[error("failed to parse game mode: {0}")]
    Parse(String),
}

/// Errors raised while building an environment.
#[derive(Error, Debug)]
pub enum EnvError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
