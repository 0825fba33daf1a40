use clap::ValueEnum;

pub const DEFAULT_CLUSTERS: usize = 4;
pub const DEFAULT_MAX_ITERATIONS: usize = 300;
pub const DEFAULT_TOLERANCE: f64 = 1e-4;
pub const DEFAULT_TOP_N: usize = 10;

/// Sentinel team label for rows without a team.
pub const MISSING_TEAM: &str = "None";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InitStrategy {
    /// D²-weighted seeding
    KmeansPlusPlus,
    /// k distinct rows sampled uniformly
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NumericPolicy {
    /// Reject malformed numeric cells
    Strict,
    /// Replace malformed numeric cells with 0
    Zero,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterConfig {
    pub k: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub init: InitStrategy,
    pub seed: Option<u64>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_CLUSTERS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            init: InitStrategy::KmeansPlusPlus,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsConfig {
    pub clustering: ClusterConfig,
    pub numeric_policy: NumericPolicy,
    pub top_n: usize,
    pub assign_challenges: bool,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            clustering: ClusterConfig::default(),
            numeric_policy: NumericPolicy::Strict,
            top_n: DEFAULT_TOP_N,
            assign_challenges: true,
        }
    }
}
