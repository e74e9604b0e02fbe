//! Process wide defaults used when building allocators and solving problems
use std::sync::{LazyLock, RwLock};

pub static CONFIGURATION: LazyLock<RwLock<Configuration>> =
    LazyLock::new(|| RwLock::new(Configuration::default()));

#[derive(Clone, Debug)]
pub struct Configuration {
    /// Objective weight of each tank that receives at least one demand
    pub usage_penalty: f64,
    /// Headroom (in log space) kept below `f64::MAX` for the largest lexicographic weight
    pub weight_margin: f64,
    /// Assignment variables above this value count as placed
    pub assignment_threshold: f64,
    /// Slack allowed when fixing a tank's optimal stranded capacity in sequential solves
    pub sequential_tolerance: f64,
    pub solver: Solver,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            usage_penalty: 1.0,
            weight_margin: 1.0,
            assignment_threshold: 0.5,
            sequential_tolerance: 1e-6,
            solver: Solver::Microlp,
        }
    }
}

/// Enum used to specify the default solver to use
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Solver {
    /// Use the microlp branch and bound solver, requires the microlp feature to be enabled
    Microlp,
}

/// Snapshot of the current configuration
pub(crate) fn current() -> Configuration {
    match CONFIGURATION.read() {
        Ok(config) => config.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}
