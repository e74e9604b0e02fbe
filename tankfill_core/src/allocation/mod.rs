//! Placement of indivisible demand volumes into tanks, minimizing stranded capacity
//!
//! Tanks are prioritized by ascending spare capacity. The stranded (left over) capacity of a
//! tighter tank is minimized before any looser tank is considered, either through
//! exponentially scaled objective weights ([`ObjectiveStrategy::Weighted`]) or through one
//! solve per tank ([`ObjectiveStrategy::Sequential`]).

pub mod allocator;
pub mod model;
pub mod placement;
pub mod scenario;
pub mod tank;
pub mod weights;

pub use allocator::{allocate, ObjectiveStrategy, TankAllocator, TankAllocatorBuilder};
pub use model::{AllocationModel, AssignmentKey, StrandedDefinition};
pub use placement::{AllocationResult, Placement, TankPlacement};
pub use scenario::{run_scenarios, Scenario, SolveDiagnostics};
pub use tank::{Tank, TankBuilder};
pub use weights::{lexicographic_weights, priority_order};

use thiserror::Error;

use crate::optimize::problem::ProblemError;

/// Errors raised while validating allocation input or building the allocation model
///
/// A solver that fails to reach optimality is not an error, see
/// [`AllocationResult`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AllocationError {
    /// A tank's current level is above its max level
    #[error("Tank `{id}` has current level {current_level} above its max level {max_level}")]
    NegativeSpareCapacity {
        id: String,
        current_level: f64,
        max_level: f64,
    },
    /// A tank level is NaN or infinite
    #[error("Tank `{0}` has a non-finite level")]
    NonFiniteLevel(String),
    /// A spare capacity handed to the weight generator is negative or not finite
    #[error("Spare capacity {spare} of `{id}` is not a finite non-negative value")]
    InvalidSpareCapacity { id: String, spare: f64 },
    /// Two tanks share an id
    #[error("Tank id `{0}` appears more than once")]
    DuplicateTank(String),
    /// A demand volume is negative or not finite
    #[error("Demand {index} has volume {volume}, volumes must be finite and non-negative")]
    InvalidDemand { index: usize, volume: f64 },
    /// The spare capacities can't produce a base for the lexicographic weights
    #[error("Spare capacities sum to {0}, which does not give a valid lexicographic base")]
    DegenerateWeightBase(f64),
    /// A lexicographic weight came out NaN or infinite
    #[error("Lexicographic weight of `{0}` is not finite")]
    NonFiniteWeight(String),
    /// The usage penalty is negative or not finite
    #[error("Usage penalty {0} must be finite and non-negative")]
    InvalidUsagePenalty(f64),
    /// Error raised while building or solving the underlying problem
    #[error(transparent)]
    Problem(#[from] ProblemError),
}
