//! Interfaces to the external solvers used for optimizing [`Problem`](crate::optimize::problem::Problem)s
#[cfg(feature = "microlp")]
pub mod microlp;

use thiserror::Error;

use crate::configuration;
use crate::optimize::ProblemSolution;

/// Capabilities a backend has to provide to solve a problem
///
/// A solver instance is loaded with exactly one problem, solved once, and then dropped. The
/// objective is always minimized.
pub trait Solver {
    /// Whether the solver can handle binary variables
    fn binary_variable_capable(&self) -> bool;

    /// Add a continuous variable bounded by `lower_bound` and `upper_bound`
    fn add_continuous_variable(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError>;

    /// Add a binary variable
    fn add_binary_variable(&mut self, id: &str) -> Result<(), SolverError>;

    /// Add the constraint `coefficients . variables == equals`
    fn add_equality_constraint(
        &mut self,
        id: &str,
        variables: Vec<&str>,
        coefficients: Vec<f64>,
        equals: f64,
    ) -> Result<(), SolverError>;

    /// Add the constraint `lower_bound <= coefficients . variables <= upper_bound`,
    /// an infinite bound is treated as absent
    fn add_inequality_constraint(
        &mut self,
        id: &str,
        variables: Vec<&str>,
        coefficients: Vec<f64>,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError>;

    /// Add `coefficient * variable` to the objective
    fn add_linear_objective_term(
        &mut self,
        variable_id: &str,
        coefficient: f64,
    ) -> Result<(), SolverError>;

    /// Remove all terms from the objective
    fn clear_objective(&mut self) -> Result<(), SolverError>;

    /// Solve the loaded problem
    ///
    /// Infeasible or unbounded problems are reported through the status of the
    /// returned [`ProblemSolution`], not as an error.
    fn solve(&mut self) -> Result<ProblemSolution, SolverError>;
}

/// Create a fresh instance of the solver selected in the
/// [`Configuration`](crate::configuration::Configuration)
pub fn default_solver() -> Result<Box<dyn Solver>, SolverError> {
    match configuration::current().solver {
        configuration::Solver::Microlp => new_microlp_solver(),
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "microlp")] {
        fn new_microlp_solver() -> Result<Box<dyn Solver>, SolverError> {
            Ok(Box::new(microlp::MicrolpSolver::new()))
        }
    } else {
        fn new_microlp_solver() -> Result<Box<dyn Solver>, SolverError> {
            Err(SolverError::NoSolverAvailable)
        }
    }
}

/// Errors raised by a solver backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// No solver backend was compiled in
    #[error("No solver backend is available, enable the `microlp` feature")]
    NoSolverAvailable,
    /// The backend can't handle a variable of this type
    #[error("The solver does not support {0} variables")]
    UnsupportedVariableType(String),
    /// Tried to add a variable with an id the solver already knows
    #[error("Variable `{0}` was already added to the solver")]
    DuplicateVariable(String),
    /// Tried to reference a variable the solver doesn't know
    #[error("Variable `{0}` is unknown to the solver")]
    UnknownVariable(String),
    /// Variables and coefficients of a constraint have different lengths
    #[error("Constraint `{0}` has a different number of variables and coefficients")]
    MismatchedTerms(String),
}
