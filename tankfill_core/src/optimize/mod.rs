//! Module for constructing and solving optimization problems

pub mod constraint;
pub mod objective;
pub mod problem;
pub mod solvers;
pub mod variable;

use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::optimize::variable::VariableId;

/// Struct representing the solution to an optimization problem
#[derive(Debug, Clone)]
pub struct ProblemSolution {
    /// The status of the optimization problem, representing if the optimization was
    /// completed successfully
    pub status: OptimizationStatus,
    /// Optimized value of the objective
    ///
    /// Some(f64) if the optimization was completed successfully, None otherwise
    pub objective_value: Option<f64>,
    /// Values of the variables at the optimum,
    ///
    /// Some(IndexMap), keyed by variable id in the order the variables were added,
    /// with values corresponding to variable values at optimum if the problem could be
    /// solved, None otherwise
    pub variable_values: Option<IndexMap<String, f64>>,
}

impl ProblemSolution {
    /// Create a solution for a problem which could not be solved to optimality
    pub fn failed(status: OptimizationStatus) -> Self {
        ProblemSolution {
            status,
            objective_value: None,
            variable_values: None,
        }
    }

    /// Whether the solver reached an optimal solution
    pub fn is_optimal(&self) -> bool {
        self.status == OptimizationStatus::Optimal
    }

    /// Value of a variable at the optimum, looked up by variable id
    pub fn value(&self, variable_id: &str) -> Option<f64> {
        self.variable_values.as_ref()?.get(variable_id).copied()
    }

    /// Value of a variable at the optimum, looked up by the handle the problem returned
    pub fn value_of(&self, variable: VariableId) -> Option<f64> {
        self.variable_values
            .as_ref()?
            .get_index(variable.index())
            .map(|(_, v)| *v)
    }
}

/// Status of an optimization problem
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizationStatus {
    /// Problem has been optimized
    Optimal,
    /// Problem can't be optimized because objective value is not bounded
    Unbounded,
    /// Problem can't be solved because it is infeasible (conflicting constraints)
    Infeasible,
    /// A numerical or internal error occurred during solving
    NumericalError,
}

impl Display for OptimizationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OptimizationStatus::Optimal => write!(f, "OPTIMAL"),
            OptimizationStatus::Unbounded => write!(f, "UNBOUNDED"),
            OptimizationStatus::Infeasible => write!(f, "INFEASIBLE"),
            OptimizationStatus::NumericalError => write!(f, "NUMERICAL_ERROR"),
        }
    }
}
