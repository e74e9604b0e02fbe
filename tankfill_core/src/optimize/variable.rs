//! Module providing representation of optimization problem variables
use std::fmt::{Display, Formatter};

use derive_builder::Builder;

/// Handle to a variable of a [`Problem`](crate::optimize::problem::Problem)
///
/// Handles are handed out by the problem when a variable is added, and are only meaningful
/// for the problem which created them.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct VariableId(pub(crate) usize);

impl VariableId {
    /// Position of the variable in the problem's addition sequence
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A decision variable in an optimization problem
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct Variable {
    /// Used to identify the variable (must be unique within a problem)
    #[builder(setter(into))]
    pub id: String,
    /// Human readable variable name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Domain of the variable, see [`VariableType`]
    #[builder(default = "VariableType::Continuous")]
    pub variable_type: VariableType,
    /// Lowest value the variable can take
    #[builder(default = "0.")]
    pub lower_bound: f64,
    /// Highest value the variable can take, `f64::INFINITY` if unbounded
    #[builder(default = "f64::INFINITY")]
    pub upper_bound: f64,
}

impl Variable {
    /// Create a new continuous variable bounded by `lower_bound` and `upper_bound`
    pub fn continuous(id: impl Into<String>, lower_bound: f64, upper_bound: f64) -> Variable {
        Variable {
            id: id.into(),
            name: None,
            variable_type: VariableType::Continuous,
            lower_bound,
            upper_bound,
        }
    }

    /// Create a new binary variable
    pub fn binary(id: impl Into<String>) -> Variable {
        Variable {
            id: id.into(),
            name: None,
            variable_type: VariableType::Binary,
            lower_bound: 0.,
            upper_bound: 1.,
        }
    }

    /// Whether the variable is restricted to 0 or 1
    pub fn is_binary(&self) -> bool {
        self.variable_type == VariableType::Binary
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}:{}", name, self.variable_type),
            None => write!(f, "{}:{}", self.id, self.variable_type),
        }
    }
}

/// Represents the type of variable in an optimization problem
///
/// # Notes:
/// Not all solvers support binary variables, check
/// [`Solver::binary_variable_capable`](crate::optimize::solvers::Solver::binary_variable_capable)
#[derive(Debug, PartialEq, Clone, Copy, Hash, Eq)]
pub enum VariableType {
    /// Continuous variable
    Continuous,
    /// Binary Variable
    Binary,
}

impl Display for VariableType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            VariableType::Continuous => write!(f, "CONTINUOUS"),
            VariableType::Binary => write!(f, "BINARY"),
        }
    }
}
