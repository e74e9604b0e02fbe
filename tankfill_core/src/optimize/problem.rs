//! Provides struct representing an optimization problem
use std::collections::HashSet;

use indexmap::IndexMap;
use log::debug;
use thiserror::Error;

use crate::optimize::constraint::Constraint;
use crate::optimize::objective::{Objective, ObjectiveTerm};
use crate::optimize::solvers::{default_solver, Solver, SolverError};
use crate::optimize::variable::{Variable, VariableId, VariableType};
use crate::optimize::ProblemSolution;

/// A linear minimization problem
///
/// The problem owns its variables, constraints and objective. Variables are referred to by the
/// [`VariableId`] handles returned when adding them.
#[derive(Debug, Clone)]
pub struct Problem {
    /// Objective to minimize
    objective: Objective,
    /// Variables of the optimization problem, in the order they were added
    variables: IndexMap<String, Variable>,
    /// Constraints of the optimization problem
    constraints: IndexMap<String, Constraint>,
    /// Type of problem
    problem_type: ProblemType,
}

impl Problem {
    // region Creation Functions
    /// Create a new, empty optimization problem
    pub fn new() -> Self {
        Self {
            objective: Objective::new(),
            variables: IndexMap::new(),
            constraints: IndexMap::new(),
            problem_type: ProblemType::LinearContinuous,
        }
    }
    // endregion Creation Functions

    // region Adding Variables
    /// Add a variable to the optimization problem, returning its handle
    pub fn add_variable(&mut self, variable: Variable) -> Result<VariableId, ProblemError> {
        self.validate_variable(&variable)?;
        if variable.is_binary() {
            self.problem_type = ProblemType::LinearMixedInteger;
        }
        let handle = VariableId(self.variables.len());
        self.variables.insert(variable.id.clone(), variable);
        Ok(handle)
    }
    // endregion Adding Variables

    // region Accessing Variables
    /// Get a variable from its handle
    pub fn variable(&self, variable: VariableId) -> Option<&Variable> {
        self.variables.get_index(variable.0).map(|(_, v)| v)
    }

    // endregion Accessing Variables

    // region Adding Constraints
    /// Add a constraint to the problem
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<(), ProblemError> {
        self.validate_constraint(&constraint)?;
        self.constraints
            .insert(constraint.get_id().to_string(), constraint);
        Ok(())
    }

    /// Create a new equality constraint and add it to the model
    pub fn add_new_equality_constraint(
        &mut self,
        id: &str,
        variables: &[VariableId],
        coefficients: &[f64],
        equals: f64,
    ) -> Result<(), ProblemError> {
        Self::check_term_lengths(id, variables, coefficients)?;
        self.add_constraint(Constraint::new_equality(
            id,
            variables,
            coefficients,
            equals,
        ))
    }

    /// Create a new inequality constraint and add it to the model
    pub fn add_new_inequality_constraint(
        &mut self,
        id: &str,
        variables: &[VariableId],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        Self::check_term_lengths(id, variables, coefficients)?;
        self.add_constraint(Constraint::new_inequality(
            id,
            variables,
            coefficients,
            lower_bound,
            upper_bound,
        ))
    }

    // endregion Adding Constraints

    // region Adding Objective Terms
    /// Add a new term to the objective
    pub fn add_objective_term(&mut self, objective_term: ObjectiveTerm) -> Result<(), ProblemError> {
        if self.variable(objective_term.variable).is_none() {
            return Err(ProblemError::NonExistentVariablesInObjective);
        }
        if !objective_term.coefficient.is_finite() {
            return Err(ProblemError::InvalidObjectiveCoefficient);
        }
        self.objective.add_term(objective_term);
        Ok(())
    }

    /// Add a new linear term to the objective
    pub fn add_new_linear_objective_term(
        &mut self,
        variable: VariableId,
        coefficient: f64,
    ) -> Result<(), ProblemError> {
        self.add_objective_term(ObjectiveTerm::new(variable, coefficient))
    }

    // endregion Adding Objective Terms

    // region Remove Objective Terms
    /// Remove all terms from the objective
    pub fn remove_all_objective_terms(&mut self) {
        self.objective.remove_all_terms();
    }
    // endregion Remove Objective Terms

    // region Validation Functions
    /// Check that a variable to be added is valid to add to this problem
    fn validate_variable(&self, variable: &Variable) -> Result<(), ProblemError> {
        // Check if there is already a variable with this id
        if self.variables.contains_key(&variable.id) {
            return Err(ProblemError::VariableIdAlreadyExists(variable.id.clone()));
        };
        // Check if the variable bounds are valid
        let lb = variable.lower_bound;
        let ub = variable.upper_bound;
        if lb > ub || lb.is_nan() || ub.is_nan() {
            return Err(ProblemError::InvalidVariableBounds);
        }
        Ok(())
    }

    /// Check that a constraint to be added is valid to add to this Problem
    fn validate_constraint(&self, constraint: &Constraint) -> Result<(), ProblemError> {
        // Check that a constraint with the same id doesn't already exist
        if self.constraints.contains_key(constraint.get_id()) {
            return Err(ProblemError::ConstraintAlreadyExists(
                constraint.get_id().to_string(),
            ));
        }
        // Check that the bounds make sense
        match *constraint {
            Constraint::Equality { equals, .. } => {
                if !equals.is_finite() {
                    return Err(ProblemError::InvalidConstraintBounds);
                }
            }
            Constraint::Inequality {
                lower_bound,
                upper_bound,
                ..
            } => {
                if lower_bound > upper_bound || lower_bound.is_nan() || upper_bound.is_nan() {
                    return Err(ProblemError::InvalidConstraintBounds);
                }
            }
        }
        // Check that the variables in this constraint are in the model, and appear only once
        let mut seen = HashSet::new();
        for term in constraint.get_terms() {
            if self.variable(term.variable).is_none() {
                return Err(ProblemError::NonExistentVariablesInConstraint);
            }
            if !seen.insert(term.variable) {
                return Err(ProblemError::RepeatedVariableInConstraint(
                    constraint.get_id().to_string(),
                ));
            }
        }
        // All checks have passed
        Ok(())
    }

    fn check_term_lengths(
        id: &str,
        variables: &[VariableId],
        coefficients: &[f64],
    ) -> Result<(), ProblemError> {
        if variables.len() != coefficients.len() {
            return Err(ProblemError::MismatchedTerms(id.to_string()));
        }
        Ok(())
    }

    // endregion Validation Functions

    // region Check Problem
    /// Number of variables in the problem
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Number of constraints in the problem
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Objective of the problem
    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    /// Get a constraint by its id
    pub fn constraint(&self, id: &str) -> Option<&Constraint> {
        self.constraints.get(id)
    }
    // endregion Check Problem

    // region Solving
    /// Solve the problem with a fresh instance of the default solver
    pub fn solve(&self) -> Result<ProblemSolution, ProblemError> {
        let mut solver = default_solver()?;
        self.solve_with(solver.as_mut())
    }

    /// Load the problem into an empty `solver` and solve it
    pub fn solve_with(&self, solver: &mut dyn Solver) -> Result<ProblemSolution, ProblemError> {
        for var in self.variables.values() {
            match var.variable_type {
                VariableType::Continuous => {
                    solver.add_continuous_variable(&var.id, var.lower_bound, var.upper_bound)?
                }
                VariableType::Binary => {
                    if !solver.binary_variable_capable() {
                        return Err(SolverError::UnsupportedVariableType(
                            VariableType::Binary.to_string(),
                        )
                        .into());
                    }
                    solver.add_binary_variable(&var.id)?
                }
            }
        }

        for cons in self.constraints.values() {
            let variables = cons
                .get_terms()
                .iter()
                .map(|t| self.variables.get_index(t.variable.0).map(|(id, _)| id.as_str()))
                .collect::<Option<Vec<&str>>>()
                .ok_or(ProblemError::NonExistentVariablesInConstraint)?;
            let coefficients = cons.get_terms().iter().map(|t| t.coefficient).collect();
            match *cons {
                Constraint::Equality { ref id, equals, .. } => {
                    solver.add_equality_constraint(id, variables, coefficients, equals)?
                }
                Constraint::Inequality {
                    ref id,
                    lower_bound,
                    upper_bound,
                    ..
                } => solver.add_inequality_constraint(
                    id,
                    variables,
                    coefficients,
                    lower_bound,
                    upper_bound,
                )?,
            }
        }

        solver.clear_objective()?;
        for term in self.objective.terms() {
            let (id, _) = self
                .variables
                .get_index(term.variable.0)
                .ok_or(ProblemError::NonExistentVariablesInObjective)?;
            solver.add_linear_objective_term(id, term.coefficient)?;
        }

        debug!(
            "Solving {:?} problem with {} variables and {} constraints",
            self.problem_type,
            self.num_variables(),
            self.num_constraints()
        );
        let solution = solver.solve()?;
        debug!("Solver finished with status {}", solution.status);
        Ok(solution)
    }
    // endregion Solving
}

impl Default for Problem {
    fn default() -> Self {
        Self::new()
    }
}

/// Types of optimization problems
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProblemType {
    /// Problem with linear objective and constraints, and continuous variables
    LinearContinuous,
    /// Problem with linear objective and constraints, with binary and continuous variables
    LinearMixedInteger,
}

/// Errors associated with the Problem
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    /// Error when trying to add a variable with the same id as an existing variable
    #[error("Tried to add variable `{0}` with the same id as an existing variable")]
    VariableIdAlreadyExists(String),
    /// Error when trying to add variable with invalid bounds
    #[error("Tried to add a variable with lower_bound>upper_bound")]
    InvalidVariableBounds,
    /// Error when trying to add a constraint with the same id as an existing constraint
    #[error("Tried to add constraint `{0}` with the same id as an existing constraint")]
    ConstraintAlreadyExists(String),
    /// Error when trying to add a constraint with invalid bounds
    #[error("Tried to add a constraint with lower_bound > upper_bound or a non-finite right hand side")]
    InvalidConstraintBounds,
    /// Error when trying to add a constraint that contains variables not in the model
    #[error("Tried to add a constraint with variables not in the model")]
    NonExistentVariablesInConstraint,
    /// Error when a constraint mentions the same variable more than once
    #[error("Constraint `{0}` contains the same variable more than once")]
    RepeatedVariableInConstraint(String),
    /// Error when the variables and coefficients of a constraint don't line up
    #[error("Constraint `{0}` has a different number of variables and coefficients")]
    MismatchedTerms(String),
    /// Error when trying to add an objective term which includes variables not in the model
    #[error("Tried adding an objective term with variables not in the model")]
    NonExistentVariablesInObjective,
    /// Error when trying to add an objective term with a non-finite coefficient
    #[error("Tried adding an objective term with a non-finite coefficient")]
    InvalidObjectiveCoefficient,
    /// Error raised by the solver backend
    #[error(transparent)]
    Solver(#[from] SolverError),
}
