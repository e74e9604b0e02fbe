//! Solver interface for the microlp mixed integer solver
use ::microlp::{ComparisonOp, OptimizationDirection};
use indexmap::IndexMap;
use log::{debug, warn};

use crate::optimize::solvers::{Solver, SolverError};
use crate::optimize::variable::VariableType;
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// Variable as recorded before being handed to microlp
#[derive(Clone, Debug)]
struct VariableSpec {
    variable_type: VariableType,
    lower_bound: f64,
    upper_bound: f64,
}

/// Solver backed by microlp's branch and bound
///
/// microlp fixes the objective coefficient of a variable when the variable is created, so the
/// problem is recorded here and only translated into a `microlp::Problem` when solving.
#[derive(Clone, Debug)]
pub struct MicrolpSolver {
    variables: IndexMap<String, VariableSpec>,
    constraints: Vec<(Vec<usize>, Vec<f64>, ComparisonOp, f64)>,
    objective: IndexMap<String, f64>,
}

impl MicrolpSolver {
    /// Create an empty solver
    pub fn new() -> Self {
        MicrolpSolver {
            variables: IndexMap::new(),
            constraints: Vec::new(),
            objective: IndexMap::new(),
        }
    }

    fn add_variable(&mut self, id: &str, spec: VariableSpec) -> Result<(), SolverError> {
        if self.variables.contains_key(id) {
            return Err(SolverError::DuplicateVariable(id.to_string()));
        }
        self.variables.insert(id.to_string(), spec);
        Ok(())
    }

    /// Translate variable ids into positions
    fn resolve(
        &self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
    ) -> Result<Vec<usize>, SolverError> {
        if variables.len() != coefficients.len() {
            return Err(SolverError::MismatchedTerms(id.to_string()));
        }
        variables
            .iter()
            .map(|v| {
                self.variables
                    .get_index_of(*v)
                    .ok_or_else(|| SolverError::UnknownVariable(v.to_string()))
            })
            .collect()
    }
}

impl Default for MicrolpSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for MicrolpSolver {
    fn binary_variable_capable(&self) -> bool {
        true
    }

    fn add_continuous_variable(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError> {
        self.add_variable(
            id,
            VariableSpec {
                variable_type: VariableType::Continuous,
                lower_bound,
                upper_bound,
            },
        )
    }

    fn add_binary_variable(&mut self, id: &str) -> Result<(), SolverError> {
        self.add_variable(
            id,
            VariableSpec {
                variable_type: VariableType::Binary,
                lower_bound: 0.,
                upper_bound: 1.,
            },
        )
    }

    fn add_equality_constraint(
        &mut self,
        id: &str,
        variables: Vec<&str>,
        coefficients: Vec<f64>,
        equals: f64,
    ) -> Result<(), SolverError> {
        let positions = self.resolve(id, &variables, &coefficients)?;
        self.constraints
            .push((positions, coefficients, ComparisonOp::Eq, equals));
        Ok(())
    }

    fn add_inequality_constraint(
        &mut self,
        id: &str,
        variables: Vec<&str>,
        coefficients: Vec<f64>,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError> {
        let positions = self.resolve(id, &variables, &coefficients)?;
        if lower_bound.is_finite() && upper_bound.is_finite() && lower_bound == upper_bound {
            self.constraints
                .push((positions, coefficients, ComparisonOp::Eq, lower_bound));
            return Ok(());
        }
        if lower_bound.is_finite() {
            self.constraints.push((
                positions.clone(),
                coefficients.clone(),
                ComparisonOp::Ge,
                lower_bound,
            ));
        }
        if upper_bound.is_finite() {
            self.constraints
                .push((positions, coefficients, ComparisonOp::Le, upper_bound));
        }
        Ok(())
    }

    fn add_linear_objective_term(
        &mut self,
        variable_id: &str,
        coefficient: f64,
    ) -> Result<(), SolverError> {
        if !self.variables.contains_key(variable_id) {
            return Err(SolverError::UnknownVariable(variable_id.to_string()));
        }
        *self.objective.entry(variable_id.to_string()).or_insert(0.) += coefficient;
        Ok(())
    }

    fn clear_objective(&mut self) -> Result<(), SolverError> {
        self.objective.clear();
        Ok(())
    }

    fn solve(&mut self) -> Result<ProblemSolution, SolverError> {
        let mut problem = ::microlp::Problem::new(OptimizationDirection::Minimize);

        let mut handles = Vec::with_capacity(self.variables.len());
        for (id, spec) in &self.variables {
            let coef = self.objective.get(id).copied().unwrap_or(0.);
            let handle = match spec.variable_type {
                VariableType::Continuous => {
                    problem.add_var(coef, (spec.lower_bound, spec.upper_bound))
                }
                VariableType::Binary => problem.add_binary_var(coef),
            };
            handles.push(handle);
        }

        for (positions, coefficients, op, rhs) in &self.constraints {
            let expr: Vec<(::microlp::Variable, f64)> = positions
                .iter()
                .zip(coefficients)
                .map(|(p, c)| (handles[*p], *c))
                .collect();
            problem.add_constraint(expr, *op, *rhs);
        }

        debug!(
            "microlp solving {} variables, {} constraints",
            self.variables.len(),
            self.constraints.len()
        );

        match problem.solve() {
            Ok(solution) => {
                let variable_values = self
                    .variables
                    .keys()
                    .zip(&handles)
                    .map(|(id, handle)| (id.clone(), *solution.var_value(*handle)))
                    .collect::<IndexMap<String, f64>>();
                Ok(ProblemSolution {
                    status: OptimizationStatus::Optimal,
                    objective_value: Some(solution.objective()),
                    variable_values: Some(variable_values),
                })
            }
            Err(::microlp::Error::Infeasible) => {
                Ok(ProblemSolution::failed(OptimizationStatus::Infeasible))
            }
            Err(::microlp::Error::Unbounded) => {
                Ok(ProblemSolution::failed(OptimizationStatus::Unbounded))
            }
            Err(::microlp::Error::InternalError(msg)) => {
                warn!("microlp failed to solve the problem: {}", msg);
                Ok(ProblemSolution::failed(OptimizationStatus::NumericalError))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solve_small_mip() {
        // minimize x + 2y, x + 4y >= 3.5, y binary, x in [0, 10]
        let mut solver = MicrolpSolver::new();
        solver.add_continuous_variable("x", 0., 10.).unwrap();
        solver.add_binary_variable("y").unwrap();
        solver
            .add_inequality_constraint(
                "cover",
                vec!["x", "y"],
                vec![1., 4.],
                3.5,
                f64::INFINITY,
            )
            .unwrap();
        solver.add_linear_objective_term("x", 1.).unwrap();
        solver.add_linear_objective_term("y", 2.).unwrap();
        let solution = solver.solve().unwrap();
        assert!(solution.is_optimal());
        // The relaxation would stop at y = 0.875
        assert!((solution.objective_value.unwrap() - 2.).abs() < 1e-6);
        assert!((solution.value("y").unwrap() - 1.).abs() < 1e-6);
        assert!(solution.value("x").unwrap().abs() < 1e-6);
    }

    #[test]
    fn infeasible_is_a_status() {
        let mut solver = MicrolpSolver::new();
        solver.add_binary_variable("b").unwrap();
        solver
            .add_equality_constraint("too_much", vec!["b"], vec![1.], 2.)
            .unwrap();
        solver.add_linear_objective_term("b", 1.).unwrap();
        let solution = solver.solve().unwrap();
        assert_eq!(solution.status, OptimizationStatus::Infeasible);
        assert!(solution.variable_values.is_none());
    }

    #[test]
    fn unknown_and_duplicate_variables() {
        let mut solver = MicrolpSolver::new();
        solver.add_binary_variable("b").unwrap();
        assert_eq!(
            solver.add_binary_variable("b"),
            Err(SolverError::DuplicateVariable("b".to_string()))
        );
        assert_eq!(
            solver.add_equality_constraint("c", vec!["z"], vec![1.], 1.),
            Err(SolverError::UnknownVariable("z".to_string()))
        );
        assert_eq!(
            solver.add_equality_constraint("c", vec!["b"], vec![1., 2.], 1.),
            Err(SolverError::MismatchedTerms("c".to_string()))
        );
        assert_eq!(
            solver.add_linear_objective_term("z", 1.),
            Err(SolverError::UnknownVariable("z".to_string()))
        );
    }
}
