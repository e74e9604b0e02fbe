//! Provides struct for representing an optimization problem's objective

use crate::optimize::variable::VariableId;

/// Represents the linear objective of an optimization problem, which is always minimized
#[derive(Debug, Clone, Default)]
pub struct Objective {
    /// Terms included in the objective (See [`ObjectiveTerm`])
    terms: Vec<ObjectiveTerm>,
}

impl Objective {
    /// Create a new empty objective
    pub fn new() -> Self {
        Self { terms: Vec::new() }
    }

    /// Terms of the objective
    pub fn terms(&self) -> &[ObjectiveTerm] {
        &self.terms
    }

    /// Add a new term to the objective
    pub fn add_term(&mut self, term: ObjectiveTerm) {
        self.terms.push(term);
    }

    /// Remove all terms from the objective
    pub fn remove_all_terms(&mut self) {
        self.terms.clear();
    }
}

/// A linear term in the objective, `coefficient` * `variable`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectiveTerm {
    /// Variable in objective term
    pub variable: VariableId,
    /// Coefficient for linear term
    pub coefficient: f64,
}

impl ObjectiveTerm {
    /// Create a new linear objective term
    pub fn new(variable: VariableId, coefficient: f64) -> Self {
        ObjectiveTerm {
            variable,
            coefficient,
        }
    }
}
