//! Mixed integer model assigning demands to tanks
use indexmap::IndexMap;
use log::debug;

use crate::allocation::placement::{Placement, TankPlacement};
use crate::allocation::tank::Tank;
use crate::allocation::AllocationError;
use crate::optimize::problem::Problem;
use crate::optimize::variable::{Variable, VariableId};
use crate::optimize::ProblemSolution;

/// How the stranded capacity of a tank is tied to the demands placed into it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrandedDefinition {
    /// `stranded = spare - placed` for every tank, touched or not
    ///
    /// An untouched tank strands its full spare capacity, which steers volume into the
    /// tightest tanks first.
    #[default]
    Balance,
    /// `stranded = spare - placed` only for tanks which receive a demand, enforced with big-M
    /// constraints gated on the usage indicator; untouched tanks strand nothing
    UsageGated,
}

/// Key of the assignment variable placing demand `demand` into tank `tank`
///
/// Both are positions in the input sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssignmentKey {
    pub tank: usize,
    pub demand: usize,
}

/// The assignment problem for one set of tanks and demands
///
/// Holds the [`Problem`] together with the handles of its variables:
/// - `assign_{t}_{d}`: binary, demand `d` is placed into tank `t`
/// - `use_{t}`: binary, tank `t` receives at least one demand
/// - `stranded_{t}`: continuous in `[0, spare_t]`, capacity of tank `t` left unused
#[derive(Debug, Clone)]
pub struct AllocationModel {
    problem: Problem,
    assign: IndexMap<AssignmentKey, VariableId>,
    use_tank: Vec<VariableId>,
    stranded: Vec<VariableId>,
    spare_capacity: Vec<f64>,
    demands: Vec<f64>,
    definition: StrandedDefinition,
}

impl AllocationModel {
    /// Build the variables and constraints of the model
    ///
    /// # Parameters
    /// - `spare_capacity`: Spare capacity of each tank (validated, non-negative)
    /// - `demands`: Demand volumes (validated, non-negative)
    /// - `definition`: How stranded capacity is linked to placements
    ///
    /// The objective is left empty, see [`set_weighted_objective`](Self::set_weighted_objective),
    /// [`set_stranded_objective`](Self::set_stranded_objective) and
    /// [`set_usage_objective`](Self::set_usage_objective).
    pub fn build(
        spare_capacity: &[f64],
        demands: &[f64],
        definition: StrandedDefinition,
    ) -> Result<Self, AllocationError> {
        let mut model = AllocationModel {
            problem: Problem::new(),
            assign: IndexMap::with_capacity(spare_capacity.len() * demands.len()),
            use_tank: Vec::with_capacity(spare_capacity.len()),
            stranded: Vec::with_capacity(spare_capacity.len()),
            spare_capacity: spare_capacity.to_vec(),
            demands: demands.to_vec(),
            definition,
        };
        model.add_variables()?;
        model.add_assign_once_constraints()?;
        for tank in 0..model.spare_capacity.len() {
            model.add_tank_constraints(tank)?;
        }
        debug!(
            "Built {:?} allocation model: {} tanks, {} demands, {} variables, {} constraints",
            definition,
            model.spare_capacity.len(),
            model.demands.len(),
            model.problem.num_variables(),
            model.problem.num_constraints()
        );
        Ok(model)
    }

    fn add_variables(&mut self) -> Result<(), AllocationError> {
        for tank in 0..self.spare_capacity.len() {
            for demand in 0..self.demands.len() {
                let var = self
                    .problem
                    .add_variable(Variable::binary(format!("assign_{}_{}", tank, demand)))?;
                self.assign.insert(AssignmentKey { tank, demand }, var);
            }
        }
        for tank in 0..self.spare_capacity.len() {
            let var = self
                .problem
                .add_variable(Variable::binary(format!("use_{}", tank)))?;
            self.use_tank.push(var);
        }
        for (tank, spare) in self.spare_capacity.iter().enumerate() {
            let var = self.problem.add_variable(Variable::continuous(
                format!("stranded_{}", tank),
                0.,
                *spare,
            ))?;
            self.stranded.push(var);
        }
        Ok(())
    }

    /// Handle of the assignment variable of demand `demand` in tank `tank`
    pub fn assignment(&self, tank: usize, demand: usize) -> Option<VariableId> {
        self.assign.get(&AssignmentKey { tank, demand }).copied()
    }

    /// Handle of the usage indicator of tank `tank`
    pub fn usage(&self, tank: usize) -> Option<VariableId> {
        self.use_tank.get(tank).copied()
    }

    /// Handle of the stranded capacity variable of tank `tank`
    pub fn stranded(&self, tank: usize) -> Option<VariableId> {
        self.stranded.get(tank).copied()
    }

    /// Assignment variables of one tank, in demand order
    fn tank_assignments(&self, tank: usize) -> Vec<VariableId> {
        (0..self.demands.len())
            .filter_map(|demand| self.assignment(tank, demand))
            .collect()
    }

    /// Every demand is placed into exactly one tank
    fn add_assign_once_constraints(&mut self) -> Result<(), AllocationError> {
        let ones = vec![1.; self.spare_capacity.len()];
        for demand in 0..self.demands.len() {
            let vars = (0..self.spare_capacity.len())
                .filter_map(|tank| self.assignment(tank, demand))
                .collect::<Vec<_>>();
            self.problem.add_new_equality_constraint(
                &format!("assign_once_{}", demand),
                &vars,
                &ones,
                1.,
            )?;
        }
        Ok(())
    }

    /// Capacity, usage linking and stranded definition of one tank
    fn add_tank_constraints(&mut self, tank: usize) -> Result<(), AllocationError> {
        let spare = self.spare_capacity[tank];
        let assigned = self.tank_assignments(tank);
        let use_tank = self.use_tank[tank];
        let stranded = self.stranded[tank];

        self.problem.add_new_inequality_constraint(
            &format!("capacity_{}", tank),
            &assigned,
            &self.demands,
            f64::NEG_INFINITY,
            spare,
        )?;

        for (demand, var) in assigned.iter().enumerate() {
            self.problem.add_new_inequality_constraint(
                &format!("use_link_{}_{}", tank, demand),
                &[use_tank, *var],
                &[1., -1.],
                0.,
                f64::INFINITY,
            )?;
        }

        // stranded + added
        let mut vars = vec![stranded];
        vars.extend_from_slice(&assigned);
        let mut coefs = vec![1.];
        coefs.extend_from_slice(&self.demands);

        match self.definition {
            StrandedDefinition::Balance => {
                self.problem.add_new_equality_constraint(
                    &format!("balance_{}", tank),
                    &vars,
                    &coefs,
                    spare,
                )?;
            }
            StrandedDefinition::UsageGated => {
                let big_m = spare;
                vars.push(use_tank);
                // stranded + added + M*use <= spare + M
                coefs.push(big_m);
                self.problem.add_new_inequality_constraint(
                    &format!("gate_upper_{}", tank),
                    &vars,
                    &coefs,
                    f64::NEG_INFINITY,
                    spare + big_m,
                )?;
                // stranded + added - M*use >= spare - M
                if let Some(last) = coefs.last_mut() {
                    *last = -big_m;
                }
                self.problem.add_new_inequality_constraint(
                    &format!("gate_lower_{}", tank),
                    &vars,
                    &coefs,
                    spare - big_m,
                    f64::INFINITY,
                )?;
                // stranded - M*use <= 0
                self.problem.add_new_inequality_constraint(
                    &format!("gate_off_{}", tank),
                    &[stranded, use_tank],
                    &[1., -big_m],
                    f64::NEG_INFINITY,
                    0.,
                )?;
            }
        }
        Ok(())
    }

    /// Minimize `sum(weight_t * stranded_t) + usage_penalty * sum(use_t)`
    ///
    /// `weights` holds one weight per tank, in tank order.
    pub fn set_weighted_objective(
        &mut self,
        weights: &[f64],
        usage_penalty: f64,
    ) -> Result<(), AllocationError> {
        self.problem.remove_all_objective_terms();
        for (var, weight) in self.stranded.iter().zip(weights) {
            self.problem.add_new_linear_objective_term(*var, *weight)?;
        }
        self.add_usage_terms(usage_penalty)
    }

    /// Minimize the stranded capacity of a single tank
    pub fn set_stranded_objective(&mut self, tank: usize) -> Result<(), AllocationError> {
        self.problem.remove_all_objective_terms();
        if let Some(var) = self.stranded(tank) {
            self.problem.add_new_linear_objective_term(var, 1.)?;
        }
        Ok(())
    }

    /// Minimize `usage_penalty * sum(use_t)`
    pub fn set_usage_objective(&mut self, usage_penalty: f64) -> Result<(), AllocationError> {
        self.problem.remove_all_objective_terms();
        self.add_usage_terms(usage_penalty)
    }

    fn add_usage_terms(&mut self, usage_penalty: f64) -> Result<(), AllocationError> {
        if usage_penalty == 0. {
            return Ok(());
        }
        for var in &self.use_tank {
            self.problem
                .add_new_linear_objective_term(*var, usage_penalty)?;
        }
        Ok(())
    }

    /// Restrict the stranded capacity of `tank` to at most `limit`
    pub fn cap_stranded(&mut self, tank: usize, limit: f64) -> Result<(), AllocationError> {
        if let Some(var) = self.stranded(tank) {
            self.problem.add_new_inequality_constraint(
                &format!("fix_stranded_{}", tank),
                &[var],
                &[1.],
                f64::NEG_INFINITY,
                limit,
            )?;
        }
        Ok(())
    }

    /// The underlying problem
    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    /// Solve the model with a fresh instance of the default solver
    pub fn solve(&self) -> Result<ProblemSolution, AllocationError> {
        Ok(self.problem.solve()?)
    }

    /// Turn an optimal solution into a placement report
    ///
    /// An assignment variable above `threshold` counts as placed. `tanks` must be the tanks the
    /// model was built for, in the same order.
    pub fn decode(
        &self,
        tanks: &[Tank],
        solution: &ProblemSolution,
        threshold: f64,
    ) -> Placement {
        let placements = tanks
            .iter()
            .enumerate()
            .map(|(t, tank)| {
                let demands = self
                    .demands
                    .iter()
                    .enumerate()
                    .filter(|(d, _)| {
                        self.assignment(t, *d)
                            .and_then(|var| solution.value_of(var))
                            .is_some_and(|v| v > threshold)
                    })
                    .map(|(_, volume)| *volume)
                    .collect::<Vec<_>>();
                let stranded = self
                    .stranded(t)
                    .and_then(|var| solution.value_of(var))
                    .unwrap_or(0.);
                (tank.id.clone(), TankPlacement::new(tank, demands, stranded))
            })
            .collect();
        Placement {
            tanks: placements,
            objective_value: solution.objective_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::constraint::Constraint;

    #[test]
    fn balance_model_layout() {
        let model =
            AllocationModel::build(&[75., 15.], &[56., 2., 18.], StrandedDefinition::Balance)
                .unwrap();
        // 6 assignments, 2 usage indicators, 2 stranded
        assert_eq!(model.problem().num_variables(), 10);
        // 3 assign once, 2 capacity, 6 links, 2 balance
        assert_eq!(model.problem().num_constraints(), 13);
        assert_eq!(model.assignment(1, 2).unwrap().index(), 5);
        assert_eq!(model.usage(0).unwrap().index(), 6);
        assert_eq!(model.stranded(1).unwrap().index(), 9);
        assert!(model.assignment(2, 0).is_none());

        let stranded = model.problem().variable(model.stranded(1).unwrap()).unwrap();
        assert_eq!(stranded.id, "stranded_1");
        assert!((stranded.upper_bound - 15.).abs() < 1e-25);

        match model.problem().constraint("balance_0").unwrap() {
            Constraint::Equality { terms, equals, .. } => {
                assert_eq!(terms.len(), 4);
                assert!((equals - 75.).abs() < 1e-25);
                assert!((terms[1].coefficient - 56.).abs() < 1e-25);
            }
            _ => panic!("Balance should be an equality"),
        }
        assert!(model.problem().constraint("gate_upper_0").is_none());
    }

    #[test]
    fn usage_gated_model_layout() {
        let model =
            AllocationModel::build(&[75., 15.], &[56., 2., 18.], StrandedDefinition::UsageGated)
                .unwrap();
        // 3 assign once, 2 capacity, 6 links, 2 * 3 gates
        assert_eq!(model.problem().num_constraints(), 17);
        assert!(model.problem().constraint("balance_0").is_none());
        match model.problem().constraint("gate_lower_1").unwrap() {
            Constraint::Inequality {
                terms, lower_bound, ..
            } => {
                assert_eq!(terms.len(), 5);
                assert!((terms[4].coefficient + 15.).abs() < 1e-25);
                assert!(lower_bound.abs() < 1e-25);
            }
            _ => panic!("Gate should be an inequality"),
        }
    }

    #[test]
    fn objectives() {
        let mut model =
            AllocationModel::build(&[75., 15.], &[56.], StrandedDefinition::Balance).unwrap();
        model.set_weighted_objective(&[1., 91.], 1.).unwrap();
        assert_eq!(model.problem().objective().terms().len(), 4);
        model.set_stranded_objective(1).unwrap();
        assert_eq!(model.problem().objective().terms().len(), 1);
        model.set_usage_objective(0.).unwrap();
        assert!(model.problem().objective().terms().is_empty());
    }

    #[test]
    fn solve_and_decode() {
        let tanks = vec![Tank::new("big", 0., 10.), Tank::new("small", 0., 4.)];
        let mut model =
            AllocationModel::build(&[10., 4.], &[3., 4.], StrandedDefinition::Balance).unwrap();
        model.set_weighted_objective(&[1., 15.], 1.).unwrap();
        let solution = model.solve().unwrap();
        assert!(solution.is_optimal());

        let placement = model.decode(&tanks, &solution, 0.5);
        // The small tank is filled exactly by the 4 volume demand
        assert_eq!(placement.tanks["small"].demands, vec![4.]);
        assert!(placement.tanks["small"].stranded.abs() < 1e-6);
        assert_eq!(placement.tanks["big"].demands, vec![3.]);
        assert!((placement.tanks["big"].stranded - 7.).abs() < 1e-6);
        assert!((placement.tanks["big"].new_level - 3.).abs() < 1e-9);
    }
}
