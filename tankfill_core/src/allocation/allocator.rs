//! Validates input, builds the allocation model, solves it and decodes the placement
use derive_builder::Builder;
use log::{debug, warn};

use crate::allocation::model::{AllocationModel, StrandedDefinition};
use crate::allocation::placement::{AllocationResult, Placement};
use crate::allocation::tank::{spare_capacities, Tank};
use crate::allocation::weights::{priority_positions, weights_by_position};
use crate::allocation::AllocationError;
use crate::configuration;
use crate::optimize::OptimizationStatus;

/// How the priority between tanks is expressed to the solver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectiveStrategy {
    /// A single solve with exponentially scaled weights on each tank's stranded capacity
    #[default]
    Weighted,
    /// One solve per tank in priority order, each minimizing that tank's stranded capacity
    /// with the optima of all tighter tanks held fixed, followed by a solve minimizing the
    /// number of tanks used
    ///
    /// Costs `n + 1` full mixed integer solves for `n` tanks, each built from scratch, so it is
    /// far slower than [`ObjectiveStrategy::Weighted`] on all but small instances.
    Sequential,
}

/// Places demands into tanks, minimizing stranded capacity lexicographically
///
/// # Examples
/// ```rust
/// use tankfill_core::allocation::{Tank, TankAllocatorBuilder, StrandedDefinition};
/// let allocator = TankAllocatorBuilder::default()
///     .usage_penalty(0.5)
///     .stranded_definition(StrandedDefinition::Balance)
///     .build()
///     .unwrap();
/// let tanks = vec![Tank::new("tank_0", 0., 10.), Tank::new("tank_1", 6., 10.)];
/// let result = allocator.solve(&tanks, &[4.]).unwrap();
/// assert!(result.is_ok());
/// ```
#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct TankAllocator {
    /// Objective weight of every tank receiving at least one demand, breaks ties in favour of
    /// touching fewer tanks
    ///
    /// Must stay small next to the smallest lexicographic weight, this is not checked.
    #[builder(default = "configuration::current().usage_penalty")]
    usage_penalty: f64,
    /// How stranded capacity is linked to placements
    #[builder(default)]
    stranded_definition: StrandedDefinition,
    /// How tank priority is expressed to the solver
    #[builder(default)]
    strategy: ObjectiveStrategy,
}

impl TankAllocatorBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(penalty) = self.usage_penalty {
            if !(penalty.is_finite() && penalty >= 0.) {
                return Err(AllocationError::InvalidUsagePenalty(penalty).to_string());
            }
        }
        Ok(())
    }
}

impl Default for TankAllocator {
    fn default() -> Self {
        TankAllocator {
            usage_penalty: configuration::current().usage_penalty,
            stranded_definition: StrandedDefinition::default(),
            strategy: ObjectiveStrategy::default(),
        }
    }
}

impl TankAllocator {
    pub fn usage_penalty(&self) -> f64 {
        self.usage_penalty
    }

    pub fn stranded_definition(&self) -> StrandedDefinition {
        self.stranded_definition
    }

    pub fn strategy(&self) -> ObjectiveStrategy {
        self.strategy
    }

    /// Place every demand into exactly one tank
    ///
    /// # Parameters
    /// - `tanks`: The tanks, with unique ids
    /// - `demands`: Non-negative demand volumes
    ///
    /// # Returns
    /// The [`AllocationResult`], which carries a placement if the solver found an optimum
    ///
    /// # Errors
    /// Returns an error if a tank is overfilled or has non-finite levels, tank ids repeat, a
    /// demand is negative or not finite, or the spare capacities can't produce lexicographic
    /// weights. All of these are checked before the solver is invoked.
    pub fn solve(&self, tanks: &[Tank], demands: &[f64]) -> Result<AllocationResult, AllocationError> {
        let spare = spare_capacities(tanks)?;
        validate_demands(demands)?;

        if demands.is_empty() {
            debug!("No demands to place into {} tanks", tanks.len());
            return Ok(AllocationResult::placed(Placement::untouched(
                tanks,
                self.stranded_definition,
            )));
        }
        if tanks.is_empty() {
            warn!("No tanks to place {} demands into", demands.len());
            return Ok(AllocationResult::failed(OptimizationStatus::Infeasible));
        }

        let spare = spare.values().copied().collect::<Vec<_>>();
        let config = configuration::current();
        let mut model = AllocationModel::build(&spare, demands, self.stranded_definition)?;

        let solution = match self.strategy {
            ObjectiveStrategy::Weighted => {
                let ids = tanks.iter().map(|t| t.id.as_str()).collect::<Vec<_>>();
                let weights = weights_by_position(&ids, &spare, config.weight_margin)?;
                model.set_weighted_objective(&weights, self.usage_penalty)?;
                model.solve()?
            }
            ObjectiveStrategy::Sequential => {
                for tank in priority_positions(&spare) {
                    model.set_stranded_objective(tank)?;
                    let step = model.solve()?;
                    let best = match (step.is_optimal(), step.objective_value) {
                        (true, Some(best)) => best,
                        _ => {
                            warn!(
                                "Minimizing stranded capacity of `{}` ended with status {}",
                                tanks[tank].id, step.status
                            );
                            return Ok(AllocationResult::failed(step.status));
                        }
                    };
                    debug!("Tank `{}` strands at least {}", tanks[tank].id, best);
                    model.cap_stranded(tank, best + config.sequential_tolerance)?;
                }
                model.set_usage_objective(self.usage_penalty)?;
                model.solve()?
            }
        };

        if !solution.is_optimal() {
            warn!("Allocation ended with status {}", solution.status);
            return Ok(AllocationResult::failed(solution.status));
        }
        let placement = model.decode(tanks, &solution, config.assignment_threshold);
        debug!(
            "Placed {} into {} tanks, {} stranded",
            placement.total_placed(),
            placement.tanks_used(),
            placement.total_stranded()
        );
        Ok(AllocationResult::placed(placement))
    }
}

/// Solve with the default [`TankAllocator`]
pub fn allocate(tanks: &[Tank], demands: &[f64]) -> Result<AllocationResult, AllocationError> {
    TankAllocator::default().solve(tanks, demands)
}

fn validate_demands(demands: &[f64]) -> Result<(), AllocationError> {
    match demands
        .iter()
        .enumerate()
        .find(|(_, v)| !(v.is_finite() && **v >= 0.))
    {
        Some((index, volume)) => Err(AllocationError::InvalidDemand {
            index,
            volume: *volume,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// Tanks with max level 95 and current levels 20, 0, 80, 0
    fn base_case() -> Vec<Tank> {
        [20., 0., 80., 0.]
            .iter()
            .enumerate()
            .map(|(i, level)| Tank::new(format!("tank_{}", i), *level, 95.))
            .collect()
    }

    fn assert_valid_placement(tanks: &[Tank], demands: &[f64], placement: &Placement) {
        let total_demand = demands.iter().sum::<f64>();
        assert!((placement.total_placed() - total_demand).abs() < 1e-9);
        let mut placed = placement
            .tanks
            .values()
            .flat_map(|t| t.demands.iter().copied())
            .collect::<Vec<_>>();
        let mut expected = demands.to_vec();
        placed.sort_by(f64::total_cmp);
        expected.sort_by(f64::total_cmp);
        assert_eq!(placed, expected);
        for tank in tanks {
            let p = placement.get(&tank.id).unwrap();
            assert!(p.placed <= tank.spare_capacity() + 1e-9);
            assert!(p.new_level <= tank.max_level + 1e-9);
        }
    }

    #[test]
    fn base_case_is_lexicographic() {
        init_logging();
        let tanks = base_case();
        let demands = [56., 2., 18., 40.];
        let result = TankAllocator::default().solve(&tanks, &demands).unwrap();
        assert!(result.is_ok());
        let placement = result.placement.unwrap();
        assert_valid_placement(&tanks, &demands, &placement);

        assert!((placement.total_stranded() - 164.).abs() < 1e-6);
        // The tightest tank only fits the 2, then 56 + 18 fill tank_0 up to 1 short,
        // and the 40 goes into the first of the two empty tanks
        let tank_2 = placement.get("tank_2").unwrap();
        assert_eq!(tank_2.demands, vec![2.]);
        assert!((tank_2.stranded - 13.).abs() < 1e-6);
        let tank_0 = placement.get("tank_0").unwrap();
        assert!((tank_0.placed - 74.).abs() < 1e-6);
        assert!((tank_0.stranded - 1.).abs() < 1e-6);
        assert_eq!(placement.get("tank_1").unwrap().demands, vec![40.]);
        assert!(!placement.get("tank_3").unwrap().is_used());
        assert!((placement.get("tank_3").unwrap().stranded - 95.).abs() < 1e-6);
    }

    #[test]
    fn reordering_demands_keeps_objective() {
        init_logging();
        let tanks = base_case();
        let allocator = TankAllocator::default();
        let first = allocator.solve(&tanks, &[56., 2., 18., 40.]).unwrap();
        let second = allocator.solve(&tanks, &[56., 18., 2., 40.]).unwrap();
        let first = first.placement.unwrap();
        let second = second.placement.unwrap();
        let a = first.objective_value.unwrap();
        let b = second.objective_value.unwrap();
        assert!((a - b).abs() <= 1e-6 * a.abs().max(1.));
        assert!((first.total_stranded() - second.total_stranded()).abs() < 1e-6);
    }

    #[test]
    fn solving_twice_is_idempotent() {
        let tanks = base_case();
        let demands = [30., 30., 30., 5., 5.];
        let allocator = TankAllocator::default();
        let first = allocator.solve(&tanks, &demands).unwrap().placement.unwrap();
        let second = allocator.solve(&tanks, &demands).unwrap().placement.unwrap();
        assert_valid_placement(&tanks, &demands, &first);
        let a = first.objective_value.unwrap();
        let b = second.objective_value.unwrap();
        assert!((a - b).abs() <= 1e-6 * a.abs().max(1.));
    }

    #[test]
    fn empty_demands() {
        let tanks = base_case();
        let result = allocate(&tanks, &[]).unwrap();
        assert!(result.is_ok());
        let placement = result.placement.unwrap();
        for tank in &tanks {
            let p = placement.get(&tank.id).unwrap();
            assert!(p.placed.abs() < 1e-25);
            assert!((p.stranded - tank.spare_capacity()).abs() < 1e-25);
            assert!((p.new_level - tank.current_level).abs() < 1e-25);
        }
        assert!(placement.objective_value.is_none());
    }

    #[test]
    fn empty_demands_usage_gated() {
        let allocator = TankAllocatorBuilder::default()
            .stranded_definition(StrandedDefinition::UsageGated)
            .build()
            .unwrap();
        let placement = allocator.solve(&base_case(), &[]).unwrap().placement.unwrap();
        assert!(placement.total_stranded().abs() < 1e-25);
    }

    #[test]
    fn usage_gated_strands_nothing_in_untouched_tanks() {
        init_logging();
        let tanks = base_case();
        let demands = [56., 2., 18., 40.];
        let allocator = TankAllocatorBuilder::default()
            .stranded_definition(StrandedDefinition::UsageGated)
            .build()
            .unwrap();
        let result = allocator.solve(&tanks, &demands).unwrap();
        assert!(result.is_ok());
        let placement = result.placement.unwrap();
        assert_valid_placement(&tanks, &demands, &placement);
        for p in placement.tanks.values() {
            if p.is_used() {
                let spare = p.max_level - p.current_level;
                assert!((p.stranded - (spare - p.placed)).abs() < 1e-6);
            } else {
                assert!(p.stranded.abs() < 1e-6);
            }
        }
    }

    #[test]
    fn sequential_matches_weighted() {
        init_logging();
        let tanks = base_case();
        let demands = [56., 2., 18., 40.];
        let allocator = TankAllocatorBuilder::default()
            .strategy(ObjectiveStrategy::Sequential)
            .build()
            .unwrap();
        assert_eq!(allocator.strategy(), ObjectiveStrategy::Sequential);
        let result = allocator.solve(&tanks, &demands).unwrap();
        assert!(result.is_ok());
        let placement = result.placement.unwrap();
        assert_valid_placement(&tanks, &demands, &placement);
        assert!((placement.total_stranded() - 164.).abs() < 1e-5);
        assert!((placement.get("tank_2").unwrap().stranded - 13.).abs() < 1e-5);
        assert!((placement.get("tank_0").unwrap().stranded - 1.).abs() < 1e-5);
        assert_eq!(placement.tanks_used(), 3);
    }

    #[test]
    fn oversized_demand_is_infeasible() {
        let tanks = base_case();
        let result = allocate(&tanks, &[96., 1.]).unwrap();
        assert!(!result.is_ok());
        assert_eq!(result.status, OptimizationStatus::Infeasible);
        assert!(result.placement.is_none());

        let sequential = TankAllocatorBuilder::default()
            .strategy(ObjectiveStrategy::Sequential)
            .build()
            .unwrap();
        let result = sequential.solve(&tanks, &[96.]).unwrap();
        assert_eq!(result.status, OptimizationStatus::Infeasible);
    }

    #[test]
    fn no_tanks() {
        let result = allocate(&[], &[1.]).unwrap();
        assert_eq!(result.status, OptimizationStatus::Infeasible);
        assert!(allocate(&[], &[]).unwrap().is_ok());
    }

    #[test]
    fn validation_errors() {
        let mut tanks = base_case();
        assert_eq!(
            allocate(&tanks, &[1., -2.]),
            Err(AllocationError::InvalidDemand {
                index: 1,
                volume: -2.
            })
        );
        assert!(matches!(
            allocate(&tanks, &[f64::NAN]),
            Err(AllocationError::InvalidDemand { index: 0, .. })
        ));

        tanks.push(Tank::new("tank_0", 0., 10.));
        assert_eq!(
            allocate(&tanks, &[1.]),
            Err(AllocationError::DuplicateTank("tank_0".to_string()))
        );

        let overfilled = vec![Tank::new("over", 100., 95.)];
        assert!(matches!(
            allocate(&overfilled, &[]),
            Err(AllocationError::NegativeSpareCapacity { .. })
        ));

        let full = vec![Tank::new("full", 95., 95.)];
        assert_eq!(
            allocate(&full, &[0.]),
            Err(AllocationError::DegenerateWeightBase(0.))
        );
    }

    #[test]
    fn builder_rejects_bad_penalty() {
        assert!(TankAllocatorBuilder::default()
            .usage_penalty(-1.)
            .build()
            .is_err());
        assert!(TankAllocatorBuilder::default()
            .usage_penalty(f64::INFINITY)
            .build()
            .is_err());
        let allocator = TankAllocatorBuilder::default().build().unwrap();
        assert!((allocator.usage_penalty() - 1.).abs() < 1e-25);
        assert_eq!(allocator.stranded_definition(), StrandedDefinition::Balance);
        assert_eq!(allocator, TankAllocator::default());
    }

    #[test]
    fn many_small_demands() {
        let tanks = vec![
            Tank::new("a", 0., 10.),
            Tank::new("b", 0., 7.),
            Tank::new("c", 0., 20.),
        ];
        let demands = [3., 4., 5., 2., 1.];
        let result = allocate(&tanks, &demands).unwrap();
        let placement = result.placement.unwrap();
        assert_valid_placement(&tanks, &demands, &placement);
        // b (7) is filled exactly, then a (10) takes the remaining 8
        assert!(placement.get("b").unwrap().stranded.abs() < 1e-6);
        assert!((placement.get("a").unwrap().stranded - 2.).abs() < 1e-6);
        assert!((placement.total_stranded() - 22.).abs() < 1e-6);
    }
}
