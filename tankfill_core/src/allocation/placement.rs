//! Results of an allocation
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::allocation::model::StrandedDefinition;
use crate::allocation::tank::Tank;
use crate::optimize::OptimizationStatus;

/// What was placed into a single tank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TankPlacement {
    /// Level of the tank before placement
    pub current_level: f64,
    /// Highest level of the tank
    pub max_level: f64,
    /// Volumes of the demands placed into the tank, in input order
    pub demands: Vec<f64>,
    /// Total volume placed into the tank
    pub placed: f64,
    /// Level of the tank after placement
    pub new_level: f64,
    /// Capacity of the tank left stranded
    pub stranded: f64,
}

impl TankPlacement {
    pub fn new(tank: &Tank, demands: Vec<f64>, stranded: f64) -> Self {
        let placed = demands.iter().sum::<f64>();
        TankPlacement {
            current_level: tank.current_level,
            max_level: tank.max_level,
            demands,
            placed,
            new_level: tank.current_level + placed,
            stranded,
        }
    }

    /// Whether any demand was placed into the tank
    pub fn is_used(&self) -> bool {
        !self.demands.is_empty()
    }
}

/// Placement of every demand, keyed by tank id in input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub tanks: IndexMap<String, TankPlacement>,
    /// Objective value reported by the solver, None if no solve was needed
    pub objective_value: Option<f64>,
}

impl Placement {
    /// Placement for when there is nothing to place
    ///
    /// The stranded capacity follows `definition`: an untouched tank strands its full spare
    /// capacity under [`StrandedDefinition::Balance`] and nothing under
    /// [`StrandedDefinition::UsageGated`].
    pub fn untouched(tanks: &[Tank], definition: StrandedDefinition) -> Self {
        let placements = tanks
            .iter()
            .map(|tank| {
                let stranded = match definition {
                    StrandedDefinition::Balance => tank.spare_capacity(),
                    StrandedDefinition::UsageGated => 0.,
                };
                (tank.id.clone(), TankPlacement::new(tank, Vec::new(), stranded))
            })
            .collect();
        Placement {
            tanks: placements,
            objective_value: None,
        }
    }

    /// Placement of a single tank
    pub fn get(&self, id: &str) -> Option<&TankPlacement> {
        self.tanks.get(id)
    }

    /// Total volume placed over all tanks
    pub fn total_placed(&self) -> f64 {
        self.tanks.values().map(|t| t.placed).sum()
    }

    /// Total stranded capacity over all tanks
    pub fn total_stranded(&self) -> f64 {
        self.tanks.values().map(|t| t.stranded).sum()
    }

    /// Number of tanks which received at least one demand
    pub fn tanks_used(&self) -> usize {
        self.tanks.values().filter(|t| t.is_used()).count()
    }
}

/// Outcome of an allocation
///
/// `placement` is Some exactly when `status` is [`OptimizationStatus::Optimal`]. Infeasible or
/// otherwise unsolved allocations are reported here rather than as errors, so callers can
/// decide to retry with different input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub status: OptimizationStatus,
    pub placement: Option<Placement>,
}

impl AllocationResult {
    pub fn placed(placement: Placement) -> Self {
        AllocationResult {
            status: OptimizationStatus::Optimal,
            placement: Some(placement),
        }
    }

    pub fn failed(status: OptimizationStatus) -> Self {
        AllocationResult {
            status,
            placement: None,
        }
    }

    /// Whether an optimal placement was found
    pub fn is_ok(&self) -> bool {
        self.status == OptimizationStatus::Optimal && self.placement.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untouched_placements() {
        let tanks = vec![Tank::new("a", 20., 95.), Tank::new("b", 80., 95.)];

        let balance = Placement::untouched(&tanks, StrandedDefinition::Balance);
        assert!((balance.total_stranded() - 90.).abs() < 1e-12);
        assert!(balance.total_placed().abs() < 1e-25);
        assert_eq!(balance.tanks_used(), 0);
        let a = balance.get("a").unwrap();
        assert!((a.new_level - 20.).abs() < 1e-25);
        assert!(a.demands.is_empty());

        let gated = Placement::untouched(&tanks, StrandedDefinition::UsageGated);
        assert!(gated.total_stranded().abs() < 1e-25);
    }

    #[test]
    fn tank_placement_totals() {
        let placement = TankPlacement::new(&Tank::new("a", 20., 95.), vec![56., 18.], 1.);
        assert!((placement.placed - 74.).abs() < 1e-12);
        assert!((placement.new_level - 94.).abs() < 1e-12);
        assert!(placement.is_used());
    }

    #[test]
    fn result_flags() {
        let failed = AllocationResult::failed(OptimizationStatus::Infeasible);
        assert!(!failed.is_ok());
        let ok = AllocationResult::placed(Placement::untouched(&[], StrandedDefinition::Balance));
        assert!(ok.is_ok());
    }
}
