//! Running a sequence of allocation scenarios
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::allocation::allocator::TankAllocator;
use crate::allocation::tank::Tank;
use crate::allocation::AllocationError;

/// One set of tanks together with the demands to place into them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Optional label used when logging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub tanks: Vec<Tank>,
    pub demands: Vec<f64>,
}

impl Scenario {
    pub fn new(tanks: Vec<Tank>, demands: Vec<f64>) -> Self {
        Scenario {
            name: None,
            tanks,
            demands,
        }
    }
}

/// Summary of a run over several scenarios
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveDiagnostics {
    /// Whether every scenario was solved to optimality
    pub ok: bool,
    /// Total stranded capacity of the last scenario that was solved, None if none was
    pub objective_value: Option<f64>,
    /// Number of scenarios run
    pub iterations: usize,
}

/// Solve each scenario in turn, logging the outcome of each
///
/// Validation errors stop the run and are returned, scenarios the solver can't solve are
/// recorded in [`SolveDiagnostics::ok`] and the run continues.
pub fn run_scenarios<'a, I>(
    allocator: &TankAllocator,
    scenarios: I,
) -> Result<SolveDiagnostics, AllocationError>
where
    I: IntoIterator<Item = &'a Scenario>,
{
    let mut diagnostics = SolveDiagnostics {
        ok: true,
        objective_value: None,
        iterations: 0,
    };
    for (iteration, scenario) in scenarios.into_iter().enumerate() {
        let label = scenario
            .name
            .clone()
            .unwrap_or_else(|| format!("Scenario {}", iteration + 1));
        let result = allocator.solve(&scenario.tanks, &scenario.demands)?;
        diagnostics.iterations = iteration + 1;
        let solved = result.is_ok();
        match result.placement {
            Some(placement) if solved => {
                info!(
                    "{}: placed {} into {} tanks, {} stranded",
                    label,
                    placement.total_placed(),
                    placement.tanks_used(),
                    placement.total_stranded()
                );
                for (id, tank) in &placement.tanks {
                    info!(
                        "{}:   {} {:?} -> level {} (stranded {})",
                        label, id, tank.demands, tank.new_level, tank.stranded
                    );
                }
                diagnostics.objective_value = Some(placement.total_stranded());
            }
            _ => {
                warn!(
                    "{}: solver failed to find an optimal solution ({})",
                    label, result.status
                );
                diagnostics.ok = false;
            }
        }
    }
    Ok(diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_case() -> Vec<Tank> {
        vec![
            Tank::new("tank_0", 20., 95.),
            Tank::new("tank_1", 0., 95.),
            Tank::new("tank_2", 80., 95.),
            Tank::new("tank_3", 0., 95.),
        ]
    }

    #[test]
    fn reordered_demands() {
        let _ = env_logger::builder().is_test(true).try_init();
        let scenarios = vec![
            Scenario::new(base_case(), vec![56., 2., 18., 40.]),
            Scenario::new(base_case(), vec![56., 18., 2., 40.]),
        ];
        let diagnostics = run_scenarios(&TankAllocator::default(), &scenarios).unwrap();
        assert!(diagnostics.ok);
        assert_eq!(diagnostics.iterations, 2);
        assert!((diagnostics.objective_value.unwrap() - 164.).abs() < 1e-6);
    }

    #[test]
    fn failed_scenario_is_recorded() {
        let scenarios = vec![
            Scenario::new(base_case(), vec![10.]),
            Scenario::new(base_case(), vec![500.]),
        ];
        let diagnostics = run_scenarios(&TankAllocator::default(), &scenarios).unwrap();
        assert!(!diagnostics.ok);
        assert_eq!(diagnostics.iterations, 2);
        // Still the total of the first scenario
        assert!((diagnostics.objective_value.unwrap() - 270.).abs() < 1e-6);
    }

    #[test]
    fn invalid_scenario_stops_the_run() {
        let scenarios = vec![Scenario::new(base_case(), vec![-1.])];
        assert!(run_scenarios(&TankAllocator::default(), &scenarios).is_err());
        let empty: Vec<Scenario> = Vec::new();
        let diagnostics = run_scenarios(&TankAllocator::default(), &empty).unwrap();
        assert!(diagnostics.ok);
        assert_eq!(diagnostics.iterations, 0);
        assert!(diagnostics.objective_value.is_none());
    }
}
