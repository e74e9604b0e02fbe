use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use tankfill_core::allocation::{Tank, TankAllocatorBuilder, TankPlacement};

/// What was placed into a single tank
#[pyclass(name = "TankPlacement")]
#[derive(Clone)]
struct PyTankPlacement {
    #[pyo3(get)]
    tank_id: String,
    #[pyo3(get)]
    current_level: f64,
    #[pyo3(get)]
    max_level: f64,
    #[pyo3(get)]
    demands: Vec<f64>,
    #[pyo3(get)]
    placed: f64,
    #[pyo3(get)]
    new_level: f64,
    #[pyo3(get)]
    stranded: f64,
}

impl PyTankPlacement {
    fn new(tank_id: &str, placement: &TankPlacement) -> Self {
        PyTankPlacement {
            tank_id: tank_id.to_string(),
            current_level: placement.current_level,
            max_level: placement.max_level,
            demands: placement.demands.clone(),
            placed: placement.placed,
            new_level: placement.new_level,
            stranded: placement.stranded,
        }
    }
}

#[pymethods]
impl PyTankPlacement {
    fn __repr__(&self) -> String {
        format!(
            "TankPlacement(tank_id={:?}, demands={:?}, placed={}, new_level={}, stranded={})",
            self.tank_id, self.demands, self.placed, self.new_level, self.stranded
        )
    }
}

/// Place every demand into exactly one tank, minimizing stranded capacity
///
/// `tanks` is a list of `(id, current_level, max_level)` tuples. Returns `(True, placements)`
/// with one placement per tank in input order, or `(False, None)` if no placement was found.
/// Invalid input raises a `ValueError`.
#[pyfunction]
#[pyo3(signature = (tanks, demands, usage_penalty=1.0))]
fn tank_solve(
    tanks: Vec<(String, f64, f64)>,
    demands: Vec<f64>,
    usage_penalty: f64,
) -> PyResult<(bool, Option<Vec<PyTankPlacement>>)> {
    let tanks = tanks
        .into_iter()
        .map(|(id, current_level, max_level)| Tank::new(id, current_level, max_level))
        .collect::<Vec<_>>();
    let allocator = TankAllocatorBuilder::default()
        .usage_penalty(usage_penalty)
        .build()
        .map_err(|err| PyValueError::new_err(err.to_string()))?;
    let result = allocator
        .solve(&tanks, &demands)
        .map_err(|err| PyValueError::new_err(err.to_string()))?;
    let solved = result.is_ok();
    match result.placement {
        Some(placement) if solved => Ok((
            true,
            Some(
                placement
                    .tanks
                    .iter()
                    .map(|(id, tank)| PyTankPlacement::new(id, tank))
                    .collect(),
            ),
        )),
        _ => Ok((false, None)),
    }
}

/// Lexicographic weight of every tank, keyed by tank id
#[pyfunction]
fn lexicographic_weights(spare_capacity: Vec<(String, f64)>) -> PyResult<Vec<(String, f64)>> {
    let spare = spare_capacity.into_iter().collect();
    tankfill_core::allocation::lexicographic_weights(&spare)
        .map(|weights| weights.into_iter().collect())
        .map_err(|err| PyValueError::new_err(err.to_string()))
}

/// A Python module implemented in Rust. The name of this function must match
/// the `lib.name` setting in the `Cargo.toml`, else Python will not be able to
/// import the module.
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(tank_solve, m)?)?;
    m.add_function(wrap_pyfunction!(lexicographic_weights, m)?)?;
    m.add_class::<PyTankPlacement>()?;
    Ok(())
}
