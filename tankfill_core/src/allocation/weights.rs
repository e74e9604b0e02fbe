//! Lexicographic priority weights
//!
//! Tanks are ranked by ascending spare capacity, ties keep their input order. With `n` tanks
//! and base `B = total spare + 1`, the tank at rank `r` gets the weight `B^(n-1-r)`, so that
//! one unit of stranded capacity in a tighter tank outweighs any stranded capacity in all
//! looser tanks combined. The powers are computed in log space and shifted down by a common
//! offset whenever the largest one would overflow `f64`.
use indexmap::IndexMap;
use log::warn;

use crate::allocation::AllocationError;
use crate::configuration;

/// Smallest base used for the weights
///
/// With `B >= 2` every weight is larger than the sum of all lower priority weights.
const MIN_BASE: f64 = 2.0;

/// Ids of the tanks ordered from highest priority (least spare capacity) to lowest
///
/// Tanks with equal spare capacity keep their input order.
pub fn priority_order(spare_capacity: &IndexMap<String, f64>) -> Vec<&str> {
    let values = spare_capacity.values().copied().collect::<Vec<_>>();
    priority_positions(&values)
        .into_iter()
        .filter_map(|i| spare_capacity.get_index(i).map(|(id, _)| id.as_str()))
        .collect()
}

/// Input positions ordered from highest priority to lowest
pub(crate) fn priority_positions(spare_capacity: &[f64]) -> Vec<usize> {
    let mut positions = (0..spare_capacity.len()).collect::<Vec<_>>();
    // sort_by is stable
    positions.sort_by(|&a, &b| spare_capacity[a].total_cmp(&spare_capacity[b]));
    positions
}

/// Compute the lexicographic weight of every tank
///
/// # Parameters
/// - `spare_capacity`: Spare capacity of each tank, keyed by tank id
///
/// # Returns
/// The weight of each tank, keyed by tank id and iterated in priority order (highest weight
/// first). Every weight is finite and strictly positive.
///
/// # Errors
/// - [`AllocationError::InvalidSpareCapacity`] if a spare capacity is negative or not finite
/// - [`AllocationError::DegenerateWeightBase`] if the spare capacities don't sum to a positive
///   value (which includes an empty map)
///
/// # Examples
/// ```rust
/// use indexmap::IndexMap;
/// use tankfill_core::allocation::lexicographic_weights;
/// let mut spare = IndexMap::new();
/// spare.insert("loose".to_string(), 95.);
/// spare.insert("tight".to_string(), 15.);
/// let weights = lexicographic_weights(&spare).unwrap();
/// assert_eq!(weights.get_index(0).unwrap().0, "tight");
/// assert!(weights["tight"] > weights["loose"]);
/// ```
pub fn lexicographic_weights(
    spare_capacity: &IndexMap<String, f64>,
) -> Result<IndexMap<String, f64>, AllocationError> {
    let ids = spare_capacity.keys().map(|k| k.as_str()).collect::<Vec<_>>();
    let values = spare_capacity.values().copied().collect::<Vec<_>>();
    let margin = configuration::current().weight_margin;
    let weights = weights_by_position(&ids, &values, margin)?;
    Ok(priority_positions(&values)
        .into_iter()
        .map(|i| (ids[i].to_string(), weights[i]))
        .collect())
}

/// Compute the weights, returned in input order
///
/// `margin` is the distance (in log space) kept between the largest weight and `f64::MAX`.
pub(crate) fn weights_by_position(
    ids: &[&str],
    spare_capacity: &[f64],
    margin: f64,
) -> Result<Vec<f64>, AllocationError> {
    if let Some((id, spare)) = ids
        .iter()
        .zip(spare_capacity)
        .find(|(_, s)| !(s.is_finite() && **s >= 0.))
    {
        return Err(AllocationError::InvalidSpareCapacity {
            id: id.to_string(),
            spare: *spare,
        });
    }
    let total: f64 = spare_capacity.iter().sum();
    if !(total > 0.) || !total.is_finite() {
        return Err(AllocationError::DegenerateWeightBase(total));
    }

    let base = (total + 1.).max(MIN_BASE);
    let log_base = base.ln();
    let max_exponent = (spare_capacity.len() - 1) as f64;
    let offset = (max_exponent * log_base - f64::MAX.ln() + margin.max(0.)).max(0.);
    let log_min = f64::MIN_POSITIVE.ln();

    let mut weights = vec![0.; spare_capacity.len()];
    let mut clamped = 0usize;
    for (rank, position) in priority_positions(spare_capacity).into_iter().enumerate() {
        let exponent = max_exponent - rank as f64;
        let log_weight = exponent * log_base - offset;
        let weight = if log_weight <= log_min {
            clamped += 1;
            f64::MIN_POSITIVE
        } else {
            log_weight.exp()
        };
        if !weight.is_finite() {
            return Err(AllocationError::NonFiniteWeight(ids[position].to_string()));
        }
        weights[position] = weight;
    }
    if let Some(message) = clamp_warning(clamped) {
        warn!("{}", message);
    }
    Ok(weights)
}

/// Warning logged when `clamped` weights were raised to `f64::MIN_POSITIVE`
fn clamp_warning(clamped: usize) -> Option<String> {
    match clamped {
        0 => None,
        1 => Some(format!(
            "Lowest priority weight was clamped to {:e}",
            f64::MIN_POSITIVE
        )),
        n => Some(format!(
            "{} lowest priority weights were clamped to {:e} and are no longer ordered",
            n,
            f64::MIN_POSITIVE
        )),
    }
}
