//! This module provides the Tank struct, a capacity limited resource demands are placed into
use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use derive_builder::Builder;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::allocation::AllocationError;

/// Represents a tank
///
/// Tanks are read only inputs, the allocation never changes their levels.
#[derive(Builder, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tank {
    /// Used to identify the tank (must be unique)
    #[builder(setter(into))]
    pub id: String,
    /// Volume currently in the tank
    #[builder(default = "0.")]
    #[serde(default)]
    pub current_level: f64,
    /// Highest level the tank may be filled to
    pub max_level: f64,
}

impl Tank {
    pub fn new(id: impl Into<String>, current_level: f64, max_level: f64) -> Tank {
        Tank {
            id: id.into(),
            current_level,
            max_level,
        }
    }

    /// Volume that can still be added to the tank
    pub fn spare_capacity(&self) -> f64 {
        self.max_level - self.current_level
    }

    /// Check the tank's levels, returning its spare capacity
    pub fn validate(&self) -> Result<f64, AllocationError> {
        if !self.current_level.is_finite() || !self.max_level.is_finite() {
            return Err(AllocationError::NonFiniteLevel(self.id.clone()));
        }
        let spare = self.spare_capacity();
        if spare < 0. {
            return Err(AllocationError::NegativeSpareCapacity {
                id: self.id.clone(),
                current_level: self.current_level,
                max_level: self.max_level,
            });
        }
        Ok(spare)
    }
}

impl Display for Tank {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}/{})", self.id, self.current_level, self.max_level)
    }
}

/// Validate a set of tanks, returning their spare capacities keyed by tank id in input order
pub fn spare_capacities(tanks: &[Tank]) -> Result<IndexMap<String, f64>, AllocationError> {
    let mut seen = HashSet::new();
    let mut spare = IndexMap::with_capacity(tanks.len());
    for tank in tanks {
        if !seen.insert(tank.id.as_str()) {
            return Err(AllocationError::DuplicateTank(tank.id.clone()));
        }
        spare.insert(tank.id.clone(), tank.validate()?);
    }
    Ok(spare)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spare_capacity() {
        let tank = TankBuilder::default()
            .id("tank_0")
            .current_level(20.)
            .max_level(95.)
            .build()
            .unwrap();
        assert!((tank.spare_capacity() - 75.).abs() < 1e-25);
        assert_eq!(format!("{}", tank), "tank_0 (20/95)");

        let empty = TankBuilder::default().id("empty").max_level(10.).build().unwrap();
        assert!((empty.validate().unwrap() - 10.).abs() < 1e-25);
    }

    #[test]
    fn overfilled_tank() {
        let tank = Tank::new("over", 96., 95.);
        assert_eq!(
            tank.validate(),
            Err(AllocationError::NegativeSpareCapacity {
                id: "over".to_string(),
                current_level: 96.,
                max_level: 95.,
            })
        );
        let nan = Tank::new("nan", f64::NAN, 95.);
        assert_eq!(
            nan.validate(),
            Err(AllocationError::NonFiniteLevel("nan".to_string()))
        );
    }

    #[test]
    fn spare_capacities_in_input_order() {
        let tanks = vec![
            Tank::new("b", 80., 95.),
            Tank::new("a", 0., 95.),
            Tank::new("c", 95., 95.),
        ];
        let spare = spare_capacities(&tanks).unwrap();
        assert_eq!(spare.keys().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        assert!((spare["b"] - 15.).abs() < 1e-25);
        assert!(spare["c"].abs() < 1e-25);

        let duplicated = vec![Tank::new("a", 0., 1.), Tank::new("a", 0., 2.)];
        assert_eq!(
            spare_capacities(&duplicated),
            Err(AllocationError::DuplicateTank("a".to_string()))
        );
    }

    #[test]
    fn deserialize_without_current_level() {
        let tank: Tank = serde_json::from_str(r#"{"id": "t", "max_level": 5.0}"#).unwrap();
        assert_eq!(tank, Tank::new("t", 0., 5.));
    }
}
