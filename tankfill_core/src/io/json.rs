//! Module providing JSON IO for scenarios and placements
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::allocation::{AllocationResult, Placement, Scenario};
use crate::io::IoError;

/// A scenario file holds either a single scenario or a list of them
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum JsonScenarios {
    Single(Scenario),
    Many(Vec<Scenario>),
}

impl From<JsonScenarios> for Vec<Scenario> {
    fn from(s: JsonScenarios) -> Self {
        match s {
            JsonScenarios::Single(scenario) => vec![scenario],
            JsonScenarios::Many(scenarios) => scenarios,
        }
    }
}

fn read_file<P: AsRef<Path>>(path: P) -> Result<String, IoError> {
    fs::read_to_string(path).map_err(|err| IoError::UnableToRead(format!("{:?}", err)))
}

impl Scenario {
    /// Read a single scenario from a json file
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Scenario, IoError> {
        let scenario_str = read_file(path)?;
        Scenario::from_json_str(&scenario_str)
    }

    pub fn from_json_str(data: &str) -> Result<Scenario, IoError> {
        serde_json::from_str::<Scenario>(data)
            .map_err(|err| IoError::UnableToParse(format!("{:?}", err)))
    }

    /// Read every scenario from a json file holding either one scenario or a list
    pub fn read_json_all<P: AsRef<Path>>(path: P) -> Result<Vec<Scenario>, IoError> {
        let scenario_str = read_file(path)?;
        match serde_json::from_str::<JsonScenarios>(&scenario_str) {
            Ok(scenarios) => Ok(scenarios.into()),
            Err(err) => Err(IoError::UnableToParse(format!("{:?}", err))),
        }
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), IoError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

impl Placement {
    pub fn to_json(&self) -> Result<String, IoError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), IoError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

impl AllocationResult {
    pub fn to_json(&self) -> Result<String, IoError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
