use serde::{Deserialize, Serialize};
use simspace_kernel::{ConfigError, SimulatorConfig};
use std::path::Path;

use crate::checker::{CheckConfig, CheckError};
use crate::scenario::Scenario;

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Simulator(#[from] ConfigError),
    #[error(transparent)]
    Check(#[from] CheckError),
}

/// Everything a consistency check needs, as read from one YAML file.
///
/// Missing sections fall back to defaults; the default scenario is
/// [`Scenario::three_objects`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckPlan {
    pub simulator: SimulatorConfig,
    pub scenario: Scenario,
    pub check: CheckConfig,
}

impl Default for CheckPlan {
    fn default() -> Self {
        Self {
            simulator: SimulatorConfig::default(),
            scenario: Scenario::three_objects(),
            check: CheckConfig::default(),
        }
    }
}

impl CheckPlan {
    pub fn from_yaml_str(text: &str) -> Result<Self, PlanError> {
        let plan: Self = serde_yaml::from_str(text)?;
        plan.simulator.validate()?;
        plan.check.validate()?;
        Ok(plan)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PlanError> {
        Self::from_yaml_str(&std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simspace_kernel::Integration;

    #[test]
    fn empty_document_uses_reference_check() {
        let plan = CheckPlan::from_yaml_str("{}").unwrap();
        assert_eq!(plan, CheckPlan::default());
        assert_eq!(plan.scenario.len(), 3);
    }

    #[test]
    fn sections_override_independently() {
        let plan = CheckPlan::from_yaml_str(
            r#"
simulator:
  physics:
    integration: direct
scenario:
  objects: []
check:
  duration: 1.5
"#,
        )
        .unwrap();
        assert_eq!(plan.simulator.physics.integration, Integration::Direct);
        assert!(plan.scenario.is_empty());
        assert_eq!(plan.check.duration, 1.5);
        assert_eq!(plan.check.ratio, 5);
    }

    #[test]
    fn invalid_sections_are_rejected() {
        assert!(matches!(
            CheckPlan::from_yaml_str("check:\n  ratio: 0\n"),
            Err(PlanError::Check(_))
        ));
        assert!(matches!(
            CheckPlan::from_yaml_str("simulator:\n  physics:\n    fixed_timestep: 0\n"),
            Err(PlanError::Simulator(_))
        ));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("check.yaml");
        std::fs::write(&path, "check:\n  tolerance: 0.05\n").unwrap();
        assert_eq!(CheckPlan::load(&path).unwrap().check.tolerance, 0.05);
    }
}
