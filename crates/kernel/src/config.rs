//! Simulator configuration.
//!
//! One immutable [`SimulatorConfig`] describes everything needed to acquire a
//! simulation instance. It is loaded from YAML with every field optional and
//! validated before use.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default fixed integration step, in seconds.
pub const DEFAULT_FIXED_TIMESTEP: f64 = 1.0 / 240.0;

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("fixed timestep must be positive and finite, got {0}")]
    InvalidTimestep(f64),
    #[error("default agent {index} out of range ({agents} agents configured)")]
    DefaultAgentOutOfRange { index: usize, agents: usize },
    #[error("agent {agent}: sensor {uuid:?} has resolution {found:?}, expected {expected:?}")]
    SensorResolutionMismatch {
        agent: usize,
        uuid: String,
        found: [u32; 2],
        expected: [u32; 2],
    },
    #[error("agent {agent}: duplicate sensor uuid {uuid:?}")]
    DuplicateSensor { agent: usize, uuid: String },
    #[error("action {key:?} is registered under a spec named {name:?}")]
    ActionNameMismatch { key: String, name: String },
    #[error("action {action:?} has negative actuation amount {amount}")]
    NegativeActuation { action: String, amount: f32 },
}

/// How the reference world turns a requested `dt` into integration updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Integration {
    /// Advance in whole fixed timesteps, carrying any remainder forward.
    #[default]
    FixedSubstep,
    /// Integrate the requested `dt` in a single update.
    Direct,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub fixed_timestep: f64,
    pub gravity: [f32; 3],
    /// Height of the ground plane standing in for the stage geometry.
    pub ground_height: f32,
    pub integration: Integration,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: DEFAULT_FIXED_TIMESTEP,
            gravity: [0.0, -9.81, 0.0],
            ground_height: 0.0,
            integration: Integration::FixedSubstep,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorType {
    Color,
    Depth,
    Semantic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSpec {
    pub uuid: String,
    pub sensor_type: SensorType,
    /// `[height, width]` in pixels.
    pub resolution: [u32; 2],
    /// Offset from the agent's base.
    pub position: [f32; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActuationSpec {
    pub amount: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub name: String,
    pub actuation: ActuationSpec,
}

impl ActionSpec {
    pub fn new(name: impl Into<String>, amount: f32) -> Self {
        Self {
            name: name.into(),
            actuation: ActuationSpec { amount },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub height: f32,
    pub radius: f32,
    pub sensor_specifications: Vec<SensorSpec>,
    pub action_space: BTreeMap<String, ActionSpec>,
}

impl AgentConfig {
    /// Height of the first sensor above the agent base, or the agent height
    /// when it carries no sensors.
    pub fn sensor_height(&self) -> f32 {
        self.sensor_specifications
            .first()
            .map(|s| s.position[1])
            .unwrap_or(self.height)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        let actions = [
            ActionSpec::new("move_forward", 0.25),
            ActionSpec::new("move_backward", 0.25),
            ActionSpec::new("turn_left", 10.0),
            ActionSpec::new("turn_right", 10.0),
            ActionSpec::new("look_up", 10.0),
            ActionSpec::new("look_down", 10.0),
            ActionSpec::new("grab_release_object", 1.5),
        ];
        Self {
            height: 1.5,
            radius: 0.1,
            sensor_specifications: vec![SensorSpec {
                uuid: "rgb".into(),
                sensor_type: SensorType::Color,
                resolution: [256, 256],
                position: [0.0, 1.5, 0.0],
            }],
            action_space: actions
                .into_iter()
                .map(|spec| (spec.name.clone(), spec))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Stage asset. Must exist on disk when set.
    pub scene: Option<PathBuf>,
    /// Directories of `*.phys_properties.json` object templates. Each must exist.
    pub object_template_dirs: Vec<PathBuf>,
    pub enable_physics: bool,
    pub default_agent: usize,
    pub physics: PhysicsConfig,
    pub agents: Vec<AgentConfig>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            scene: None,
            object_template_dirs: Vec::new(),
            enable_physics: true,
            default_agent: 0,
            physics: PhysicsConfig::default(),
            agents: vec![AgentConfig::default()],
        }
    }
}

impl SimulatorConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Paths that must exist before an instance can be acquired.
    pub fn required_assets(&self) -> impl Iterator<Item = &Path> {
        self.scene
            .iter()
            .chain(self.object_template_dirs.iter())
            .map(PathBuf::as_path)
    }

    pub fn default_agent_config(&self) -> Option<&AgentConfig> {
        self.agents.get(self.default_agent)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let dt = self.physics.fixed_timestep;
        if !(dt.is_finite() && dt > 0.0) {
            return Err(ConfigError::InvalidTimestep(dt));
        }
        if !self.agents.is_empty() && self.default_agent >= self.agents.len() {
            return Err(ConfigError::DefaultAgentOutOfRange {
                index: self.default_agent,
                agents: self.agents.len(),
            });
        }
        for (index, agent) in self.agents.iter().enumerate() {
            validate_agent(index, agent)?;
        }
        Ok(())
    }
}

fn validate_agent(index: usize, agent: &AgentConfig) -> Result<(), ConfigError> {
    // All sensors of one agent render at the same resolution.
    if let Some(first) = agent.sensor_specifications.first() {
        let mut seen = std::collections::BTreeSet::new();
        for sensor in &agent.sensor_specifications {
            if sensor.resolution != first.resolution {
                return Err(ConfigError::SensorResolutionMismatch {
                    agent: index,
                    uuid: sensor.uuid.clone(),
                    found: sensor.resolution,
                    expected: first.resolution,
                });
            }
            if !seen.insert(sensor.uuid.as_str()) {
                return Err(ConfigError::DuplicateSensor {
                    agent: index,
                    uuid: sensor.uuid.clone(),
                });
            }
        }
    }
    for (key, spec) in &agent.action_space {
        if *key != spec.name {
            return Err(ConfigError::ActionNameMismatch {
                key: key.clone(),
                name: spec.name.clone(),
            });
        }
        if spec.actuation.amount < 0.0 {
            return Err(ConfigError::NegativeActuation {
                action: key.clone(),
                amount: spec.actuation.amount,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = SimulatorConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.physics.fixed_timestep, DEFAULT_FIXED_TIMESTEP);
        assert_eq!(cfg.default_agent_config().unwrap().action_space.len(), 7);
    }

    #[test]
    fn seed_key_is_accepted_and_ignored() {
        let cfg = SimulatorConfig::from_yaml_str("seed: 42\nenable_physics: false\n").unwrap();
        assert_eq!(
            cfg,
            SimulatorConfig {
                enable_physics: false,
                ..SimulatorConfig::default()
            }
        );
    }

    #[test]
    fn empty_yaml_yields_defaults() {
        let cfg = SimulatorConfig::from_yaml_str("{}").unwrap();
        assert_eq!(cfg, SimulatorConfig::default());
    }

    #[test]
    fn partial_yaml_overrides_fields() {
        let cfg = SimulatorConfig::from_yaml_str(
            "enable_physics: false\nphysics:\n  integration: direct\n  fixed_timestep: 0.01\n",
        )
        .unwrap();
        assert!(!cfg.enable_physics);
        assert_eq!(cfg.physics.integration, Integration::Direct);
        assert_eq!(cfg.physics.fixed_timestep, 0.01);
        assert_eq!(cfg.physics.gravity, [0.0, -9.81, 0.0]);
    }

    #[test]
    fn rejects_non_positive_timestep() {
        let mut cfg = SimulatorConfig::default();
        cfg.physics.fixed_timestep = 0.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidTimestep(_))));
        cfg.physics.fixed_timestep = f64::NAN;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidTimestep(_))));
    }

    #[test]
    fn rejects_mismatched_sensor_resolutions() {
        let mut cfg = SimulatorConfig::default();
        cfg.agents[0].sensor_specifications.push(SensorSpec {
            uuid: "depth".into(),
            sensor_type: SensorType::Depth,
            resolution: [128, 128],
            position: [0.0, 1.5, 0.0],
        });
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::SensorResolutionMismatch { agent: 0, .. })
        ));
    }

    #[test]
    fn rejects_duplicate_sensor_uuid() {
        let mut cfg = SimulatorConfig::default();
        let dup = cfg.agents[0].sensor_specifications[0].clone();
        cfg.agents[0].sensor_specifications.push(dup);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::DuplicateSensor { .. })
        ));
    }

    #[test]
    fn rejects_default_agent_out_of_range() {
        let cfg = SimulatorConfig {
            default_agent: 3,
            ..SimulatorConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::DefaultAgentOutOfRange { index: 3, agents: 1 })
        ));
    }

    #[test]
    fn rejects_misnamed_and_negative_actions() {
        let mut cfg = SimulatorConfig::default();
        cfg.agents[0]
            .action_space
            .insert("jump".into(), ActionSpec::new("hop", 1.0));
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ActionNameMismatch { .. })
        ));

        let mut cfg = SimulatorConfig::default();
        cfg.agents[0]
            .action_space
            .insert("turn_left".into(), ActionSpec::new("turn_left", -5.0));
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NegativeActuation { .. })
        ));
    }

    #[test]
    fn required_assets_lists_scene_then_template_dirs() {
        let cfg = SimulatorConfig {
            scene: Some("stage.glb".into()),
            object_template_dirs: vec!["objects".into()],
            ..SimulatorConfig::default()
        };
        let assets: Vec<_> = cfg.required_assets().collect();
        assert_eq!(assets, vec![Path::new("stage.glb"), Path::new("objects")]);
    }
}
