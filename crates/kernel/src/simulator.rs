use crate::backend::{AcquireError, BackendFactory};
use crate::config::SimulatorConfig;
use crate::template::ObjectTemplateLibrary;
use crate::world::PhysicsWorld;

/// Factory for [`PhysicsWorld`] instances.
///
/// Acquisition fails with [`AcquireError::MissingAsset`] when the configured
/// scene or any template directory is absent, so callers can tell "cannot
/// run here" apart from a broken run.
#[derive(Debug, Clone)]
pub struct ReferenceSimulator {
    builtins: bool,
}

impl ReferenceSimulator {
    /// Factory whose worlds start with the built-in primitive templates.
    pub fn new() -> Self {
        Self { builtins: true }
    }

    /// Factory whose worlds only know templates loaded from the configuration.
    pub fn without_builtins() -> Self {
        Self { builtins: false }
    }
}

impl Default for ReferenceSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendFactory for ReferenceSimulator {
    type Backend = PhysicsWorld;

    fn acquire(&self, config: &SimulatorConfig) -> Result<PhysicsWorld, AcquireError> {
        config.validate()?;
        if let Some(missing) = config.required_assets().find(|p| !p.exists()) {
            return Err(AcquireError::MissingAsset(missing.to_path_buf()));
        }

        let mut templates = if self.builtins {
            ObjectTemplateLibrary::with_builtins()
        } else {
            ObjectTemplateLibrary::new()
        };
        for dir in &config.object_template_dirs {
            let loaded = templates.load_dir(dir)?;
            tracing::debug!(dir = %dir.display(), loaded, "object templates loaded");
        }
        if let Some(scene) = &config.scene {
            tracing::debug!(
                scene = %scene.display(),
                ground = config.physics.ground_height,
                "stage modelled as ground plane"
            );
        }

        tracing::debug!(templates = templates.len(), "acquired physics world");
        Ok(PhysicsWorld::new(config, templates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SimulationBackend;
    use crate::config::ConfigError;

    #[test]
    fn acquires_with_default_config() {
        let mut world = ReferenceSimulator::new()
            .acquire(&SimulatorConfig::default())
            .unwrap();
        assert!(world.add_object("sphere").is_ok());
    }

    #[test]
    fn missing_scene_is_reported() {
        let cfg = SimulatorConfig {
            scene: Some("data/scene_datasets/missing.glb".into()),
            ..SimulatorConfig::default()
        };
        let err = ReferenceSimulator::new().acquire(&cfg).unwrap_err();
        assert!(matches!(err, AcquireError::MissingAsset(p) if p.ends_with("missing.glb")));
    }

    #[test]
    fn invalid_config_is_reported() {
        let mut cfg = SimulatorConfig::default();
        cfg.physics.fixed_timestep = -1.0;
        assert!(matches!(
            ReferenceSimulator::new().acquire(&cfg),
            Err(AcquireError::Config(ConfigError::InvalidTimestep(_)))
        ));
    }

    #[test]
    fn loads_templates_from_configured_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("lamp.phys_properties.json"),
            r#"{ "mass": 2.0, "scale": [0.3, 1.2, 0.3] }"#,
        )
        .unwrap();
        let scene = dir.path().join("stage.glb");
        std::fs::write(&scene, b"glTF").unwrap();

        let cfg = SimulatorConfig {
            scene: Some(scene),
            object_template_dirs: vec![dir.path().to_path_buf()],
            ..SimulatorConfig::default()
        };
        let mut world = ReferenceSimulator::without_builtins().acquire(&cfg).unwrap();
        assert!(world.add_object("lamp").is_ok());
        assert!(world.add_object("sphere").is_err());
    }
}
