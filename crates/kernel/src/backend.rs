use simspace_common::{MotionType, ObjectId, Vec3};
use std::path::PathBuf;

use crate::config::{ConfigError, SimulatorConfig};

/// Errors raised by a simulation backend while a run is in progress.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("no object template with handle {0:?}")]
    UnknownTemplate(String),
    #[error("object {0} does not exist")]
    UnknownObject(ObjectId),
    #[error("invalid timestep {0}")]
    InvalidTimestep(f64),
    #[error("step failed: {0}")]
    Step(String),
}

/// Errors raised while acquiring a simulation instance.
///
/// These mean the run could not start at all, as opposed to a run that
/// started and then broke.
#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    #[error("simulation backend unavailable: {0}")]
    Unavailable(String),
    #[error("required asset missing: {}", .0.display())]
    MissingAsset(PathBuf),
    #[error("asset {} could not be loaded: {reason}", .path.display())]
    InvalidAsset { path: PathBuf, reason: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// The operations a consistency check needs from a physics simulator.
///
/// A backend value is one simulation instance. It is owned by exactly one run
/// and released when dropped.
pub trait SimulationBackend {
    /// Remove all objects and rewind world time to zero.
    fn reset(&mut self) -> Result<(), BackendError>;

    /// Instantiate the object template registered under `handle`.
    fn add_object(&mut self, handle: &str) -> Result<ObjectId, BackendError>;

    fn set_translation(&mut self, id: ObjectId, translation: Vec3) -> Result<(), BackendError>;

    fn set_motion_type(&mut self, id: ObjectId, motion_type: MotionType) -> Result<(), BackendError>;

    /// Advance the world by `dt` seconds and return the new world time.
    fn step_world(&mut self, dt: f64) -> Result<f64, BackendError>;

    /// Seconds simulated since the last reset.
    fn world_time(&self) -> f64;

    /// Ids of all live objects in a stable order.
    fn existing_object_ids(&self) -> Vec<ObjectId>;

    fn translation(&self, id: ObjectId) -> Result<Vec3, BackendError>;
}

/// Creates simulation instances from a configuration.
pub trait BackendFactory {
    type Backend: SimulationBackend;

    /// Acquire a fresh instance. Dropping the returned value releases it.
    fn acquire(&self, config: &SimulatorConfig) -> Result<Self::Backend, AcquireError>;
}
