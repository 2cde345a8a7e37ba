use serde::{Deserialize, Serialize};
use std::fmt;

pub use glam::Vec3;

/// Identifier of an object inside one simulation instance.
///
/// Ids are unique within a run. They are only comparable across runs when
/// objects were added in the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How the physics backend treats an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionType {
    /// Never moves; collision geometry only.
    Static,
    /// Moved explicitly or by velocity control, never simulated.
    Kinematic,
    /// Simulated by the physics integrator.
    #[default]
    Dynamic,
}

impl MotionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Kinematic => "kinematic",
            Self::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for MotionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
