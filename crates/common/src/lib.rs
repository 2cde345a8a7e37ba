//! Shared types for the simspace simulator, its backends, and tooling.

pub mod types;

pub use types::{MotionType, ObjectId, Vec3};
