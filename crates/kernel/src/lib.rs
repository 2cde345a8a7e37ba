//! Simulation kernel: the backend contract consumed by the consistency
//! tooling, simulator configuration, and a reference fixed-timestep physics
//! world with an embodied agent.
//!
//! # Invariants
//! - A backend value is one simulation instance, owned by one run, released on drop.
//! - Objects are enumerated in insertion (id) order.
//! - With fixed substepping, state depends on elapsed time, not on how it was split.

pub mod agent;
pub mod backend;
pub mod config;
pub mod simulator;
pub mod template;
pub mod world;

pub use agent::{ActionOutcome, Agent, AgentError, AgentState};
pub use backend::{AcquireError, BackendError, BackendFactory, SimulationBackend};
pub use config::{
    ActionSpec, ActuationSpec, AgentConfig, ConfigError, Integration, PhysicsConfig, SensorSpec,
    SensorType, SimulatorConfig,
};
pub use simulator::ReferenceSimulator;
pub use template::{ObjectTemplate, ObjectTemplateLibrary};
pub use world::{PhysicsWorld, RigidObject};
