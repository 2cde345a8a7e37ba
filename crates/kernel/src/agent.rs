//! Embodied agent executing discrete actions against a simulation backend.

use glam::Quat;
use simspace_common::{MotionType, ObjectId, Vec3};

use crate::backend::{BackendError, SimulationBackend};
use crate::config::AgentConfig;

/// Pitch limit for look actions, in degrees.
const MAX_PITCH_DEG: f32 = 90.0;

/// Offset of a held object from the agent base, in agent-local space.
const HOLD_DISTANCE: f32 = 1.0;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("action {0:?} is not in the agent's action space")]
    UnknownAction(String),
    #[error("action {0:?} has no control bound to it")]
    NoControl(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Position and orientation of an agent. Forward is -Z at zero yaw.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AgentState {
    pub position: Vec3,
    pub yaw_deg: f32,
    pub pitch_deg: f32,
}

/// What an action did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionOutcome {
    Moved(Vec3),
    Turned { yaw_deg: f32 },
    Looked { pitch_deg: f32 },
    Grabbed(ObjectId),
    Released(ObjectId),
    NothingInReach,
}

#[derive(Debug, Clone)]
pub struct Agent {
    config: AgentConfig,
    state: AgentState,
    grabbed: Option<ObjectId>,
}

impl Agent {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config,
            state: AgentState::default(),
            grabbed: None,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn set_state(&mut self, state: AgentState) {
        self.state = state;
    }

    /// Object currently held by the agent, if any.
    pub fn grabbed(&self) -> Option<ObjectId> {
        self.grabbed
    }

    fn heading(&self) -> Quat {
        Quat::from_rotation_y(self.state.yaw_deg.to_radians())
    }

    /// Unit vector the agent body faces, in the horizontal plane.
    pub fn forward(&self) -> Vec3 {
        self.heading() * Vec3::NEG_Z
    }

    pub fn sensor_position(&self) -> Vec3 {
        self.state.position + Vec3::Y * self.config.sensor_height()
    }

    /// Map an agent-local point into world space (yaw only).
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.state.position + self.heading() * local
    }

    /// Execute the action registered under `name`.
    pub fn act<B: SimulationBackend>(
        &mut self,
        name: &str,
        backend: &mut B,
    ) -> Result<ActionOutcome, AgentError> {
        let amount = self
            .config
            .action_space
            .get(name)
            .map(|spec| spec.actuation.amount)
            .ok_or_else(|| AgentError::UnknownAction(name.to_owned()))?;

        let outcome = match name {
            "move_forward" => self.translate(self.forward() * amount),
            "move_backward" => self.translate(self.forward() * -amount),
            "turn_left" => self.turn(amount),
            "turn_right" => self.turn(-amount),
            "look_up" => self.look(amount),
            "look_down" => self.look(-amount),
            "grab_release_object" => return self.grab_or_release(amount, backend),
            _ => return Err(AgentError::NoControl(name.to_owned())),
        };
        self.carry(backend)?;
        tracing::debug!(action = name, ?outcome, "agent acted");
        Ok(outcome)
    }

    fn translate(&mut self, delta: Vec3) -> ActionOutcome {
        self.state.position += delta;
        ActionOutcome::Moved(self.state.position)
    }

    fn turn(&mut self, degrees: f32) -> ActionOutcome {
        self.state.yaw_deg = (self.state.yaw_deg + degrees).rem_euclid(360.0);
        ActionOutcome::Turned {
            yaw_deg: self.state.yaw_deg,
        }
    }

    fn look(&mut self, degrees: f32) -> ActionOutcome {
        self.state.pitch_deg =
            (self.state.pitch_deg + degrees).clamp(-MAX_PITCH_DEG, MAX_PITCH_DEG);
        ActionOutcome::Looked {
            pitch_deg: self.state.pitch_deg,
        }
    }

    fn hold_point(&self) -> Vec3 {
        self.transform_point(Vec3::new(
            0.0,
            self.config.sensor_height(),
            -HOLD_DISTANCE,
        ))
    }

    /// Keep a held object in front of the agent.
    fn carry<B: SimulationBackend>(&self, backend: &mut B) -> Result<(), BackendError> {
        if let Some(id) = self.grabbed {
            backend.set_translation(id, self.hold_point())?;
        }
        Ok(())
    }

    fn grab_or_release<B: SimulationBackend>(
        &mut self,
        reach: f32,
        backend: &mut B,
    ) -> Result<ActionOutcome, AgentError> {
        if let Some(id) = self.grabbed.take() {
            backend.set_motion_type(id, MotionType::Dynamic)?;
            tracing::debug!(object = %id, "released object");
            return Ok(ActionOutcome::Released(id));
        }

        let eye = self.sensor_position();
        let mut nearest: Option<(ObjectId, f32)> = None;
        for id in backend.existing_object_ids() {
            let distance = backend.translation(id)?.distance(eye);
            if distance <= reach && nearest.is_none_or(|(_, best)| distance < best) {
                nearest = Some((id, distance));
            }
        }

        let Some((id, _)) = nearest else {
            return Ok(ActionOutcome::NothingInReach);
        };
        backend.set_motion_type(id, MotionType::Kinematic)?;
        self.grabbed = Some(id);
        self.carry(backend)?;
        tracing::debug!(object = %id, "grabbed object");
        Ok(ActionOutcome::Grabbed(id))
    }
}
