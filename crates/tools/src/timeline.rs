use serde::{Deserialize, Serialize};
use simspace_common::{ObjectId, Vec3};
use simspace_kernel::{BackendError, SimulationBackend};

/// Position of one object at a sampling instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectState {
    pub object_id: ObjectId,
    pub translation: Vec3,
}

/// Snapshot of world time and every object's position at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub world_time: f64,
    /// Steps taken by the run when this checkpoint was recorded.
    pub step_count: u64,
    /// In the backend's enumeration order, which is stable within a run.
    pub object_states: Vec<ObjectState>,
}

impl Checkpoint {
    /// The synthetic checkpoint every timeline starts with.
    pub fn zero() -> Self {
        Self {
            world_time: 0.0,
            step_count: 0,
            object_states: Vec::new(),
        }
    }

    /// Sample all live objects of `backend`.
    pub fn capture<B: SimulationBackend>(
        backend: &B,
        step_count: u64,
    ) -> Result<Self, BackendError> {
        let object_states = backend
            .existing_object_ids()
            .into_iter()
            .map(|object_id| {
                Ok(ObjectState {
                    object_id,
                    translation: backend.translation(object_id)?,
                })
            })
            .collect::<Result<Vec<_>, BackendError>>()?;
        Ok(Self {
            world_time: backend.world_time(),
            step_count,
            object_states,
        })
    }
}

/// Ordered checkpoints produced by exactly one run.
///
/// Append-only: checkpoints can be pushed but never edited or removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// Step size the run used, in seconds.
    timestep: f64,
    /// A checkpoint was recorded after every `sample_every` steps.
    sample_every: u64,
    checkpoints: Vec<Checkpoint>,
}

impl Timeline {
    /// Start a timeline holding only the zero checkpoint.
    pub fn new(timestep: f64, sample_every: u64) -> Self {
        Self {
            timestep,
            sample_every,
            checkpoints: vec![Checkpoint::zero()],
        }
    }

    pub fn push(&mut self, checkpoint: Checkpoint) {
        debug_assert!(
            self.checkpoints
                .last()
                .is_none_or(|last| last.step_count < checkpoint.step_count),
            "checkpoints must be appended in step order"
        );
        self.checkpoints.push(checkpoint);
    }

    pub fn timestep(&self) -> f64 {
        self.timestep
    }

    pub fn sample_every(&self) -> u64 {
        self.sample_every
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    pub fn last(&self) -> Option<&Checkpoint> {
        self.checkpoints.last()
    }

    /// Time between consecutive checkpoints.
    pub fn sample_interval(&self) -> f64 {
        self.timestep * self.sample_every as f64
    }
}
