use serde::{Deserialize, Serialize};
use simspace_common::{MotionType, ObjectId, Vec3};
use std::collections::BTreeMap;

use crate::backend::{BackendError, SimulationBackend};
use crate::config::{Integration, PhysicsConfig, SimulatorConfig};
use crate::template::ObjectTemplateLibrary;

/// Slack, in fixed steps, when converting requested time into whole substeps.
/// Absorbs rounding in accumulated `dt` sums such as ten additions of 0.1.
const SUBSTEP_EPSILON: f64 = 1e-6;

/// Per-object state stored in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigidObject {
    /// Handle of the template this object was created from.
    pub template: String,
    pub translation: Vec3,
    pub linear_velocity: Vec3,
    pub motion_type: MotionType,
    /// Linear velocity applied each update to non-simulated objects.
    pub velocity_control: Option<Vec3>,
    pub half_height: f32,
    pub restitution: f32,
}

/// Reference physics world.
///
/// Objects live in a BTreeMap so iteration (and therefore integration and
/// sampling order) follows id order, which is insertion order. Given the same
/// configuration and sequence of operations, two worlds produce bitwise
/// identical states.
///
/// With [`Integration::FixedSubstep`] the world only ever advances in whole
/// fixed timesteps, so the trajectory depends on total elapsed time and not on
/// how that time was split across `step_world` calls.
#[derive(Debug, Clone)]
pub struct PhysicsWorld {
    templates: ObjectTemplateLibrary,
    objects: BTreeMap<ObjectId, RigidObject>,
    next_id: u32,
    physics: PhysicsConfig,
    enable_physics: bool,
    substeps: u64,
    /// Total time requested through `step_world` since the last reset.
    requested_time: f64,
    world_time: f64,
}

impl PhysicsWorld {
    /// Create an empty world at time zero.
    pub fn new(config: &SimulatorConfig, templates: ObjectTemplateLibrary) -> Self {
        Self {
            templates,
            objects: BTreeMap::new(),
            next_id: 0,
            physics: config.physics.clone(),
            enable_physics: config.enable_physics,
            substeps: 0,
            requested_time: 0.0,
            world_time: 0.0,
        }
    }

    /// Default configuration with the built-in templates.
    pub fn with_builtins() -> Self {
        Self::new(
            &SimulatorConfig::default(),
            ObjectTemplateLibrary::with_builtins(),
        )
    }

    pub fn templates(&self) -> &ObjectTemplateLibrary {
        &self.templates
    }

    pub fn physics(&self) -> &PhysicsConfig {
        &self.physics
    }

    /// Fixed integration updates taken since the last reset.
    pub fn substeps(&self) -> u64 {
        self.substeps
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Read-only access to all objects (BTreeMap for deterministic iteration).
    pub fn objects(&self) -> &BTreeMap<ObjectId, RigidObject> {
        &self.objects
    }

    pub fn get(&self, id: ObjectId) -> Option<&RigidObject> {
        self.objects.get(&id)
    }

    fn get_mut(&mut self, id: ObjectId) -> Result<&mut RigidObject, BackendError> {
        self.objects
            .get_mut(&id)
            .ok_or(BackendError::UnknownObject(id))
    }

    /// Remove an object. Returns its state if it existed.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<RigidObject> {
        self.objects.remove(&id)
    }

    /// Drive a non-simulated object at a constant linear velocity.
    pub fn set_velocity_control(
        &mut self,
        id: ObjectId,
        velocity: Option<Vec3>,
    ) -> Result<(), BackendError> {
        self.get_mut(id)?.velocity_control = velocity;
        Ok(())
    }

    pub fn motion_type(&self, id: ObjectId) -> Result<MotionType, BackendError> {
        self.get(id)
            .map(|o| o.motion_type)
            .ok_or(BackendError::UnknownObject(id))
    }

    fn integrate(&mut self, h: f32) {
        let gravity = Vec3::from(self.physics.gravity);
        let ground = self.physics.ground_height;
        let simulate = self.enable_physics;
        for object in self.objects.values_mut() {
            match object.motion_type {
                MotionType::Static => {}
                MotionType::Dynamic if simulate => {
                    // Semi-implicit Euler.
                    object.linear_velocity += gravity * h;
                    object.translation += object.linear_velocity * h;
                    let floor = ground + object.half_height;
                    if object.translation.y < floor {
                        object.translation.y = floor;
                        if object.linear_velocity.y < 0.0 {
                            object.linear_velocity.y *= -object.restitution;
                        }
                    }
                }
                MotionType::Kinematic | MotionType::Dynamic => {
                    if let Some(v) = object.velocity_control {
                        object.translation += v * h;
                    }
                }
            }
        }
    }

    /// Compute a deterministic hash of the world state for comparison.
    /// Uses canonical (BTreeMap) iteration order.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325; // FNV offset basis
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= b as u64;
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        mix(&mut h, &self.substeps.to_le_bytes());
        mix(&mut h, &self.world_time.to_le_bytes());
        for (id, object) in &self.objects {
            mix(&mut h, &id.0.to_le_bytes());
            mix(&mut h, &[object.motion_type as u8]);
            for v in object
                .translation
                .to_array()
                .iter()
                .chain(object.linear_velocity.to_array().iter())
            {
                mix(&mut h, &v.to_le_bytes());
            }
        }
        h
    }
}

impl SimulationBackend for PhysicsWorld {
    /// Remove every object and rewind time. Object ids restart at zero.
    fn reset(&mut self) -> Result<(), BackendError> {
        self.objects.clear();
        self.next_id = 0;
        self.substeps = 0;
        self.requested_time = 0.0;
        self.world_time = 0.0;
        Ok(())
    }

    fn add_object(&mut self, handle: &str) -> Result<ObjectId, BackendError> {
        let template = self
            .templates
            .get(handle)
            .ok_or_else(|| BackendError::UnknownTemplate(handle.to_owned()))?;
        let object = RigidObject {
            template: handle.to_owned(),
            translation: Vec3::ZERO,
            linear_velocity: Vec3::ZERO,
            motion_type: MotionType::Dynamic,
            velocity_control: None,
            half_height: template.half_height(),
            restitution: template.restitution,
        };
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects.insert(id, object);
        Ok(id)
    }

    fn set_translation(&mut self, id: ObjectId, translation: Vec3) -> Result<(), BackendError> {
        self.get_mut(id)?.translation = translation;
        Ok(())
    }

    fn set_motion_type(&mut self, id: ObjectId, motion_type: MotionType) -> Result<(), BackendError> {
        let object = self.get_mut(id)?;
        object.motion_type = motion_type;
        if motion_type == MotionType::Static {
            object.linear_velocity = Vec3::ZERO;
        }
        Ok(())
    }

    /// Advance the world. A negative `dt` means one fixed timestep.
    fn step_world(&mut self, dt: f64) -> Result<f64, BackendError> {
        if !dt.is_finite() {
            return Err(BackendError::InvalidTimestep(dt));
        }
        let fixed = self.physics.fixed_timestep;
        let dt = if dt < 0.0 { fixed } else { dt };
        match self.physics.integration {
            Integration::FixedSubstep => {
                self.requested_time += dt;
                let target = (self.requested_time / fixed + SUBSTEP_EPSILON).floor() as u64;
                while self.substeps < target {
                    self.integrate(fixed as f32);
                    self.substeps += 1;
                }
                self.world_time = self.substeps as f64 * fixed;
            }
            Integration::Direct => {
                if dt > 0.0 {
                    self.integrate(dt as f32);
                    self.substeps += 1;
                }
                self.requested_time += dt;
                self.world_time = self.requested_time;
            }
        }
        Ok(self.world_time)
    }

    fn world_time(&self) -> f64 {
        self.world_time
    }

    fn existing_object_ids(&self) -> Vec<ObjectId> {
        self.objects.keys().copied().collect()
    }

    fn translation(&self, id: ObjectId) -> Result<Vec3, BackendError> {
        self.get(id)
            .map(|o| o.translation)
            .ok_or(BackendError::UnknownObject(id))
    }
}
