//! Reproducible object setups.
//!
//! A scenario is replayed from scratch for every run: same objects, same
//! insertion order, same initial translations, same motion types.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use simspace_common::{MotionType, ObjectId, Vec3};
use simspace_kernel::SimulationBackend;

use crate::run::{BackendOp, BackendOpError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectPlacement {
    /// Template handle passed to `add_object`.
    pub template: String,
    pub translation: Vec3,
    #[serde(default)]
    pub motion_type: MotionType,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub objects: Vec<ObjectPlacement>,
}

impl Scenario {
    /// A scenario with no objects.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sphere and soccer ball (dynamic) above a chair (static).
    pub fn three_objects() -> Self {
        Self::new()
            .with_object(
                "sphere",
                Vec3::new(-0.951_778_7, 2.167_676_6, 11.343_99),
                MotionType::Dynamic,
            )
            .with_object(
                "mini_soccer_ball",
                Vec3::new(-0.951_778_7, 0.467_676_64, 11.343_99),
                MotionType::Dynamic,
            )
            .with_object(
                "chair",
                Vec3::new(-0.951_778_7, 1.576_766_4, 11.343_99),
                MotionType::Static,
            )
    }

    pub fn with_object(
        mut self,
        template: impl Into<String>,
        translation: Vec3,
        motion_type: MotionType,
    ) -> Self {
        self.objects.push(ObjectPlacement {
            template: template.into(),
            translation,
            motion_type,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Reset `backend` and add every object in order. Returns the new ids.
    pub fn apply<B: SimulationBackend>(
        &self,
        backend: &mut B,
    ) -> Result<Vec<ObjectId>, BackendOpError> {
        backend.reset().map_err(BackendOp::Reset.wrap())?;
        let mut ids = Vec::with_capacity(self.objects.len());
        for placement in &self.objects {
            let id = backend
                .add_object(&placement.template)
                .map_err(BackendOp::AddObject.wrap())?;
            backend
                .set_motion_type(id, placement.motion_type)
                .map_err(BackendOp::SetMotionType.wrap())?;
            backend
                .set_translation(id, placement.translation)
                .map_err(BackendOp::SetTranslation.wrap())?;
            tracing::trace!(object = %id, template = %placement.template, "placed object");
            ids.push(id);
        }
        Ok(ids)
    }

    /// SHA-256 over the canonical content of the scenario, as lowercase hex.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.objects.len() as u64).to_le_bytes());
        for placement in &self.objects {
            hasher.update((placement.template.len() as u64).to_le_bytes());
            hasher.update(placement.template.as_bytes());
            for v in placement.translation.to_array() {
                hasher.update(v.to_le_bytes());
            }
            hasher.update(placement.motion_type.as_str().as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simspace_kernel::{BackendError, PhysicsWorld};

    #[test]
    fn three_objects_layout() {
        let s = Scenario::three_objects();
        let templates: Vec<_> = s.objects.iter().map(|o| o.template.as_str()).collect();
        assert_eq!(templates, vec!["sphere", "mini_soccer_ball", "chair"]);
        let dynamic = s
            .objects
            .iter()
            .filter(|o| o.motion_type == MotionType::Dynamic)
            .count();
        assert_eq!(dynamic, 2);
    }

    #[test]
    fn apply_adds_objects_in_order() {
        let mut world = PhysicsWorld::with_builtins();
        world.add_object("cube").unwrap();
        let ids = Scenario::three_objects().apply(&mut world).unwrap();
        assert_eq!(ids, vec![ObjectId(0), ObjectId(1), ObjectId(2)]);
        assert_eq!(world.existing_object_ids(), ids);
        assert_eq!(world.motion_type(ids[2]).unwrap(), MotionType::Static);
        assert_eq!(
            world.translation(ids[1]).unwrap(),
            Scenario::three_objects().objects[1].translation
        );
    }

    #[test]
    fn apply_reports_failing_operation() {
        let mut world = PhysicsWorld::with_builtins();
        let err = Scenario::new()
            .with_object("piano", Vec3::ZERO, MotionType::Dynamic)
            .apply(&mut world)
            .unwrap_err();
        assert_eq!(err.op, BackendOp::AddObject);
        assert!(matches!(err.source, BackendError::UnknownTemplate(_)));
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = Scenario::three_objects();
        assert_eq!(a.fingerprint(), Scenario::three_objects().fingerprint());
        assert_eq!(a.fingerprint().len(), 64);

        let mut moved = a.clone();
        moved.objects[0].translation.x += 0.5;
        assert_ne!(a.fingerprint(), moved.fingerprint());

        let mut pinned = a.clone();
        pinned.objects[0].motion_type = MotionType::Static;
        assert_ne!(a.fingerprint(), pinned.fingerprint());
    }

    #[test]
    fn yaml_defaults_motion_type() {
        let s: Scenario = serde_yaml::from_str(
            "objects:\n  - template: sphere\n    translation: [0.0, 1.0, 0.0]\n",
        )
        .unwrap();
        assert_eq!(s.objects[0].motion_type, MotionType::Dynamic);
        assert_eq!(s.objects[0].translation, Vec3::Y);
    }
}
