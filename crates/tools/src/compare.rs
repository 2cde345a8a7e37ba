//! Pairwise timeline comparison.
//!
//! Checkpoints are paired by index, never by exact world time, and positions
//! are compared with a tolerance only.

use serde::{Deserialize, Serialize};
use simspace_common::{ObjectId, Vec3};
use std::fmt;

use crate::timeline::Timeline;

/// Allowed disagreement between paired checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    /// Maximum Euclidean distance between paired translations, in metres.
    pub translation: f32,
    /// Maximum difference between paired world times, in seconds.
    pub world_time: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            translation: 1e-3,
            world_time: 1e-6,
        }
    }
}

/// The first point where two timelines disagree. Fields suffixed `a` come
/// from the first timeline, `b` from the second.
#[derive(Debug, Clone, PartialEq)]
pub enum Divergence {
    CheckpointCount {
        a: usize,
        b: usize,
    },
    WorldTime {
        checkpoint: usize,
        a: f64,
        b: f64,
    },
    ObjectCount {
        checkpoint: usize,
        a: usize,
        b: usize,
    },
    Translation {
        checkpoint: usize,
        object_index: usize,
        object_id: ObjectId,
        a: Vec3,
        b: Vec3,
        delta: f32,
    },
}

impl Divergence {
    /// Checkpoint index the divergence was found at, if it is tied to one.
    pub fn checkpoint(&self) -> Option<usize> {
        match self {
            Self::CheckpointCount { .. } => None,
            Self::WorldTime { checkpoint, .. }
            | Self::ObjectCount { checkpoint, .. }
            | Self::Translation { checkpoint, .. } => Some(*checkpoint),
        }
    }
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CheckpointCount { a, b } => {
                write!(f, "checkpoint count differs: {a} vs {b}")
            }
            Self::WorldTime { checkpoint, a, b } => write!(
                f,
                "checkpoint {checkpoint}: world time {a:.6}s vs {b:.6}s"
            ),
            Self::ObjectCount { checkpoint, a, b } => write!(
                f,
                "checkpoint {checkpoint}: object count {a} vs {b}"
            ),
            Self::Translation {
                checkpoint,
                object_index,
                object_id,
                a,
                b,
                delta,
            } => write!(
                f,
                "checkpoint {checkpoint}, object {object_index} ({object_id}): \
                 ({:.4}, {:.4}, {:.4}) vs ({:.4}, {:.4}, {:.4}), delta {delta:.6}",
                a.x, a.y, a.z, b.x, b.y, b.z
            ),
        }
    }
}

/// Summary of two timelines that agree within tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Agreement {
    pub checkpoints: usize,
    pub object_samples: usize,
    pub max_translation_delta: f32,
    pub max_time_delta: f64,
}

impl fmt::Display for Agreement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} checkpoints, {} object samples, max delta {:.6} m, max time delta {:.2e} s",
            self.checkpoints, self.object_samples, self.max_translation_delta, self.max_time_delta
        )
    }
}

/// Compare two timelines checkpoint by checkpoint.
///
/// Returns the first divergence found, scanning checkpoints in order and
/// objects in order within each checkpoint. A NaN delta counts as divergent.
pub fn compare_timelines(
    a: &Timeline,
    b: &Timeline,
    tolerance: &Tolerance,
) -> Result<Agreement, Divergence> {
    if a.len() != b.len() {
        return Err(Divergence::CheckpointCount {
            a: a.len(),
            b: b.len(),
        });
    }

    let mut agreement = Agreement {
        checkpoints: a.len(),
        ..Agreement::default()
    };
    for (index, (ca, cb)) in a.checkpoints().iter().zip(b.checkpoints()).enumerate() {
        let time_delta = (ca.world_time - cb.world_time).abs();
        if !(time_delta <= tolerance.world_time) {
            return Err(Divergence::WorldTime {
                checkpoint: index,
                a: ca.world_time,
                b: cb.world_time,
            });
        }
        agreement.max_time_delta = agreement.max_time_delta.max(time_delta);

        if ca.object_states.len() != cb.object_states.len() {
            return Err(Divergence::ObjectCount {
                checkpoint: index,
                a: ca.object_states.len(),
                b: cb.object_states.len(),
            });
        }

        for (object_index, (sa, sb)) in ca.object_states.iter().zip(&cb.object_states).enumerate()
        {
            let delta = sa.translation.distance(sb.translation);
            if !(delta <= tolerance.translation) {
                return Err(Divergence::Translation {
                    checkpoint: index,
                    object_index,
                    object_id: sa.object_id,
                    a: sa.translation,
                    b: sb.translation,
                    delta,
                });
            }
            agreement.max_translation_delta = agreement.max_translation_delta.max(delta);
            agreement.object_samples += 1;
        }
    }
    Ok(agreement)
}
