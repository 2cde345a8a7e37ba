//! A single recorded rollout of a scenario.

use simspace_kernel::{AcquireError, BackendError, SimulationBackend};
use std::fmt;

use crate::scenario::Scenario;
use crate::timeline::{Checkpoint, Timeline};

/// Upper bound on a derived step ceiling.
pub const MAX_DERIVED_STEPS: u64 = 10_000_000;

/// Which of the two runs of a consistency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunLabel {
    Fine,
    Coarse,
}

impl fmt::Display for RunLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fine => "fine",
            Self::Coarse => "coarse",
        })
    }
}

/// Backend operation a run was performing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendOp {
    Reset,
    AddObject,
    SetMotionType,
    SetTranslation,
    StepWorld,
    Sample,
}

impl BackendOp {
    /// Adapter for `map_err` that tags a backend error with this operation.
    pub fn wrap(self) -> impl FnOnce(BackendError) -> BackendOpError {
        move |source| BackendOpError { op: self, source }
    }
}

impl fmt::Display for BackendOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Reset => "reset",
            Self::AddObject => "add_object",
            Self::SetMotionType => "set_motion_type",
            Self::SetTranslation => "set_translation",
            Self::StepWorld => "step_world",
            Self::Sample => "sample",
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{op} failed: {source}")]
pub struct BackendOpError {
    pub op: BackendOp,
    pub source: BackendError,
}

/// A run that started but could not finish.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("{run} run: invalid plan: {reason}")]
    InvalidPlan { run: RunLabel, reason: String },
    #[error("{run} run: could not acquire simulation: {error}")]
    Acquire {
        run: RunLabel,
        #[source]
        error: AcquireError,
    },
    #[error("{run} run: {error}")]
    Backend {
        run: RunLabel,
        #[source]
        error: BackendOpError,
    },
    #[error(
        "{run} run did not reach target duration {target}s: world time {world_time}s after {steps} steps"
    )]
    DurationNotReached {
        run: RunLabel,
        target: f64,
        world_time: f64,
        steps: u64,
    },
}

impl RunError {
    pub fn run(&self) -> RunLabel {
        match self {
            Self::InvalidPlan { run, .. }
            | Self::Acquire { run, .. }
            | Self::Backend { run, .. }
            | Self::DurationNotReached { run, .. } => *run,
        }
    }
}

/// Parameters of one rollout.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub label: RunLabel,
    pub timestep: f64,
    /// Record a checkpoint after every `sample_every` steps.
    pub sample_every: u64,
    pub duration: f64,
    /// Slack when testing `world_time >= duration`.
    pub time_tolerance: f64,
    /// Step ceiling guarding against a backend whose time never advances.
    pub max_steps: u64,
}

impl RunPlan {
    /// Twice the nominal step count plus one sampling period, capped at
    /// [`MAX_DERIVED_STEPS`].
    pub fn default_step_limit(duration: f64, timestep: f64, sample_every: u64) -> u64 {
        let nominal = (duration / timestep).ceil();
        let nominal = if nominal.is_finite() && nominal > 0.0 {
            nominal.min(MAX_DERIVED_STEPS as f64) as u64
        } else {
            0
        };
        nominal
            .saturating_mul(2)
            .saturating_add(sample_every.saturating_add(1))
            .min(MAX_DERIVED_STEPS)
    }

    pub fn validate(&self) -> Result<(), RunError> {
        let invalid = |reason: String| {
            Err(RunError::InvalidPlan {
                run: self.label,
                reason,
            })
        };
        if !(self.timestep.is_finite() && self.timestep > 0.0) {
            return invalid(format!("timestep must be positive, got {}", self.timestep));
        }
        if self.sample_every == 0 {
            return invalid("sample_every must be at least 1".into());
        }
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return invalid(format!("duration must be positive, got {}", self.duration));
        }
        if !(self.time_tolerance.is_finite() && self.time_tolerance >= 0.0) {
            return invalid(format!(
                "time tolerance must be non-negative, got {}",
                self.time_tolerance
            ));
        }
        Ok(())
    }
}

/// Apply `scenario` to `backend` and step until the plan's duration is reached.
///
/// Stepping stops at the first sampled step whose world time reaches the
/// duration, so the last checkpoint is always retained and may overshoot.
pub fn record_run<B: SimulationBackend>(
    backend: &mut B,
    scenario: &Scenario,
    plan: &RunPlan,
) -> Result<Timeline, RunError> {
    plan.validate()?;
    let tag = |error: BackendOpError| RunError::Backend {
        run: plan.label,
        error,
    };
    let sample_every = plan.sample_every;

    scenario.apply(backend).map_err(tag)?;

    let mut timeline = Timeline::new(plan.timestep, sample_every);
    let mut world_time = backend.world_time();
    let mut steps: u64 = 0;
    tracing::info!(
        run = %plan.label,
        dt = plan.timestep,
        sample_every,
        duration = plan.duration,
        objects = scenario.len(),
        "run started"
    );

    while !(world_time + plan.time_tolerance >= plan.duration && steps % sample_every == 0) {
        if steps >= plan.max_steps {
            return Err(RunError::DurationNotReached {
                run: plan.label,
                target: plan.duration,
                world_time,
                steps,
            });
        }
        world_time = backend
            .step_world(plan.timestep)
            .map_err(|e| tag(BackendOp::StepWorld.wrap()(e)))?;
        steps += 1;

        if steps % sample_every == 0 {
            let checkpoint = Checkpoint::capture(backend, steps)
                .map_err(|e| tag(BackendOp::Sample.wrap()(e)))?;
            tracing::debug!(
                run = %plan.label,
                index = timeline.len(),
                steps,
                world_time = checkpoint.world_time,
                "checkpoint"
            );
            timeline.push(checkpoint);
        }
    }

    tracing::info!(
        run = %plan.label,
        steps,
        world_time,
        checkpoints = timeline.len(),
        "run finished"
    );
    Ok(timeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use simspace_common::{MotionType, Vec3};
    use simspace_kernel::PhysicsWorld;

    fn plan(timestep: f64, sample_every: u64, duration: f64) -> RunPlan {
        RunPlan {
            label: RunLabel::Fine,
            timestep,
            sample_every,
            duration,
            time_tolerance: 1e-6,
            max_steps: RunPlan::default_step_limit(duration, timestep, sample_every),
        }
    }

    #[test]
    fn samples_every_kth_step() {
        let mut world = PhysicsWorld::with_builtins();
        let t = record_run(&mut world, &Scenario::three_objects(), &plan(0.1, 5, 3.0)).unwrap();
        assert_eq!(t.len(), 7);
        let steps: Vec<_> = t.checkpoints().iter().map(|c| c.step_count).collect();
        assert_eq!(steps, vec![0, 5, 10, 15, 20, 25, 30]);
        assert!(t.checkpoints()[1..].iter().all(|c| c.object_states.len() == 3));
        assert!(t.checkpoints()[0].object_states.is_empty());
    }

    #[test]
    fn overshooting_duration_keeps_last_checkpoint() {
        let mut world = PhysicsWorld::with_builtins();
        let t = record_run(&mut world, &Scenario::new(), &plan(0.5, 1, 1.2)).unwrap();
        assert_eq!(t.len(), 4);
        let last = t.last().unwrap();
        assert_eq!(last.step_count, 3);
        assert!(last.world_time > 1.2);
    }

    #[test]
    fn fine_run_continues_to_sampling_boundary() {
        let mut world = PhysicsWorld::with_builtins();
        let t = record_run(&mut world, &Scenario::new(), &plan(0.1, 5, 0.7)).unwrap();
        assert_eq!(t.last().unwrap().step_count, 10);
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn backend_failure_names_operation() {
        let mut world = PhysicsWorld::with_builtins();
        let scenario = Scenario::new().with_object("anvil", Vec3::ZERO, MotionType::Dynamic);
        let err = record_run(&mut world, &scenario, &plan(0.1, 1, 1.0)).unwrap_err();
        match err {
            RunError::Backend { run, error } => {
                assert_eq!(run, RunLabel::Fine);
                assert_eq!(error.op, BackendOp::AddObject);
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn step_limit_scales_with_duration() {
        assert_eq!(RunPlan::default_step_limit(3.0, 0.5, 1), 14);
        assert_eq!(RunPlan::default_step_limit(3.0, 0.1, 5), 66);
    }

    #[test]
    fn step_limit_is_bounded_for_degenerate_steps() {
        assert!(RunPlan::default_step_limit(3.0, 0.0, 1) <= MAX_DERIVED_STEPS);
        assert!(RunPlan::default_step_limit(3.0, 1e-300, 1) <= MAX_DERIVED_STEPS);
        assert!(RunPlan::default_step_limit(f64::NAN, 0.1, 1) <= MAX_DERIVED_STEPS);
        assert_eq!(RunPlan::default_step_limit(3.0, 0.0, u64::MAX), MAX_DERIVED_STEPS);
    }

    #[test]
    fn zero_timestep_is_rejected_before_stepping() {
        let mut world = PhysicsWorld::with_builtins();
        let err = record_run(&mut world, &Scenario::three_objects(), &plan(0.0, 1, 3.0)).unwrap_err();
        assert!(matches!(err, RunError::InvalidPlan { run: RunLabel::Fine, .. }), "{err}");
        assert_eq!(world.object_count(), 0);
        assert_eq!(world.world_time(), 0.0);
    }

    #[test]
    fn invalid_plans_are_rejected() {
        let base = plan(0.1, 1, 1.0);
        let bad = [
            RunPlan { timestep: f64::NAN, ..base.clone() },
            RunPlan { timestep: -0.1, ..base.clone() },
            RunPlan { sample_every: 0, ..base.clone() },
            RunPlan { duration: 0.0, ..base.clone() },
            RunPlan { duration: f64::INFINITY, ..base.clone() },
            RunPlan { time_tolerance: -1.0, ..base.clone() },
        ];
        for p in bad {
            assert!(p.validate().is_err(), "{p:?} accepted");
        }
        base.validate().unwrap();
    }
}
