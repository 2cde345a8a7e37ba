//! Step-size consistency check.
//!
//! The same scenario is rolled out twice over the same duration: once with a
//! fine step sampled every `ratio` steps, once with a coarse step
//! (`ratio × fine`) sampled every step. The two timelines are then compared
//! checkpoint by checkpoint.

use serde::{Deserialize, Serialize};
use simspace_kernel::{AcquireError, BackendFactory, ConfigError, SimulatorConfig};
use std::fmt;

use crate::compare::{Agreement, Divergence, Tolerance, compare_timelines};
use crate::run::{RunError, RunLabel, RunPlan, record_run};
use crate::scenario::Scenario;
use crate::timeline::Timeline;

#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("invalid check configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid simulator configuration: {0}")]
    Simulator(#[from] ConfigError),
}

/// Parameters of a consistency check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Simulated seconds each run must reach.
    pub duration: f64,
    pub fine_timestep: f64,
    /// Coarse timestep as a multiple of the fine one.
    pub ratio: u32,
    /// Maximum translation delta between paired checkpoints, in metres.
    pub tolerance: f32,
    /// Maximum world time delta between paired checkpoints, in seconds.
    pub time_tolerance: f64,
    /// Per-run step ceiling. Derived from the duration when unset.
    pub max_steps: Option<u64>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            duration: 3.0,
            fine_timestep: 0.1,
            ratio: 5,
            tolerance: 1e-3,
            time_tolerance: 1e-6,
            max_steps: None,
        }
    }
}

impl CheckConfig {
    pub fn coarse_timestep(&self) -> f64 {
        self.fine_timestep * f64::from(self.ratio)
    }

    pub fn tolerance(&self) -> Tolerance {
        Tolerance {
            translation: self.tolerance,
            world_time: self.time_tolerance,
        }
    }

    pub fn validate(&self) -> Result<(), CheckError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.fine_timestep) {
            return Err(CheckError::InvalidConfig(format!(
                "fine timestep must be positive, got {}",
                self.fine_timestep
            )));
        }
        if self.ratio == 0 {
            return Err(CheckError::InvalidConfig("ratio must be at least 1".into()));
        }
        if !positive(self.duration) {
            return Err(CheckError::InvalidConfig(format!(
                "duration must be positive, got {}",
                self.duration
            )));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(CheckError::InvalidConfig(format!(
                "tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        if !(self.time_tolerance.is_finite() && self.time_tolerance >= 0.0) {
            return Err(CheckError::InvalidConfig(format!(
                "time tolerance must be non-negative, got {}",
                self.time_tolerance
            )));
        }
        Ok(())
    }

    fn plan(&self, label: RunLabel) -> RunPlan {
        let (timestep, sample_every) = match label {
            RunLabel::Fine => (self.fine_timestep, u64::from(self.ratio)),
            RunLabel::Coarse => (self.coarse_timestep(), 1),
        };
        RunPlan {
            label,
            timestep,
            sample_every,
            duration: self.duration,
            time_tolerance: self.time_tolerance,
            max_steps: self.max_steps.unwrap_or_else(|| {
                RunPlan::default_step_limit(self.duration, timestep, sample_every)
            }),
        }
    }
}

/// Outcome of a consistency check.
#[derive(Debug)]
pub enum Verdict {
    /// Every paired checkpoint agreed within tolerance.
    Pass(Agreement),
    /// The timelines diverged.
    Fail(Divergence),
    /// A precondition was not met, so nothing was evaluated.
    Skipped { reason: String },
    /// A run broke part way, so no comparison was made.
    Inconclusive(RunError),
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pass(_) => "PASS",
            Self::Fail(_) => "FAIL",
            Self::Skipped { .. } => "SKIPPED",
            Self::Inconclusive(_) => "INCONCLUSIVE",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass(agreement) => write!(f, "PASS: {agreement}"),
            Self::Fail(divergence) => write!(f, "FAIL: {divergence}"),
            Self::Skipped { reason } => write!(f, "SKIPPED: {reason}"),
            Self::Inconclusive(error) => write!(f, "INCONCLUSIVE: {error}"),
        }
    }
}

/// Verdict plus whichever timelines were completed.
#[derive(Debug)]
pub struct CheckReport {
    pub verdict: Verdict,
    pub fine: Option<Timeline>,
    pub coarse: Option<Timeline>,
}

/// Runs a scenario at two step sizes and compares the resulting trajectories.
#[derive(Debug, Clone)]
pub struct TrajectoryConsistencyChecker {
    config: CheckConfig,
}

impl TrajectoryConsistencyChecker {
    pub fn new(config: CheckConfig) -> Result<Self, CheckError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    /// Run both rollouts sequentially and compare them.
    ///
    /// Each run acquires its own simulation instance and releases it before
    /// the next one starts. An invalid simulator configuration is rejected
    /// before either run.
    pub fn check<F: BackendFactory>(
        &self,
        factory: &F,
        simulator: &SimulatorConfig,
        scenario: &Scenario,
    ) -> Result<CheckReport, CheckError> {
        simulator.validate()?;
        tracing::info!(
            duration = self.config.duration,
            fine_dt = self.config.fine_timestep,
            coarse_dt = self.config.coarse_timestep(),
            tolerance = self.config.tolerance,
            "consistency check started"
        );

        let fine = match self.run_once(factory, simulator, scenario, RunLabel::Fine) {
            Ok(t) => t,
            Err(verdict) => return Ok(report(verdict, None, None)),
        };
        let coarse = match self.run_once(factory, simulator, scenario, RunLabel::Coarse) {
            Ok(t) => t,
            Err(verdict) => return Ok(report(verdict, Some(fine), None)),
        };

        let verdict = match compare_timelines(&fine, &coarse, &self.config.tolerance()) {
            Ok(agreement) => {
                tracing::info!(%agreement, "timelines agree");
                Verdict::Pass(agreement)
            }
            Err(divergence) => {
                tracing::warn!(%divergence, "timelines diverge");
                Verdict::Fail(divergence)
            }
        };
        Ok(report(verdict, Some(fine), Some(coarse)))
    }

    fn run_once<F: BackendFactory>(
        &self,
        factory: &F,
        simulator: &SimulatorConfig,
        scenario: &Scenario,
        label: RunLabel,
    ) -> Result<Timeline, Verdict> {
        let mut backend = match factory.acquire(simulator) {
            Ok(backend) => backend,
            // Nothing to run against here: not a failure of the backend.
            Err(e @ (AcquireError::Unavailable(_) | AcquireError::MissingAsset(_))) => {
                tracing::warn!(run = %label, error = %e, "check skipped");
                return Err(Verdict::Skipped {
                    reason: e.to_string(),
                });
            }
            Err(error) => {
                tracing::warn!(run = %label, %error, "acquisition failed");
                return Err(Verdict::Inconclusive(RunError::Acquire { run: label, error }));
            }
        };
        let result = record_run(&mut backend, scenario, &self.config.plan(label));
        drop(backend);
        tracing::debug!(run = %label, "simulation handle released");

        result.map_err(|e| {
            tracing::warn!(error = %e, "run aborted");
            Verdict::Inconclusive(e)
        })
    }
}

fn report(verdict: Verdict, fine: Option<Timeline>, coarse: Option<Timeline>) -> CheckReport {
    CheckReport {
        verdict,
        fine,
        coarse,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_reference_check() {
        let cfg = CheckConfig::default();
        cfg.validate().unwrap();
        assert!((cfg.coarse_timestep() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn rejects_invalid_parameters() {
        let bad = [
            CheckConfig {
                fine_timestep: 0.0,
                ..CheckConfig::default()
            },
            CheckConfig {
                ratio: 0,
                ..CheckConfig::default()
            },
            CheckConfig {
                duration: -1.0,
                ..CheckConfig::default()
            },
            CheckConfig {
                tolerance: f32::NAN,
                ..CheckConfig::default()
            },
            CheckConfig {
                time_tolerance: -1.0,
                ..CheckConfig::default()
            },
        ];
        for cfg in bad {
            assert!(
                TrajectoryConsistencyChecker::new(cfg.clone()).is_err(),
                "{cfg:?} accepted"
            );
        }
    }

    #[test]
    fn plans_sample_at_matching_cadence() {
        let cfg = CheckConfig::default();
        let fine = cfg.plan(RunLabel::Fine);
        let coarse = cfg.plan(RunLabel::Coarse);
        assert_eq!(fine.sample_every, 5);
        assert_eq!(coarse.sample_every, 1);
        assert!((fine.timestep * 5.0 - coarse.timestep).abs() < 1e-12);
    }

    #[test]
    fn explicit_step_ceiling_is_used() {
        let cfg = CheckConfig {
            max_steps: Some(3),
            ..CheckConfig::default()
        };
        assert_eq!(cfg.plan(RunLabel::Fine).max_steps, 3);
    }

    #[test]
    fn yaml_config_fills_defaults() {
        let cfg: CheckConfig = serde_yaml::from_str("ratio: 2\ntolerance: 0.01\n").unwrap();
        assert_eq!(cfg.ratio, 2);
        assert_eq!(cfg.duration, 3.0);
        assert_eq!(cfg.max_steps, None);
    }
}
