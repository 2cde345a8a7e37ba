//! On-disk timelines.
//!
//! A recorded timeline carries the fingerprint of the scenario that produced
//! it, so a later comparison can refuse to pair runs of different setups.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::compare::{Agreement, Divergence, Tolerance, compare_timelines};
use crate::scenario::Scenario;
use crate::timeline::Timeline;

/// Current timeline file format version.
pub const TIMELINE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("format version mismatch: file has v{found}, expected v{expected}")]
    FormatMismatch { found: u32, expected: u32 },
    #[error("timelines come from different scenarios ({a} vs {b})")]
    ScenarioMismatch { a: String, b: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineFile {
    pub format_version: u32,
    pub scenario_fingerprint: String,
    pub timeline: Timeline,
}

impl TimelineFile {
    pub fn new(scenario: &Scenario, timeline: Timeline) -> Self {
        Self {
            format_version: TIMELINE_FORMAT_VERSION,
            scenario_fingerprint: scenario.fingerprint(),
            timeline,
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TimelineError> {
        let path = path.as_ref();
        serde_json::to_writer_pretty(std::fs::File::create(path)?, self)?;
        tracing::debug!(
            path = %path.display(),
            checkpoints = self.timeline.len(),
            "timeline saved"
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TimelineError> {
        let file: Self = serde_json::from_reader(std::fs::File::open(path)?)?;
        if file.format_version != TIMELINE_FORMAT_VERSION {
            return Err(TimelineError::FormatMismatch {
                found: file.format_version,
                expected: TIMELINE_FORMAT_VERSION,
            });
        }
        Ok(file)
    }

    /// Compare against another recording of the same scenario.
    pub fn compare(
        &self,
        other: &TimelineFile,
        tolerance: &Tolerance,
    ) -> Result<Result<Agreement, Divergence>, TimelineError> {
        if self.scenario_fingerprint != other.scenario_fingerprint {
            return Err(TimelineError::ScenarioMismatch {
                a: self.scenario_fingerprint.clone(),
                b: other.scenario_fingerprint.clone(),
            });
        }
        Ok(compare_timelines(&self.timeline, &other.timeline, tolerance))
    }
}
