//! Developer tooling: step-size consistency checking for physics backends.
//!
//! # Invariants
//! - Runs execute sequentially; each owns its simulation instance and releases it before the next.
//! - Checkpoints pair by index; positions compare within a tolerance, never exactly.
//! - Skipped, inconclusive, and failed checks are reported distinctly.

pub mod checker;
pub mod compare;
pub mod plan;
pub mod record;
pub mod run;
pub mod scenario;
pub mod timeline;

pub use checker::{CheckConfig, CheckError, CheckReport, TrajectoryConsistencyChecker, Verdict};
pub use compare::{Agreement, Divergence, Tolerance, compare_timelines};
pub use plan::{CheckPlan, PlanError};
pub use record::{TimelineError, TimelineFile};
pub use run::{BackendOp, BackendOpError, RunError, RunLabel, RunPlan, record_run};
pub use scenario::{ObjectPlacement, Scenario};
pub use timeline::{Checkpoint, ObjectState, Timeline};
