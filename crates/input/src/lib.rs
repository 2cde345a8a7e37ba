//! Input mapping: key symbols to discrete agent actions.
//!
//! # Invariants
//! - Dispatch is a static table lookup; nothing is queued.
//! - Unbound keys map to `Action::Noop`.

pub mod action;
pub mod keymap;

pub use action::{Action, AgentAction};
pub use keymap::{dispatch, Key, ParseKeyError, BINDINGS};
