//! Access gating
//!
//! [`AccessStateMachine`] turns per-frame face matches into `Locked` /
//! `Unlocked` transitions with a grace period, [`Monitor`] drives it from a
//! frame source on a single thread and reports transitions over a channel,
//! and [`AccessLog`] keeps the persisted record of unlocks.

mod access_log;
mod distance;
mod monitor;
mod state_machine;

pub use access_log::*;
pub use distance::*;
pub use monitor::*;
pub use state_machine::*;
