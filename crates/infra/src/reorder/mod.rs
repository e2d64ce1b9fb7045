//! Automatic reordering of low-stock products.
//!
//! [`ReorderPlanner`] decides (pure), [`ReorderJob`] reads the read models,
//! plans and files orders through a [`ReorderExecutor`], and
//! [`ReorderRunner`] schedules the job on a background thread.

pub mod planner;
pub mod runner;

pub use planner::{DEFAULT_COOLDOWN_HOURS, PlannedOrder, ReorderPlanner, ReorderSnapshot, last_auto_reorders};
pub use runner::{
    ReorderError, ReorderExecutor, ReorderJob, ReorderOutcome, ReorderRunner, ReorderRunnerHandle,
};
