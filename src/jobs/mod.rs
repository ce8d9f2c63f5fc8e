//! Job graph management.
//!
//! Jobs form a dependency graph through their `needs` lists. The manager:
//! - Rejects empty and duplicate names on insertion
//! - Validates that dependencies exist and contain no cycle
//! - Computes a deterministic execution order
//! - Renders a `jobs:` block in alphabetical job order

mod manager;
mod render;
mod steps;
mod types;

pub use manager::JobManager;
pub use render::{RenderOptions, DEFAULT_IF_FOLD_THRESHOLD};
pub use steps::extract_step_name;
pub use types::{Job, JobBody, WorkflowCall};
