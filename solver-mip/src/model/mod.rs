//! Problem and solution types for MIP solver.

mod linear;
mod problem;
mod solution;

pub use linear::{ColumnSpec, LinearModel, LinearRow};
pub use problem::Problem;
pub use solution::{relative_gap, Incumbent, IncumbentTracker, MipSolution, MipStats, MipStatus};
