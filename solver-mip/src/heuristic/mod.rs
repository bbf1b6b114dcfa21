//! Primal heuristics.

mod rounding;

pub use rounding::round_and_repair;
