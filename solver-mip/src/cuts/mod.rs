//! Cutting planes for node relaxations.
//!
//! Cuts are node-local: they strengthen one relaxation and are dropped with
//! the node's tableau.

mod gomory;

pub use gomory::{GomoryCut, GomoryGenerator, GomorySettings, GomoryStats};
