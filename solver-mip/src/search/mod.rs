//! Branch-and-bound search tree management.

mod branching;
mod node;
mod queue;
mod tree;

pub use branching::{pseudocost_score, select_variable};
pub use node::Node;
pub use queue::NodePool;
pub use tree::{BranchAndBound, SearchOutcome};
