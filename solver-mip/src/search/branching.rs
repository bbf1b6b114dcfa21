//! Branching variable selection.

use solver_core::{Scalar, Variable};

use super::Node;
use crate::settings::BranchingRule;

/// Weight of the larger per-direction estimate in the pseudocost score.
const PSEUDOCOST_WEIGHT: f64 = 0.1667;

/// Pseudocost score of a column with fractional part `f`.
///
/// Zero until both directions have been observed.
pub fn pseudocost_score<T: Scalar>(var: &Variable<T>, f: f64) -> f64 {
    if !var.has_pseudocosts() {
        return 0.0;
    }
    let down = f * var.pseudocost[0];
    let up = (1.0 - f) * var.pseudocost[1];
    (1.0 - PSEUDOCOST_WEIGHT) * down.min(up) + PSEUDOCOST_WEIGHT * down.max(up)
}

/// Column to branch on at `node`, `None` if the node is integer feasible.
pub fn select_variable<T: Scalar>(
    node: &Node<T>,
    variables: &[Variable<T>],
    rule: BranchingRule,
) -> Option<usize> {
    match rule {
        BranchingRule::Pseudocost => {
            let mut best: Option<(usize, f64)> = None;
            for (&j, &f) in &node.fractional {
                let score = pseudocost_score(&variables[j], f);
                // Any unscored candidate: fall back to most fractional.
                if score <= 0.0 {
                    return node.most_fractional;
                }
                if best.map_or(true, |(_, b)| score > b) {
                    best = Some((j, score));
                }
            }
            best.map(|(j, _)| j)
        }
        BranchingRule::MostFractional => node.most_fractional,
        BranchingRule::FirstFractional => node.fractional.keys().next().copied(),
        BranchingRule::LastFractional => node.fractional.keys().next_back().copied(),
    }
}
