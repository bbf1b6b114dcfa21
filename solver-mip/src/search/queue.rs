//! Pool of unexplored nodes.

use solver_core::Scalar;

use super::Node;
use crate::settings::NodeSelection;

/// Live nodes in creation order.
///
/// A flat vector: selection scans it, so every strategy sees the same data
/// and ties always resolve to the lowest position.
#[derive(Debug, Clone)]
pub struct NodePool<T: Scalar> {
    nodes: Vec<Node<T>>,
}

impl<T: Scalar> Default for NodePool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> NodePool<T> {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn push(&mut self, node: Node<T>) {
        self.nodes.push(node);
    }

    /// Remove and return the node at `k`, keeping the order of the rest.
    pub fn take(&mut self, k: usize) -> Node<T> {
        self.nodes.remove(k)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Smallest relaxation bound in the pool (`+inf` when empty).
    pub fn best_bound(&self) -> f64 {
        self.nodes
            .iter()
            .map(|n| n.approx)
            .fold(f64::INFINITY, f64::min)
    }

    /// Position of the next node to explore.
    ///
    /// `incumbent` is the incumbent's objective, `root` the root's bound and
    /// infeasibility (used by best projection).
    pub fn select(
        &self,
        strategy: NodeSelection,
        incumbent: Option<f64>,
        root: (f64, f64),
    ) -> Option<usize> {
        if self.nodes.is_empty() {
            return None;
        }
        let last = self.nodes.len() - 1;
        match strategy {
            NodeSelection::BreadthFirst => Some(0),
            NodeSelection::DepthFirst => Some(last),
            NodeSelection::Hybrid if incumbent.is_none() => Some(last),
            NodeSelection::BestBound | NodeSelection::Hybrid => self.argmin(|n| n.approx),
            NodeSelection::BestProjection => {
                let (root_bound, root_infeasibility) = root;
                let slope = if root_infeasibility > 0.0 {
                    (incumbent.unwrap_or(0.0) - root_bound) / root_infeasibility
                } else {
                    0.0
                };
                self.argmin(|n| n.approx + slope * n.infeasibility)
            }
        }
    }

    fn argmin(&self, score: impl Fn(&Node<T>) -> f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (k, node) in self.nodes.iter().enumerate() {
            let s = score(node);
            if best.map_or(true, |(_, b)| s < b) {
                best = Some((k, s));
            }
        }
        best.map(|(k, _)| k)
    }

    /// Drop nodes whose bound cannot beat `incumbent`; returns how many.
    pub fn prune(&mut self, incumbent: &T) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|n| n.optimum < *incumbent);
        before - self.nodes.len()
    }
}
