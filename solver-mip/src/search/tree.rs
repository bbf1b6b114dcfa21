//! Branch-and-bound tree controller.

use solver_core::simplex::IterationBudget;
use solver_core::{BranchDirection, LpStatus, Scalar};

use super::{select_variable, Node, NodePool};
use crate::error::{MipError, MipResult};
use crate::heuristic::round_and_repair;
use crate::model::{relative_gap, Incumbent, IncumbentTracker, MipStatus, Problem};

/// How the search ended.
#[derive(Debug, Clone)]
pub struct SearchOutcome<T> {
    pub status: MipStatus,

    /// Best point, in structural columns.
    pub incumbent: Option<Incumbent<T>>,

    /// Lower bound over the unexplored nodes, if any remain.
    pub bound: Option<f64>,
}

/// Branch-and-bound tree controller.
///
/// Owns the node pool and the incumbent; borrows the problem for the
/// relaxations, the pseudocosts, and the statistics.
pub struct BranchAndBound<'a, T: Scalar> {
    problem: &'a mut Problem<T>,

    pool: NodePool<T>,

    pub incumbent: IncumbentTracker<T>,

    /// Iterations are counted across every relaxation.
    budget: IterationBudget,

    /// Root bound and infeasibility, for best projection.
    root: (f64, f64),

    /// Set when a child was skipped for being too deep.
    depth_limited: bool,
}

impl<'a, T: Scalar> BranchAndBound<'a, T> {
    pub fn new(problem: &'a mut Problem<T>, budget: IterationBudget) -> Self {
        Self {
            problem,
            pool: NodePool::new(),
            incumbent: IncumbentTracker::new(),
            budget,
            root: (0.0, 0.0),
            depth_limited: false,
        }
    }

    /// Search from a solved root node.
    pub fn run(mut self, root: Node<T>) -> MipResult<SearchOutcome<T>> {
        self.root = (root.approx, root.infeasibility);
        self.problem.stats.cuts_added += root.cuts_added as u64;
        self.problem.stats.cut_improvement += root.cut_improvement;

        if root.is_integer_feasible() {
            self.accept(&root)?;
        } else {
            self.try_heuristic(&root);
            self.pool.push(root);
        }

        let limit = loop {
            if self.pool.is_empty() {
                break None;
            }
            if let Some(status) = self.check_limits() {
                break Some(status);
            }
            let stats = &mut self.problem.stats;
            stats.max_active_nodes = stats.max_active_nodes.max(self.pool.len());

            if let Some(status) = self.check_gap() {
                break Some(status);
            }

            let strategy = self.problem.settings.node_selection;
            let Some(k) = self.pool.select(strategy, self.incumbent.approx(), self.root) else {
                break None;
            };
            let node = self.pool.take(k);
            if let Some(status) = self.branch(&node)? {
                // The reported bound covers the unfinished node.
                self.pool.push(node);
                break Some(status);
            }

            self.report_progress();
        };

        let status = match limit {
            Some(status) => status,
            None if self.depth_limited => MipStatus::DepthLimit,
            None if self.incumbent.has_incumbent() => MipStatus::Optimal,
            None => MipStatus::Infeasible,
        };
        self.problem.stats.simplex_iterations = self.budget.used();
        self.problem.stats.incumbent_updates = self.incumbent.update_count;

        let bound = if self.pool.is_empty() {
            self.incumbent.approx()
        } else {
            Some(self.pool.best_bound())
        };
        if self.problem.settings.verbose {
            let stats = &self.problem.stats;
            log::info!(
                "{} subproblems examined, max tree size {}, {} cuts applied",
                stats.nodes_explored,
                stats.max_active_nodes,
                stats.cuts_added
            );
        }
        Ok(SearchOutcome {
            status,
            incumbent: self.incumbent.take(),
            bound,
        })
    }

    /// Node, iteration, and time limits.
    fn check_limits(&mut self) -> Option<MipStatus> {
        let settings = &self.problem.settings;
        if settings
            .node_limit
            .map_or(false, |l| self.problem.stats.nodes_explored >= l)
        {
            return Some(MipStatus::NodeLimit);
        }
        if self.budget.exhausted() {
            return Some(MipStatus::IterationLimit);
        }
        let limit = settings.time_limit_ms;
        if self.problem.timer().exceeded(limit) {
            return Some(MipStatus::TimeLimit);
        }
        None
    }

    /// Stop once the incumbent is within the gap tolerance of the pool's bound.
    fn check_gap(&self) -> Option<MipStatus> {
        let incumbent = self.incumbent.approx()?;
        let gap = relative_gap(incumbent, self.pool.best_bound());
        let tol = self.problem.settings.gap_tol;
        if gap > tol {
            return None;
        }
        if gap <= 0.0 {
            return Some(MipStatus::Optimal);
        }
        if self.problem.settings.verbose {
            log::warn!("stopping at gap {:.4}% (tolerance {:.4}%)", gap * 100.0, tol * 100.0);
        }
        Some(MipStatus::GapLimit)
    }

    /// Create, solve, and file both children of `node`.
    ///
    /// Returns a status when a limit stops the search mid-branch.
    fn branch(&mut self, node: &Node<T>) -> MipResult<Option<MipStatus>> {
        let rule = self.problem.settings.branching_rule;
        let Some(j) = select_variable(node, &self.problem.lp.variables, rule) else {
            return Ok(None);
        };
        let value = node.solution[j].clone();
        let fraction = node.fractional.get(&j).copied().unwrap_or(0.5);
        let mut improved = false;

        for dir in BranchDirection::BOTH {
            if let Some(limit) = self.problem.settings.depth_limit {
                if node.depth + 1 > limit {
                    if !self.depth_limited {
                        log::warn!("depth limit {} reached, subtrees are skipped", limit);
                    }
                    self.depth_limited = true;
                    continue;
                }
            }

            let mut child = node.child();
            match dir {
                BranchDirection::Down => {
                    child.ranges[j].tighten_upper(value.floor());
                }
                BranchDirection::Up => {
                    let lower = value.ceil();
                    if lower.is_positive() {
                        if let Some(p) = self.problem.partner[j] {
                            child.ranges[p].tighten_upper(T::zero());
                        }
                    }
                    child.ranges[j].tighten_lower(lower);
                }
            }

            self.problem.stats.nodes_explored += 1;
            let status = child.solve_relaxation(self.problem, &mut self.budget)?;
            self.problem.stats.cuts_added += child.cuts_added as u64;
            self.problem.stats.cut_improvement += child.cut_improvement;
            match status {
                LpStatus::Optimal => {}
                LpStatus::Infeasible => {
                    self.problem.stats.nodes_pruned += 1;
                    continue;
                }
                LpStatus::IterationLimit => return Ok(Some(MipStatus::IterationLimit)),
                LpStatus::Unbounded => {
                    return Err(MipError::Internal(
                        "unbounded relaxation below a bounded root".to_string(),
                    ))
                }
                LpStatus::Error => {
                    return Err(MipError::Internal(
                        "numerical breakdown in a node relaxation".to_string(),
                    ))
                }
            }

            let share = match dir {
                BranchDirection::Down => fraction,
                BranchDirection::Up => 1.0 - fraction,
            };
            let delta = (child.approx - node.approx).abs();
            self.problem.lp.variables[j].update_pseudocost(delta, share, dir);

            let stats = &mut self.problem.stats;
            stats.max_depth = stats.max_depth.max(child.depth);

            if self.incumbent.dominates(&child.optimum) {
                self.problem.stats.nodes_pruned += 1;
                continue;
            }
            if child.is_integer_feasible() {
                improved |= self.accept(&child)?;
                continue;
            }
            improved |= self.try_heuristic(&child);
            if self.incumbent.dominates(&child.optimum) {
                self.problem.stats.nodes_pruned += 1;
                continue;
            }
            self.pool.push(child);
        }

        if improved {
            if let Some(best) = self.incumbent.objective() {
                self.problem.stats.nodes_pruned += self.pool.prune(best) as u64;
            }
        }
        Ok(None)
    }

    /// Offer an integer-feasible node as incumbent.
    ///
    /// The point is audited first; a violation means a bug upstream.
    fn accept(&mut self, node: &Node<T>) -> MipResult<bool> {
        let values = self.problem.to_structural(&node.solution);
        self.problem.audit(&values)?;
        let objective = self.problem.structural_objective(&values);
        Ok(self.offer(values, objective))
    }

    /// Round the node's relaxation and offer the repaired point.
    fn try_heuristic(&mut self, node: &Node<T>) -> bool {
        if !self.problem.settings.heuristic {
            return false;
        }
        let structural = self.problem.to_structural(&node.solution);
        let Some(values) = round_and_repair(&self.problem.reference, &structural) else {
            return false;
        };
        let objective = self.problem.structural_objective(&values);
        let improved = self.offer(values, objective);
        if improved {
            self.problem.stats.heuristic_successes += 1;
        }
        improved
    }

    fn offer(&mut self, values: Vec<T>, objective: T) -> bool {
        let improved = self.incumbent.update(values, objective);
        if improved && self.problem.settings.verbose {
            if let Some(best) = self.incumbent.objective() {
                log::info!("new incumbent: {}", best);
            }
        }
        improved
    }

    fn report_progress(&mut self) {
        let settings = &self.problem.settings;
        if !settings.verbose {
            return;
        }
        let frequency = settings.report_frequency;
        if !self.problem.timer().report_due(frequency) {
            return;
        }
        let bound = self.pool.best_bound();
        let gap = self
            .incumbent
            .approx()
            .map_or(f64::INFINITY, |inc| relative_gap(inc, bound));
        log::info!(
            "{} nodes active, bound: {:.6}, gap: {:.2}%",
            self.pool.len(),
            bound,
            gap * 100.0
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MipSettings;
    use solver_core::{Constraints, LinearProgram, Range, Relation, Variable};

    /// max 5a + 4b + 3c  s.t.  2a + 3b + c <= 5, 4a + b + 2c <= 11, 3a + 4b + 2c <= 8
    fn knapsack(settings: MipSettings) -> Problem<f64> {
        let lp = LinearProgram {
            objective: vec![-5.0, -4.0, -3.0],
            constant: 0.0,
            constraints: Constraints::new(
                vec![
                    vec![2.0, 3.0, 1.0],
                    vec![4.0, 1.0, 2.0],
                    vec![3.0, 4.0, 2.0],
                ],
                vec![5.0, 11.0, 8.0],
                vec![Relation::Le, Relation::Le, Relation::Le],
            ),
            variables: vec![Variable::integer(Range::new(Some(0.0), Some(1.0))); 3],
        };
        Problem::new(lp, settings.with_max_cuts(0).with_heuristic(false)).unwrap()
    }

    #[test]
    fn test_tree_reaches_optimum() {
        let mut p = knapsack(MipSettings::default());
        assert_eq!(p.solve().unwrap(), MipStatus::Optimal);
        // a = b = 1
        assert!((p.optimum().unwrap() + 9.0).abs() < 1e-9);
        assert!(p.stats.incumbent_updates >= 1);
        assert!(p.stats.nodes_explored > 1);
    }

    #[test]
    fn test_node_limit_keeps_status() {
        let lp = LinearProgram {
            objective: vec![-1.0, -1.0],
            constant: 0.0,
            constraints: Constraints::new(
                vec![vec![2.0, 2.0]],
                vec![3.0],
                vec![Relation::Le],
            ),
            variables: vec![Variable::integer(Range::new(Some(0.0), Some(5.0))); 2],
        };
        let settings = MipSettings::default()
            .with_max_nodes(1)
            .with_max_cuts(0)
            .with_heuristic(false)
            .with_presolve(crate::settings::PresolveLevel::Off);
        let mut p = Problem::new(lp, settings).unwrap();
        assert_eq!(p.solve().unwrap(), MipStatus::NodeLimit);
        assert!(p.optimum().is_none());
        assert_eq!(p.bound(), Some(-1.5));
    }

    #[test]
    fn test_depth_limit_flagged() {
        let lp = LinearProgram {
            objective: vec![-1.0, -1.0],
            constant: 0.0,
            constraints: Constraints::new(
                vec![vec![2.0, 2.0]],
                vec![3.0],
                vec![Relation::Le],
            ),
            variables: vec![Variable::integer(Range::new(Some(0.0), Some(5.0))); 2],
        };
        let settings = MipSettings::default()
            .with_depth_limit(0)
            .with_max_cuts(0)
            .with_heuristic(false)
            .with_presolve(crate::settings::PresolveLevel::Off);
        let mut p = Problem::new(lp, settings).unwrap();
        assert_eq!(p.solve().unwrap(), MipStatus::DepthLimit);
        assert!(p.optimum().is_none());
    }
}
