//! MIP solution types.

use solver_core::{Number, PresolveStats, Scalar};

/// Status of the MIP solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MipStatus {
    /// Optimal solution found.
    Optimal,

    /// Problem is infeasible.
    Infeasible,

    /// Problem is unbounded.
    Unbounded,

    /// Node limit reached, best solution returned.
    NodeLimit,

    /// Simplex iteration limit reached, best solution returned.
    IterationLimit,

    /// Time limit reached, best solution returned.
    TimeLimit,

    /// Some subtrees were cut off by the depth limit.
    DepthLimit,

    /// Gap limit reached (solution within gap_tol of optimal).
    GapLimit,
}

impl MipStatus {
    /// Returns true if optimality was proven.
    pub fn is_optimal(&self) -> bool {
        matches!(self, MipStatus::Optimal)
    }

    /// Returns true if the search stopped on a configured limit.
    pub fn is_limit(&self) -> bool {
        matches!(
            self,
            MipStatus::NodeLimit
                | MipStatus::IterationLimit
                | MipStatus::TimeLimit
                | MipStatus::DepthLimit
                | MipStatus::GapLimit
        )
    }
}

/// Running counters of one solve.
#[derive(Debug, Clone, Default)]
pub struct MipStats {
    /// Subproblems whose relaxation was solved (root included).
    pub nodes_explored: u64,

    /// Nodes discarded by bound or infeasibility.
    pub nodes_pruned: u64,

    /// Largest size of the node pool.
    pub max_active_nodes: usize,

    pub max_depth: usize,

    /// Simplex iterations across all relaxations.
    pub simplex_iterations: u64,

    pub cuts_added: u64,

    /// Sum of relaxation bound increases caused by cuts.
    pub cut_improvement: f64,

    pub heuristic_successes: u64,

    pub incumbent_updates: u64,

    pub presolve: PresolveStats,

    pub elapsed_ms: u64,
}

/// Complete MIP solution with diagnostics.
#[derive(Debug, Clone)]
pub struct MipSolution {
    /// Solve status.
    pub status: MipStatus,

    /// Best assignment found, empty if none.
    pub x: Vec<Number>,

    /// Objective value of `x`.
    pub objective: Option<Number>,

    /// Best bound on the optimum when the search stopped early.
    pub bound: Option<f64>,

    /// Relative gap between `objective` and `bound`.
    pub gap: Option<f64>,

    pub stats: MipStats,
}

impl MipSolution {
    /// A solution carrying only a status.
    pub fn empty(status: MipStatus) -> Self {
        Self {
            status,
            x: Vec::new(),
            objective: None,
            bound: None,
            gap: None,
            stats: MipStats::default(),
        }
    }

    /// Returns true if a feasible assignment is attached.
    pub fn has_solution(&self) -> bool {
        self.objective.is_some()
    }

    /// Objective as `f64`, if any.
    pub fn objective_f64(&self) -> Option<f64> {
        self.objective.as_ref().map(Number::to_f64)
    }

    /// Assignment as `f64`.
    pub fn values_f64(&self) -> Vec<f64> {
        self.x.iter().map(Number::to_f64).collect()
    }
}

/// Relative gap `(incumbent - bound) / |incumbent|`, or `-bound` when the
/// incumbent is zero.
pub fn relative_gap(incumbent: f64, bound: f64) -> f64 {
    if incumbent == 0.0 {
        -bound
    } else {
        (incumbent - bound) / incumbent.abs()
    }
}

/// One integer-feasible point.
#[derive(Debug, Clone)]
pub struct Incumbent<T> {
    /// Values in structural (post-presolve, pre-transform) columns.
    pub values: Vec<T>,
    pub objective: T,
    pub approx: f64,
}

/// Tracks the best integer-feasible point.
#[derive(Debug, Clone)]
pub struct IncumbentTracker<T> {
    best: Option<Incumbent<T>>,
    pub update_count: u64,
}

impl<T: Scalar> Default for IncumbentTracker<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> IncumbentTracker<T> {
    pub fn new() -> Self {
        Self {
            best: None,
            update_count: 0,
        }
    }

    pub fn has_incumbent(&self) -> bool {
        self.best.is_some()
    }

    pub fn best(&self) -> Option<&Incumbent<T>> {
        self.best.as_ref()
    }

    pub fn objective(&self) -> Option<&T> {
        self.best.as_ref().map(|b| &b.objective)
    }

    pub fn approx(&self) -> Option<f64> {
        self.best.as_ref().map(|b| b.approx)
    }

    /// Whether `value` cannot beat the incumbent.
    pub fn dominates(&self, value: &T) -> bool {
        self.objective().map_or(false, |best| *value >= *best)
    }

    /// Keep `values` if strictly better. Returns true on improvement.
    pub fn update(&mut self, values: Vec<T>, objective: T) -> bool {
        if self.dominates(&objective) {
            return false;
        }
        let approx = objective.to_f64();
        self.best = Some(Incumbent {
            values,
            objective,
            approx,
        });
        self.update_count += 1;
        true
    }

    pub fn take(&mut self) -> Option<Incumbent<T>> {
        self.best.take()
    }
}
