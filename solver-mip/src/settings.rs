//! Configuration settings for the MIP solver.

use solver_core::Precision;

/// Branching variable selection rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BranchingRule {
    /// Use pseudocost estimates once both directions of a candidate have
    /// been observed; most fractional until then.
    #[default]
    Pseudocost,

    /// Select variable with fractionality closest to 0.5.
    MostFractional,

    /// Lowest-indexed fractional variable.
    FirstFractional,

    /// Highest-indexed fractional variable.
    LastFractional,
}

/// Node selection strategy for the B&B tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeSelection {
    /// Most recently created node.
    DepthFirst,

    /// Oldest node.
    BreadthFirst,

    /// Node with the smallest relaxation bound.
    BestBound,

    /// Smallest bound plus the degradation extrapolated from the root's
    /// bound-to-infeasibility ratio.
    BestProjection,

    /// Depth-first until the first incumbent, best-bound afterwards.
    #[default]
    Hybrid,
}

/// Where presolve runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresolveLevel {
    Off,

    /// Problem-level presolve plus a node-local pass before every relaxation.
    Full,

    /// Problem-level presolve only.
    #[default]
    RootOnly,
}

/// MIP solver settings.
#[derive(Debug, Clone)]
pub struct MipSettings {
    // === Arithmetic ===
    /// Exact rational pivoting, floating point, or chosen from the input.
    pub precision: Precision,

    // === Termination criteria ===
    /// Maximum number of subproblems to examine (None = unlimited).
    pub node_limit: Option<u64>,

    /// Cumulative simplex iteration limit across all nodes (None = unlimited).
    pub iteration_limit: Option<u64>,

    /// Time limit in milliseconds (None = unlimited).
    pub time_limit_ms: Option<u64>,

    /// Children deeper than this are not created (None = unlimited).
    pub depth_limit: Option<usize>,

    /// Relative optimality gap tolerance.
    /// Stop when (incumbent - bound) / |incumbent| <= gap_tol.
    pub gap_tol: f64,

    // === Search strategy ===
    /// Branching variable selection rule.
    pub branching_rule: BranchingRule,

    /// Node selection strategy.
    pub node_selection: NodeSelection,

    // === Reductions ===
    pub presolve: PresolveLevel,

    /// Pass limit for each presolve run.
    pub presolve_passes: usize,

    /// Gomory cuts added per node relaxation.
    pub max_cuts: usize,

    /// Run the rounding heuristic on fractional nodes.
    pub heuristic: bool,

    // === Output ===
    /// Emit progress lines through `log::info!`.
    pub verbose: bool,

    /// Status lines per second while branching.
    pub report_frequency: f64,
}

impl Default for MipSettings {
    fn default() -> Self {
        Self {
            precision: Precision::default(),

            // Termination
            node_limit: None,
            iteration_limit: None,
            time_limit_ms: None,
            depth_limit: None,
            gap_tol: 0.0,

            // Search
            branching_rule: BranchingRule::default(),
            node_selection: NodeSelection::default(),

            // Reductions
            presolve: PresolveLevel::default(),
            presolve_passes: 100,
            max_cuts: 5,
            heuristic: true,

            // Output
            verbose: false,
            report_frequency: 0.2,
        }
    }
}

impl MipSettings {
    /// Create settings with verbose output enabled.
    pub fn verbose() -> Self {
        Self {
            verbose: true,
            ..Self::default()
        }
    }

    /// Set time limit in seconds.
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit_ms = Some((seconds * 1000.0) as u64);
        self
    }

    /// Set maximum nodes.
    pub fn with_max_nodes(mut self, nodes: u64) -> Self {
        self.node_limit = Some(nodes);
        self
    }

    pub fn with_iteration_limit(mut self, iterations: u64) -> Self {
        self.iteration_limit = Some(iterations);
        self
    }

    pub fn with_depth_limit(mut self, depth: usize) -> Self {
        self.depth_limit = Some(depth);
        self
    }

    /// Set optimality gap tolerance.
    pub fn with_gap_tol(mut self, tol: f64) -> Self {
        self.gap_tol = tol;
        self
    }

    pub fn with_node_selection(mut self, selection: NodeSelection) -> Self {
        self.node_selection = selection;
        self
    }

    pub fn with_branching_rule(mut self, rule: BranchingRule) -> Self {
        self.branching_rule = rule;
        self
    }

    pub fn with_presolve(mut self, level: PresolveLevel) -> Self {
        self.presolve = level;
        self
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_max_cuts(mut self, cuts: usize) -> Self {
        self.max_cuts = cuts;
        self
    }

    pub fn with_heuristic(mut self, enabled: bool) -> Self {
        self.heuristic = enabled;
        self
    }
}
