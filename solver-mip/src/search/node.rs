//! Search node representation.

use std::collections::BTreeMap;

use solver_core::simplex::IterationBudget;
use solver_core::{
    LinearProgram, LpStatus, PresolveOptions, PresolveStatus, Presolver, Range, Scalar,
    StandardForm, Tableau, UndoLog,
};

use crate::cuts::{GomoryGenerator, GomorySettings};
use crate::error::MipResult;
use crate::model::Problem;
use crate::settings::PresolveLevel;

/// One subproblem: the problem's working program under narrower ranges.
///
/// A child is a copy of its parent with one range tightened; nothing else
/// links the two.
#[derive(Debug, Clone)]
pub struct Node<T: Scalar> {
    /// Range override per working column.
    pub ranges: Vec<Range<T>>,

    pub depth: usize,

    /// Relaxation optimum in working columns.
    pub solution: Vec<T>,

    /// Relaxation objective.
    pub optimum: T,

    /// `optimum` as `f64`, for selection heuristics.
    pub approx: f64,

    /// Sum of `min(f, 1 - f)` over fractional integral columns.
    pub infeasibility: f64,

    /// Integral column whose fraction is closest to one half.
    pub most_fractional: Option<usize>,

    /// Fractional part of every fractional non-slack integral column.
    pub fractional: BTreeMap<usize, f64>,

    /// Cuts added while solving this node.
    pub cuts_added: usize,

    /// Objective increase caused by those cuts.
    pub cut_improvement: f64,

    /// Columns removed by this node's own presolve pass.
    removed: UndoLog<T>,
}

impl<T: Scalar> Node<T> {
    /// Root node over the problem's current ranges.
    pub fn root(problem: &Problem<T>) -> Self {
        Self {
            ranges: problem.lp.variables.iter().map(|v| v.range.clone()).collect(),
            depth: 0,
            solution: Vec::new(),
            optimum: T::zero(),
            approx: 0.0,
            infeasibility: 0.0,
            most_fractional: None,
            fractional: BTreeMap::new(),
            cuts_added: 0,
            cut_improvement: 0.0,
            removed: UndoLog::new(),
        }
    }

    /// Copy one level deeper, with the relaxation data cleared.
    pub fn child(&self) -> Self {
        Self {
            ranges: self.ranges.clone(),
            depth: self.depth + 1,
            solution: Vec::new(),
            optimum: self.optimum.clone(),
            approx: self.approx,
            infeasibility: 0.0,
            most_fractional: None,
            fractional: BTreeMap::new(),
            cuts_added: 0,
            cut_improvement: 0.0,
            removed: UndoLog::new(),
        }
    }

    pub fn is_integer_feasible(&self) -> bool {
        self.fractional.is_empty()
    }

    /// Solve the relaxation under this node's ranges, then add Gomory cuts.
    ///
    /// On `Optimal` the solution, objective, and fractional map are set.
    pub fn solve_relaxation(
        &mut self,
        problem: &Problem<T>,
        budget: &mut IterationBudget,
    ) -> MipResult<LpStatus> {
        let mut lp = problem.lp.clone();
        for (var, range) in lp.variables.iter_mut().zip(&self.ranges) {
            var.range = range.clone();
        }
        if lp.variables.iter().any(|v| v.range.is_empty()) {
            return Ok(LpStatus::Infeasible);
        }

        self.removed = UndoLog::new();
        if problem.settings.presolve == PresolveLevel::Full {
            let options = PresolveOptions {
                max_passes: problem.settings.presolve_passes,
            };
            let (status, _) = Presolver::new(&mut lp, &mut self.removed)
                .with_options(options)
                .run();
            match status {
                PresolveStatus::Infeasible => return Ok(LpStatus::Infeasible),
                PresolveStatus::Unbounded => return Ok(LpStatus::Unbounded),
                PresolveStatus::Solved => {
                    let mut x = Vec::new();
                    self.removed.replay(&mut x);
                    self.finish(problem, x, lp.constant.clone());
                    return Ok(LpStatus::Optimal);
                }
                PresolveStatus::Reduced => {}
            }
        }

        let mut tableau = Tableau::new(StandardForm::from_program(&lp)?);
        let status = tableau.optimize(budget);
        if status != LpStatus::Optimal {
            return Ok(status);
        }

        let status = self.add_cuts(&lp, &mut tableau, problem.settings.max_cuts, budget);
        if status != LpStatus::Optimal {
            return Ok(status);
        }

        let mut x = tableau.solution();
        x.truncate(lp.num_vars());
        self.removed.replay(&mut x);
        self.finish(problem, x, tableau.objective_value());
        Ok(LpStatus::Optimal)
    }

    /// Cut rounds until no candidate survives or `max_cuts` were added.
    fn add_cuts(
        &mut self,
        lp: &LinearProgram<T>,
        tableau: &mut Tableau<T>,
        max_cuts: usize,
        budget: &mut IterationBudget,
    ) -> LpStatus {
        let mut generator = GomoryGenerator::new(lp, tableau.num_cols(), GomorySettings::default());
        while self.cuts_added < max_cuts {
            let Some(cut) = generator.generate(tableau) else {
                break;
            };
            let before = tableau.objective_value().to_f64();
            tableau.add_cut(&cut.coefs, cut.rhs.clone());
            generator.record(&cut);
            self.cuts_added += 1;

            let status = tableau.optimize(budget);
            if status != LpStatus::Optimal {
                return status;
            }
            self.cut_improvement += tableau.objective_value().to_f64() - before;
        }
        LpStatus::Optimal
    }

    fn finish(&mut self, problem: &Problem<T>, solution: Vec<T>, optimum: T) {
        self.fractional.clear();
        self.infeasibility = 0.0;
        self.most_fractional = None;

        let mut closest = f64::INFINITY;
        for (j, (x, var)) in solution.iter().zip(&problem.lp.variables).enumerate() {
            if !var.integral || var.slack || x.is_integral() {
                continue;
            }
            let f = x.frac().to_f64();
            self.fractional.insert(j, f);
            self.infeasibility += f.min(1.0 - f);
            let distance = (f - 0.5).abs();
            if distance < closest {
                closest = distance;
                self.most_fractional = Some(j);
            }
        }

        self.approx = optimum.to_f64();
        self.optimum = optimum;
        self.solution = solution;
    }
}
