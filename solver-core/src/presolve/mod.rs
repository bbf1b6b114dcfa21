//! Presolve.
//!
//! Row and column reductions applied to a [`LinearProgram`] until a fixed
//! point. Every removed column is recorded in an [`UndoLog`] so the reduced
//! solution can be expanded back.
//!
//! Each pass runs, in order: empty rows, singleton rows, activity-based row
//! checks (infeasibility, redundancy, forcing rows), free column singletons,
//! bound tightening, integral rounding, fixed-variable elimination, and empty
//! columns.

pub mod bounds;
pub mod eliminate;
pub mod singleton;

use crate::numeric::Scalar;
use crate::postsolve::UndoLog;
use crate::problem::LinearProgram;

/// Outcome of presolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresolveStatus {
    /// Reductions applied, a (possibly smaller) problem remains.
    Reduced,
    /// No point satisfies the rows and bounds.
    Infeasible,
    /// An unconstrained column can improve the objective without limit.
    Unbounded,
    /// Every column was eliminated; the undo log alone yields the solution.
    Solved,
}

/// Presolve configuration.
#[derive(Debug, Clone)]
pub struct PresolveOptions {
    /// Upper limit on reduction passes.
    pub max_passes: usize,
}

impl Default for PresolveOptions {
    fn default() -> Self {
        Self { max_passes: 100 }
    }
}

/// Reduction counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresolveStats {
    pub passes: usize,
    pub rows_removed: usize,
    pub cols_removed: usize,
    pub bounds_tightened: usize,
}

/// Terminal findings that stop a pass early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    Infeasible,
    Unbounded,
}

/// `Ok(changed)` or a terminal verdict.
pub(crate) type Step = Result<bool, Verdict>;

/// Fixed-point presolve driver over a borrowed program.
pub struct Presolver<'a, T: Scalar> {
    pub(crate) lp: &'a mut LinearProgram<T>,
    pub(crate) log: &'a mut UndoLog<T>,
    options: PresolveOptions,
    pub(crate) stats: PresolveStats,
}

impl<'a, T: Scalar> Presolver<'a, T> {
    pub fn new(lp: &'a mut LinearProgram<T>, log: &'a mut UndoLog<T>) -> Self {
        Self {
            lp,
            log,
            options: PresolveOptions::default(),
            stats: PresolveStats::default(),
        }
    }

    pub fn with_options(mut self, options: PresolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Run passes until nothing changes or the pass limit is hit.
    pub fn run(mut self) -> (PresolveStatus, PresolveStats) {
        let status = loop {
            if self.stats.passes >= self.options.max_passes {
                break self.reduced_status();
            }
            self.stats.passes += 1;
            match self.pass() {
                Ok(true) => continue,
                Ok(false) => break self.reduced_status(),
                Err(Verdict::Infeasible) => break PresolveStatus::Infeasible,
                Err(Verdict::Unbounded) => break PresolveStatus::Unbounded,
            }
        };
        log::debug!(
            "presolve: {:?} after {} passes, {} rows and {} columns removed, {} bounds tightened",
            status,
            self.stats.passes,
            self.stats.rows_removed,
            self.stats.cols_removed,
            self.stats.bounds_tightened
        );
        (status, self.stats)
    }

    fn pass(&mut self) -> Step {
        let mut changed = self.remove_empty_rows()?;
        changed |= self.remove_singleton_rows()?;
        changed |= self.check_row_activities()?;
        changed |= self.eliminate_free_column_singletons()?;
        changed |= self.tighten_bounds()?;
        changed |= self.round_integral_bounds()?;
        changed |= self.eliminate_fixed_columns()?;
        changed |= self.eliminate_empty_columns()?;
        Ok(changed)
    }

    fn reduced_status(&self) -> PresolveStatus {
        if self.lp.num_vars() == 0 && self.lp.num_rows() == 0 {
            PresolveStatus::Solved
        } else {
            PresolveStatus::Reduced
        }
    }

    /// Tighten one variable and fail if its range becomes empty.
    pub(crate) fn tighten(&mut self, j: usize, lower: Option<T>, upper: Option<T>) -> Step {
        let range = &mut self.lp.variables[j].range;
        let mut changed = false;
        if let Some(l) = lower {
            changed |= range.tighten_lower(l);
        }
        if let Some(u) = upper {
            changed |= range.tighten_upper(u);
        }
        if range.is_empty() {
            return Err(Verdict::Infeasible);
        }
        if changed {
            self.stats.bounds_tightened += 1;
        }
        Ok(changed)
    }

    pub(crate) fn remove_row(&mut self, i: usize) {
        self.lp.constraints.remove_row(i);
        self.stats.rows_removed += 1;
    }

    /// Remove column `j`, recording its variable for postsolve.
    pub(crate) fn remove_column(&mut self, j: usize) {
        let var = self.lp.remove_column(j);
        self.log.push(j, var);
        self.stats.cols_removed += 1;
    }
}

/// Presolve `lp` in place with default options.
pub fn presolve<T: Scalar>(
    lp: &mut LinearProgram<T>,
    log: &mut UndoLog<T>,
) -> (PresolveStatus, PresolveStats) {
    Presolver::new(lp, log).run()
}
