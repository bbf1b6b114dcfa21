//! MIP problem representation and the solve pipeline.

use solver_core::util::Timer;
use solver_core::{
    LinearProgram, PresolveOptions, PresolveStatus, Presolver, Range, Relation, Scalar, SignType,
    UndoLog, Variable,
};

use super::{relative_gap, Incumbent, MipSolution, MipStats, MipStatus};
use crate::error::{MipError, MipResult};
use crate::search::{BranchAndBound, Node};
use crate::settings::{MipSettings, PresolveLevel};
use solver_core::simplex::{IterationBudget, LpStatus};

/// Mixed-integer problem owned by one solve.
///
/// `lp` is transformed in place: presolved, every column given a finite
/// lower bound, and every row turned into an equality with a slack column.
/// `reference` keeps the presolved program before those transforms, in the
/// structural columns that incumbents are expressed in.
pub struct Problem<T: Scalar> {
    /// Working program the relaxations are built from.
    pub lp: LinearProgram<T>,

    pub settings: MipSettings,

    pub stats: MipStats,

    /// Presolved program with frozen rows, for audits and the heuristic.
    pub(crate) reference: LinearProgram<T>,

    /// Paired column of each split variable part.
    pub(crate) partner: Vec<Option<usize>>,

    /// Columns removed by problem-level presolve.
    removed: UndoLog<T>,

    timer: Timer,

    status: Option<MipStatus>,
    solution: Option<Vec<T>>,
    optimum: Option<T>,
    bound: Option<f64>,
}

impl<T: Scalar> Problem<T> {
    /// Wrap a program; only its shape is checked here.
    pub fn new(lp: LinearProgram<T>, settings: MipSettings) -> MipResult<Self> {
        let n = lp.num_vars();
        if lp.objective.len() != n {
            return Err(MipError::InvalidProblem(format!(
                "objective has {} coefficients, expected {}",
                lp.objective.len(),
                n
            )));
        }
        lp.constraints.validate(n)?;
        Ok(Self {
            reference: lp.clone(),
            lp,
            settings,
            stats: MipStats::default(),
            partner: Vec::new(),
            removed: UndoLog::new(),
            timer: Timer::new(),
            status: None,
            solution: None,
            optimum: None,
            bound: None,
        })
    }

    pub fn status(&self) -> Option<MipStatus> {
        self.status
    }

    /// Best assignment; in the presolved layout until [`Problem::postprocess`] runs.
    pub fn solution(&self) -> Option<&[T]> {
        self.solution.as_deref()
    }

    pub fn optimum(&self) -> Option<&T> {
        self.optimum.as_ref()
    }

    /// Lower bound on the optimum when the search stopped early.
    pub fn bound(&self) -> Option<f64> {
        self.bound
    }

    pub fn timer(&mut self) -> &mut Timer {
        &mut self.timer
    }

    /// Run presolve, the variable transforms, and branch and bound.
    pub fn solve(&mut self) -> MipResult<MipStatus> {
        self.timer = Timer::new();
        if self.settings.verbose {
            log::info!(
                "constraint matrix: {} rows, {} columns",
                self.lp.num_rows(),
                self.lp.num_vars()
            );
        }
        let status = self.run()?;
        self.stats.elapsed_ms = self.timer.elapsed_ms();
        self.status = Some(status);
        Ok(status)
    }

    fn run(&mut self) -> MipResult<MipStatus> {
        if self.lp.variables.iter().any(|v| v.range.is_empty()) {
            return Ok(MipStatus::Infeasible);
        }

        if self.settings.presolve != PresolveLevel::Off {
            let options = PresolveOptions {
                max_passes: self.settings.presolve_passes,
            };
            let (status, stats) = Presolver::new(&mut self.lp, &mut self.removed)
                .with_options(options)
                .run();
            if self.settings.verbose {
                log::info!(
                    "presolve: {} rows and {} columns removed, {} bounds tightened",
                    stats.rows_removed,
                    stats.cols_removed,
                    stats.bounds_tightened
                );
            }
            self.stats.presolve = stats;
            match status {
                PresolveStatus::Infeasible => return Ok(MipStatus::Infeasible),
                PresolveStatus::Unbounded => return Ok(MipStatus::Unbounded),
                PresolveStatus::Solved => {
                    self.solution = Some(Vec::new());
                    self.optimum = Some(self.lp.constant.clone());
                    return Ok(MipStatus::Optimal);
                }
                PresolveStatus::Reduced => {}
            }
        }

        for var in self.lp.variables.iter_mut().filter(|v| v.integral) {
            var.range.round_inward();
            if var.range.is_empty() {
                return Ok(MipStatus::Infeasible);
            }
        }

        self.lp.constraints.freeze();
        self.reference = self.lp.clone();
        self.make_all_vars_bounded_below();
        self.add_slack_variables();

        let mut budget = IterationBudget::new(self.settings.iteration_limit);
        let mut root = Node::root(self);
        let status = root.solve_relaxation(self, &mut budget)?;
        self.stats.nodes_explored += 1;
        self.stats.simplex_iterations = budget.used();
        match status {
            LpStatus::Optimal => {}
            LpStatus::Infeasible => return Ok(MipStatus::Infeasible),
            LpStatus::Unbounded => return Ok(MipStatus::Unbounded),
            LpStatus::IterationLimit => return Ok(MipStatus::IterationLimit),
            LpStatus::Error => {
                return Err(MipError::Internal(
                    "numerical breakdown in the root relaxation".to_string(),
                ))
            }
        }
        if self.settings.verbose {
            log::info!("root relaxation: {:.6}", root.approx);
        }

        let outcome = BranchAndBound::new(self, budget).run(root)?;
        self.bound = outcome.bound;
        if let Some(Incumbent {
            values, objective, ..
        }) = outcome.incumbent
        {
            self.solution = Some(values);
            self.optimum = Some(objective);
        }
        Ok(outcome.status)
    }

    /// Give every column a finite lower bound.
    ///
    /// A column bounded only above is negated. A free column is split into
    /// `x+ - x-` with the negative part appended at the end.
    pub fn make_all_vars_bounded_below(&mut self) {
        let n = self.lp.num_vars();
        self.partner = vec![None; n];
        for j in 0..n {
            self.lp.variables[j].origin = Some(j);
            let range = self.lp.variables[j].range.clone();
            match (range.lower(), range.upper()) {
                (Some(_), _) => {}
                (None, Some(u)) => {
                    for row in &mut self.lp.constraints.lhs {
                        row[j] = -row[j].clone();
                    }
                    self.lp.objective[j] = -self.lp.objective[j].clone();
                    let var = &mut self.lp.variables[j];
                    var.range = Range::new(Some(-u.clone()), None);
                    var.sign = SignType::Negated;
                }
                (None, None) => {
                    let column: Vec<T> = self
                        .lp
                        .constraints
                        .lhs
                        .iter()
                        .map(|row| -row[j].clone())
                        .collect();
                    self.lp.constraints.push_column(&column);
                    self.lp.objective.push(-self.lp.objective[j].clone());

                    let var = &mut self.lp.variables[j];
                    var.range = Range::default();
                    var.sign = SignType::PositivePart;
                    let negative = Variable {
                        integral: var.integral,
                        sign: SignType::NegativePart,
                        origin: Some(j),
                        ..Variable::default()
                    };
                    self.lp.variables.push(negative);
                    let k = self.lp.num_vars() - 1;
                    self.partner[j] = Some(k);
                    self.partner.push(Some(j));
                }
            }
        }
    }

    /// Turn every inequality row into an equality with a slack column.
    ///
    /// A slack is integral when its row, right-hand side, and variables are.
    pub fn add_slack_variables(&mut self) {
        let m = self.lp.num_rows();
        for i in 0..m {
            let relation = self.lp.constraints.relations[i];
            if relation == Relation::Eq {
                continue;
            }
            let integral = self.lp.constraints.rhs[i].is_integral()
                && self.lp.constraints.lhs[i]
                    .iter()
                    .zip(&self.lp.variables)
                    .all(|(a, v)| a.is_zero() || (a.is_integral() && v.integral));

            let mut column = vec![T::zero(); m];
            column[i] = if relation == Relation::Le {
                T::one()
            } else {
                -T::one()
            };
            self.lp.constraints.push_column(&column);
            self.lp.constraints.relations[i] = Relation::Eq;
            self.lp.objective.push(T::zero());
            self.lp.variables.push(Variable {
                integral,
                slack: true,
                ..Variable::default()
            });
            self.partner.push(None);
        }
    }

    /// Map working-column values to structural columns.
    ///
    /// Integral columns within tolerance of an integer are snapped to it.
    pub fn to_structural(&self, working: &[T]) -> Vec<T> {
        let mut values = vec![T::zero(); self.reference.num_vars()];
        for (var, x) in self.lp.variables.iter().zip(working) {
            if var.slack {
                continue;
            }
            if let Some(j) = var.origin {
                values[j] = values[j].clone() + var.sign.coefficient::<T>() * x.clone();
            }
        }
        for (v, var) in values.iter_mut().zip(&self.reference.variables) {
            if var.integral && v.is_integral() {
                *v = v.round();
            }
        }
        values
    }

    /// Check a structural candidate against the frozen rows and the bounds.
    pub fn audit(&self, values: &[T]) -> MipResult<()> {
        if let Some(i) = self.reference.constraints.audit(values) {
            return Err(MipError::Internal(format!(
                "candidate solution violates row {}",
                i
            )));
        }
        let bad = self
            .reference
            .variables
            .iter()
            .zip(values)
            .position(|(var, v)| !var.range.contains(v) || (var.integral && !v.is_integral()));
        match bad {
            Some(j) => Err(MipError::Internal(format!(
                "candidate solution violates the bounds or integrality of column {}",
                j
            ))),
            None => Ok(()),
        }
    }

    /// Objective of a structural assignment.
    pub fn structural_objective(&self, values: &[T]) -> T {
        self.reference.objective_value(values)
    }

    /// Expand the solution to the input layout; a second call does nothing.
    pub fn postprocess(&mut self) {
        if let Some(values) = self.solution.as_mut() {
            self.removed.replay(values);
        }
    }

    /// Caller-facing result, still in minimisation sense.
    pub fn to_solution(&self) -> MipSolution {
        let status = self.status.unwrap_or(MipStatus::Infeasible);
        let objective = self.optimum.as_ref().map(Scalar::to_number);
        let gap = match (&self.optimum, self.bound) {
            (Some(opt), Some(bound)) => Some(relative_gap(opt.to_f64(), bound).max(0.0)),
            _ => None,
        };
        MipSolution {
            status,
            x: self
                .solution
                .as_ref()
                .map(|x| x.iter().map(Scalar::to_number).collect())
                .unwrap_or_default(),
            objective,
            bound: self.bound,
            gap,
            stats: self.stats.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solver_core::Constraints;

    fn program(variables: Vec<Variable<f64>>) -> LinearProgram<f64> {
        LinearProgram {
            objective: vec![1.0, 2.0],
            constant: 0.0,
            constraints: Constraints::new(
                vec![vec![1.0, 1.0], vec![2.0, -1.0]],
                vec![4.0, 1.5],
                vec![Relation::Le, Relation::Ge],
            ),
            variables,
        }
    }

    #[test]
    fn test_negate_and_split() {
        let lp = program(vec![
            Variable::integer(Range::new(None, Some(3.0))),
            Variable::continuous(Range::free()),
        ]);
        let mut p = Problem::new(lp, MipSettings::default()).unwrap();
        p.make_all_vars_bounded_below();

        assert_eq!(p.lp.num_vars(), 3);
        assert_eq!(p.lp.variables[0].sign, SignType::Negated);
        assert_eq!(p.lp.variables[0].range.lower(), Some(&-3.0));
        assert_eq!(p.lp.objective, vec![-1.0, 2.0, -2.0]);
        assert_eq!(p.lp.constraints.lhs[0], vec![-1.0, 1.0, -1.0]);
        assert_eq!(p.partner, vec![None, Some(2), Some(1)]);

        // x0 = -(-2), x1 = 0.5 - 1.5
        assert_eq!(p.to_structural(&[-2.0, 0.5, 1.5]), vec![2.0, -1.0]);
    }

    #[test]
    fn test_slack_integrality() {
        let lp = program(vec![
            Variable::integer(Range::default()),
            Variable::integer(Range::default()),
        ]);
        let mut p = Problem::new(lp, MipSettings::default()).unwrap();
        p.make_all_vars_bounded_below();
        p.add_slack_variables();

        assert_eq!(p.lp.num_vars(), 4);
        assert!(p.lp.constraints.relations.iter().all(|r| *r == Relation::Eq));
        assert_eq!(p.lp.constraints.lhs[0], vec![1.0, 1.0, 1.0, 0.0]);
        assert_eq!(p.lp.constraints.lhs[1], vec![2.0, -1.0, 0.0, -1.0]);
        // 1.5 on the right-hand side makes the second slack continuous.
        assert!(p.lp.variables[2].integral);
        assert!(!p.lp.variables[3].integral);
        assert!(p.lp.variables[2].slack);
    }

    #[test]
    fn test_audit_uses_frozen_rows() {
        let lp = program(vec![
            Variable::continuous(Range::default()),
            Variable::continuous(Range::default()),
        ]);
        let mut p = Problem::new(lp, MipSettings::default()).unwrap();
        p.lp.constraints.freeze();
        p.reference = p.lp.clone();
        p.add_slack_variables();

        assert!(p.audit(&[1.0, 0.5]).is_ok());
        assert!(matches!(p.audit(&[0.0, 0.0]), Err(MipError::Internal(_))));
    }

    #[test]
    fn test_shape_checked() {
        let mut lp = program(vec![Variable::default(), Variable::default()]);
        lp.objective.pop();
        assert!(matches!(
            Problem::new(lp, MipSettings::default()),
            Err(MipError::InvalidProblem(_))
        ));
    }
}
