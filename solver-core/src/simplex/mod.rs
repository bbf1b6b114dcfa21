//! Bounded-variable two-phase simplex.
//!
//! Solves
//!
//! ```text
//! minimize    c^T x + c0
//! subject to  A x = b,  l <= x <= u
//! ```
//!
//! on a dense tableau. Lower bounds are shifted to zero; a nonbasic variable
//! at its upper bound is handled by complementing it (`x' = u - x`), so upper
//! bounds never become rows.

mod tableau;

pub use tableau::Tableau;

use crate::numeric::Scalar;
use crate::problem::{LinearProgram, ModelError, Relation};

/// Result of one LP solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpStatus {
    Optimal,
    Infeasible,
    Unbounded,
    /// The iteration budget ran out.
    IterationLimit,
    /// Numerical breakdown.
    Error,
}

/// Simplex iteration budget shared across solves.
#[derive(Debug, Clone, Default)]
pub struct IterationBudget {
    limit: Option<u64>,
    used: u64,
}

impl IterationBudget {
    /// `None` means unlimited.
    pub fn new(limit: Option<u64>) -> Self {
        Self { limit, used: 0 }
    }

    pub fn unlimited() -> Self {
        Self::new(None)
    }

    /// Count one iteration; false once the limit is reached.
    pub fn tick(&mut self) -> bool {
        if self.exhausted() {
            return false;
        }
        self.used += 1;
        true
    }

    pub fn exhausted(&self) -> bool {
        self.limit.map_or(false, |l| self.used >= l)
    }

    pub fn used(&self) -> u64 {
        self.used
    }
}

/// Equality-form LP with lower bounds shifted to zero.
#[derive(Debug, Clone)]
pub struct StandardForm<T> {
    /// Row-major coefficients, `m x n`.
    pub a: Vec<Vec<T>>,
    pub b: Vec<T>,
    pub cost: Vec<T>,
    /// Shifted upper bounds (`u - l`), `None` if infinite.
    pub upper: Vec<Option<T>>,
    /// Shift applied to each column.
    pub lower: Vec<T>,
    pub integral: Vec<bool>,
    /// Objective constant including the shift correction.
    pub constant: T,
    /// Columns that came from the program (slacks added here follow them).
    pub program_cols: usize,
}

impl<T: Scalar> StandardForm<T> {
    /// Build from a program, adding a slack for every inequality row.
    ///
    /// Every column needs a finite lower bound.
    pub fn from_program(lp: &LinearProgram<T>) -> Result<Self, ModelError> {
        lp.validate()?;
        let n = lp.num_vars();
        let mut lower = Vec::with_capacity(n);
        let mut upper = Vec::with_capacity(n);
        for (j, var) in lp.variables.iter().enumerate() {
            let l = var.range.lower().cloned().ok_or(ModelError::FreeColumn(j))?;
            upper.push(var.range.upper().map(|u| u.clone() - l.clone()));
            lower.push(l);
        }

        let mut constant = lp.constant.clone();
        for (c, l) in lp.objective.iter().zip(&lower) {
            constant = constant + c.clone() * l.clone();
        }

        let cons = &lp.constraints;
        let mut a = cons.lhs.clone();
        let mut b = Vec::with_capacity(cons.num_rows());
        for (i, row) in cons.lhs.iter().enumerate() {
            let shift = crate::numeric::dot(row, &lower);
            b.push(cons.rhs[i].clone() - shift);
        }

        let mut cost = lp.objective.clone();
        let mut integral: Vec<bool> = lp.variables.iter().map(|v| v.integral).collect();
        let slack_rows: Vec<(usize, Relation)> = cons
            .relations
            .iter()
            .enumerate()
            .filter(|(_, r)| **r != Relation::Eq)
            .map(|(i, r)| (i, *r))
            .collect();
        for (i, rel) in slack_rows {
            let sign = if rel == Relation::Le { T::one() } else { -T::one() };
            for (k, row) in a.iter_mut().enumerate() {
                row.push(if k == i { sign.clone() } else { T::zero() });
            }
            cost.push(T::zero());
            upper.push(None);
            lower.push(T::zero());
            integral.push(false);
        }

        Ok(Self {
            a,
            b,
            cost,
            upper,
            lower,
            integral,
            constant,
            program_cols: n,
        })
    }

    pub fn num_rows(&self) -> usize {
        self.b.len()
    }

    pub fn num_cols(&self) -> usize {
        self.cost.len()
    }
}

/// Solve `lp` from scratch; returns the status, the program-column values, and the objective.
pub fn solve_program<T: Scalar>(
    lp: &LinearProgram<T>,
    budget: &mut IterationBudget,
) -> Result<(LpStatus, Vec<T>, T), ModelError> {
    let sf = StandardForm::from_program(lp)?;
    let cols = sf.program_cols;
    let mut tableau = Tableau::new(sf);
    let status = tableau.optimize(budget);
    let mut x = tableau.solution();
    x.truncate(cols);
    Ok((status, x, tableau.objective_value()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Constraints, Range, Variable};
    use num_rational::BigRational;

    fn scenario_a<T: Scalar>() -> LinearProgram<T> {
        let i = T::from_i64;
        LinearProgram {
            objective: vec![i(1), i(1)],
            constant: T::zero(),
            constraints: Constraints::new(
                vec![vec![i(1), i(2)], vec![i(3), i(1)]],
                vec![i(4), i(6)],
                vec![Relation::Ge, Relation::Ge],
            ),
            variables: vec![
                Variable::continuous(Range::default()),
                Variable::continuous(Range::default()),
            ],
        }
    }

    #[test]
    fn test_vertex_optimum_float() {
        let (status, x, obj) =
            solve_program(&scenario_a::<f64>(), &mut IterationBudget::unlimited()).unwrap();
        assert_eq!(status, LpStatus::Optimal);
        assert!((obj - 2.8).abs() < 1e-9);
        assert!((x[0] - 1.6).abs() < 1e-9);
        assert!((x[1] - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_vertex_optimum_exact() {
        let (status, x, obj) =
            solve_program(&scenario_a::<BigRational>(), &mut IterationBudget::unlimited())
                .unwrap();
        assert_eq!(status, LpStatus::Optimal);
        let q = |n: i64, d: i64| BigRational::new(n.into(), d.into());
        assert_eq!(obj, q(14, 5));
        assert_eq!(x, vec![q(8, 5), q(6, 5)]);
    }

    #[test]
    fn test_upper_bounds_and_flips() {
        // max x + y  s.t.  x + y <= 10, x in [1, 3], y in [2, 4]  =>  x = 3, y = 4
        let lp = LinearProgram {
            objective: vec![-1.0, -1.0],
            constant: 0.0,
            constraints: Constraints::new(vec![vec![1.0, 1.0]], vec![10.0], vec![Relation::Le]),
            variables: vec![
                Variable::continuous(Range::new(Some(1.0), Some(3.0))),
                Variable::continuous(Range::new(Some(2.0), Some(4.0))),
            ],
        };
        let (status, x, obj) = solve_program(&lp, &mut IterationBudget::unlimited()).unwrap();
        assert_eq!(status, LpStatus::Optimal);
        assert!((obj + 7.0).abs() < 1e-9);
        assert!((x[0] - 3.0).abs() < 1e-9);
        assert!((x[1] - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_basic_variable_leaves_at_upper() {
        // min -x - 2y  s.t.  x + y = 4, y <= 3  =>  y = 3, x = 1
        let lp = LinearProgram {
            objective: vec![-1.0, -2.0],
            constant: 0.0,
            constraints: Constraints::new(vec![vec![1.0, 1.0]], vec![4.0], vec![Relation::Eq]),
            variables: vec![
                Variable::continuous(Range::default()),
                Variable::continuous(Range::new(Some(0.0), Some(3.0))),
            ],
        };
        let (status, x, obj) = solve_program(&lp, &mut IterationBudget::unlimited()).unwrap();
        assert_eq!(status, LpStatus::Optimal);
        assert!((obj + 7.0).abs() < 1e-9);
        assert!((x[0] - 1.0).abs() < 1e-9);
        assert!((x[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_infeasible_and_unbounded() {
        let infeasible = LinearProgram {
            objective: vec![1.0],
            constant: 0.0,
            constraints: Constraints::new(
                vec![vec![1.0], vec![1.0]],
                vec![5.0, 2.0],
                vec![Relation::Ge, Relation::Le],
            ),
            variables: vec![Variable::continuous(Range::default())],
        };
        let (status, _, _) =
            solve_program(&infeasible, &mut IterationBudget::unlimited()).unwrap();
        assert_eq!(status, LpStatus::Infeasible);

        let unbounded = LinearProgram {
            objective: vec![-1.0],
            constant: 0.0,
            constraints: Constraints::new(vec![vec![1.0]], vec![1.0], vec![Relation::Ge]),
            variables: vec![Variable::continuous(Range::default())],
        };
        let (status, _, _) =
            solve_program(&unbounded, &mut IterationBudget::unlimited()).unwrap();
        assert_eq!(status, LpStatus::Unbounded);
    }

    #[test]
    fn test_iteration_limit() {
        let mut budget = IterationBudget::new(Some(1));
        let (status, _, _) = solve_program(&scenario_a::<f64>(), &mut budget).unwrap();
        assert_eq!(status, LpStatus::IterationLimit);
        assert!(budget.exhausted());
    }

    #[test]
    fn test_redundant_equality_rows_dropped() {
        // x + y = 2 stated twice.
        let lp = LinearProgram {
            objective: vec![1.0, 2.0],
            constant: 0.0,
            constraints: Constraints::new(
                vec![vec![1.0, 1.0], vec![1.0, 1.0]],
                vec![2.0, 2.0],
                vec![Relation::Eq, Relation::Eq],
            ),
            variables: vec![
                Variable::continuous(Range::default()),
                Variable::continuous(Range::default()),
            ],
        };
        let (status, x, obj) = solve_program(&lp, &mut IterationBudget::unlimited()).unwrap();
        assert_eq!(status, LpStatus::Optimal);
        assert!((obj - 2.0).abs() < 1e-9);
        assert!((x[0] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_free_column_rejected() {
        let lp = LinearProgram {
            objective: vec![1.0],
            constant: 0.0,
            constraints: Constraints::empty(),
            variables: vec![Variable::continuous(Range::free())],
        };
        assert!(matches!(
            StandardForm::from_program(&lp),
            Err(ModelError::FreeColumn(0))
        ));
    }
}
