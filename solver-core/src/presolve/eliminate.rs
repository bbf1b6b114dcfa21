//! Column elimination: fixed variables, empty columns, free column singletons.

use super::bounds::Activity;
use super::{Presolver, Step, Verdict};
use crate::numeric::Scalar;
use crate::problem::{Relation, Substitution};

impl<'a, T: Scalar> Presolver<'a, T> {
    /// Substitute variables with `lower == upper` by their value.
    pub(crate) fn eliminate_fixed_columns(&mut self) -> Step {
        let mut changed = false;
        let mut j = self.lp.num_vars();
        while j > 0 {
            j -= 1;
            let var = &self.lp.variables[j];
            if !var.range.is_fixed() {
                continue;
            }
            let Some(value) = var.range.lower().cloned() else {
                continue;
            };
            let value = if var.integral { value.round() } else { value };
            self.remove_at_value(j, value);
            changed = true;
        }
        Ok(changed)
    }

    /// Fix variables that appear in no row at their objective-optimal bound.
    pub(crate) fn eliminate_empty_columns(&mut self) -> Step {
        let mut changed = false;
        let mut j = self.lp.num_vars();
        while j > 0 {
            j -= 1;
            if self.lp.constraints.column_count(j) > 0 {
                continue;
            }
            let c = &self.lp.objective[j];
            let range = &self.lp.variables[j].range;
            let value = if c.is_pos() {
                range.lower().cloned().ok_or(Verdict::Unbounded)?
            } else if c.is_neg() {
                range.upper().cloned().ok_or(Verdict::Unbounded)?
            } else {
                match (range.lower(), range.upper()) {
                    (Some(l), _) => l.clone(),
                    (None, Some(u)) if u.is_negative() => u.clone(),
                    _ => T::zero(),
                }
            };
            self.remove_at_value(j, value);
            changed = true;
        }
        Ok(changed)
    }

    fn remove_at_value(&mut self, j: usize, value: T) {
        for (row, b) in self
            .lp
            .constraints
            .lhs
            .iter()
            .zip(self.lp.constraints.rhs.iter_mut())
        {
            if !row[j].is_zero() {
                *b = b.clone() - row[j].clone() * value.clone();
            }
        }
        self.lp.constant = self.lp.constant.clone() + self.lp.objective[j].clone() * value.clone();
        self.lp.variables[j].substitution = Some(Substitution::Constant(value));
        self.remove_column(j);
    }

    /// Eliminate continuous variables that occur in a single equality row and
    /// whose bounds are implied by that row.
    pub(crate) fn eliminate_free_column_singletons(&mut self) -> Step {
        let mut changed = false;
        while let Some((i, j)) = self.find_free_column_singleton() {
            self.substitute_out(i, j);
            changed = true;
        }
        Ok(changed)
    }

    fn find_free_column_singleton(&self) -> Option<(usize, usize)> {
        let cons = &self.lp.constraints;
        for (j, var) in self.lp.variables.iter().enumerate() {
            if var.integral {
                continue;
            }
            let mut rows = (0..cons.num_rows()).filter(|&i| !cons.lhs[i][j].is_negligible());
            let (Some(i), None) = (rows.next(), rows.next()) else {
                continue;
            };
            if cons.relations[i] != Relation::Eq {
                continue;
            }
            if self.implied_free(i, j) {
                return Some((i, j));
            }
        }
        None
    }

    /// Whether row `i` alone keeps `x_j` inside its own bounds.
    fn implied_free(&self, i: usize, j: usize) -> bool {
        let row = &self.lp.constraints.lhs[i];
        let b = &self.lp.constraints.rhs[i];
        let a = &row[j];
        let range = &self.lp.variables[j].range;
        let act = Activity::of(row, &self.lp.variables);

        // x_j = (b - r) / a with r ranging over the residual activity.
        let from_min = act.residual_min(a, range).map(|r| (b.clone() - r) / a.clone());
        let from_max = act.residual_max(a, range).map(|r| (b.clone() - r) / a.clone());
        let (implied_lower, implied_upper) = if a.is_positive() {
            (from_max, from_min)
        } else {
            (from_min, from_max)
        };

        let lower_ok = match (range.lower(), &implied_lower) {
            (None, _) => true,
            (Some(l), Some(il)) => !l.exceeds(il),
            (Some(_), None) => false,
        };
        let upper_ok = match (range.upper(), &implied_upper) {
            (None, _) => true,
            (Some(u), Some(iu)) => !iu.exceeds(u),
            (Some(_), None) => false,
        };
        lower_ok && upper_ok
    }

    /// Replace `x_j` by `(b - Σ_{k≠j} a_k x_k) / a_j` and drop row `i`.
    fn substitute_out(&mut self, i: usize, j: usize) {
        let row = self.lp.constraints.lhs[i].clone();
        let a = row[j].clone();
        let constant = self.lp.constraints.rhs[i].clone() / a.clone();
        let coefs: Vec<(usize, T)> = row
            .iter()
            .enumerate()
            .filter(|(k, ak)| *k != j && !ak.is_zero())
            .map(|(k, ak)| (k, -(ak.clone() / a.clone())))
            .collect();

        let cj = self.lp.objective[j].clone();
        if !cj.is_zero() {
            for (k, coef) in &coefs {
                self.lp.objective[*k] = self.lp.objective[*k].clone() + cj.clone() * coef.clone();
            }
            self.lp.constant = self.lp.constant.clone() + cj * constant.clone();
        }

        self.lp.variables[j].substitution = Some(Substitution::Affine { constant, coefs });
        self.remove_row(i);
        self.remove_column(j);
    }
}

#[cfg(test)]
mod tests {
    use crate::postsolve::UndoLog;
    use crate::presolve::{presolve, PresolveStatus};
    use crate::problem::{Constraints, LinearProgram, Range, Relation, Variable};

    #[test]
    fn test_free_column_singleton_round_trip() {
        // min x + 2z, x + y + z = 10, x - y >= 2, z free.
        // z occurs only in the equality row and gets substituted out.
        let mut lp = LinearProgram {
            objective: vec![1.0, 0.0, 2.0],
            constant: 0.0,
            constraints: Constraints::new(
                vec![vec![1.0, 1.0, 1.0], vec![1.0, -1.0, 0.0]],
                vec![10.0, 2.0],
                vec![Relation::Eq, Relation::Ge],
            ),
            variables: vec![
                Variable::continuous(Range::new(Some(0.0), Some(4.0))),
                Variable::continuous(Range::new(Some(0.0), Some(3.0))),
                Variable::continuous(Range::free()),
            ],
        };
        let mut log = UndoLog::new();
        let (status, _) = presolve(&mut lp, &mut log);
        assert_eq!(status, PresolveStatus::Reduced);
        assert_eq!(lp.num_vars(), 2);
        // z = 10 - x - y folded into the objective: -x - 2y + 20
        assert_eq!(lp.objective, vec![-1.0, -2.0]);
        assert_eq!(lp.constant, 20.0);

        let mut x = vec![4.0, 2.0];
        log.replay(&mut x);
        assert_eq!(x, vec![4.0, 2.0, 4.0]);
    }

    #[test]
    fn test_zero_cost_empty_column_prefers_lower() {
        let mut lp: LinearProgram<f64> = LinearProgram {
            objective: vec![0.0],
            constant: 0.0,
            constraints: Constraints::empty(),
            variables: vec![Variable::continuous(Range::new(Some(2.0), Some(5.0)))],
        };
        let mut log = UndoLog::new();
        let (status, _) = presolve(&mut lp, &mut log);
        assert_eq!(status, PresolveStatus::Solved);
        let mut x = Vec::new();
        log.replay(&mut x);
        assert_eq!(x, vec![2.0]);
    }
}
